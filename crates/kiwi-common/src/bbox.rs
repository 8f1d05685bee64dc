//! Bounding box types and operations.

use serde::{Deserialize, Serialize};

use crate::error::{KiwiError, KiwiResult};

/// A geographic bounding box in degrees.
///
/// `min_x`/`max_x` are longitudes (west/east), `min_y`/`max_y` are
/// latitudes (south/north).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub min_x: f64,
    pub min_y: f64,
    pub max_x: f64,
    pub max_y: f64,
}

impl BoundingBox {
    /// Create a new bounding box from corner coordinates.
    pub fn new(min_x: f64, min_y: f64, max_x: f64, max_y: f64) -> Self {
        Self {
            min_x,
            min_y,
            max_x,
            max_y,
        }
    }

    /// Create a bounding box, rejecting empty or inverted extents.
    pub fn try_new(west: f64, south: f64, east: f64, north: f64) -> KiwiResult<Self> {
        if !(west < east) || !(south < north) {
            return Err(KiwiError::invalid_geometry(format!(
                "bounding box must satisfy west < east and south < north, got [{}, {}, {}, {}]",
                west, south, east, north
            )));
        }
        Ok(Self::new(west, south, east, north))
    }

    /// Smallest box enclosing all `[lng, lat]` points. `None` when empty.
    pub fn enclosing(points: &[[f64; 2]]) -> Option<Self> {
        let first = points.first()?;
        let mut bbox = Self::new(first[0], first[1], first[0], first[1]);
        for p in &points[1..] {
            bbox.min_x = bbox.min_x.min(p[0]);
            bbox.min_y = bbox.min_y.min(p[1]);
            bbox.max_x = bbox.max_x.max(p[0]);
            bbox.max_y = bbox.max_y.max(p[1]);
        }
        Some(bbox)
    }

    pub fn west(&self) -> f64 {
        self.min_x
    }

    pub fn south(&self) -> f64 {
        self.min_y
    }

    pub fn east(&self) -> f64 {
        self.max_x
    }

    pub fn north(&self) -> f64 {
        self.max_y
    }

    /// Width of the bounding box in degrees.
    pub fn width(&self) -> f64 {
        self.max_x - self.min_x
    }

    /// Height of the bounding box in degrees.
    pub fn height(&self) -> f64 {
        self.max_y - self.min_y
    }

    /// Planar area in square degrees.
    pub fn area(&self) -> f64 {
        self.width().max(0.0) * self.height().max(0.0)
    }

    /// Check if this bbox intersects another.
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        self.min_x < other.max_x
            && self.max_x > other.min_x
            && self.min_y < other.max_y
            && self.max_y > other.min_y
    }

    /// Compute the intersection of two bounding boxes.
    pub fn intersection(&self, other: &BoundingBox) -> Option<BoundingBox> {
        if !self.intersects(other) {
            return None;
        }

        Some(BoundingBox {
            min_x: self.min_x.max(other.min_x),
            min_y: self.min_y.max(other.min_y),
            max_x: self.max_x.min(other.max_x),
            max_y: self.max_y.min(other.max_y),
        })
    }

    /// Check if a point is contained within this bbox (edges inclusive).
    pub fn contains_point(&self, x: f64, y: f64) -> bool {
        x >= self.min_x && x <= self.max_x && y >= self.min_y && y <= self.max_y
    }
}

//! Data model for projectkiwi API responses.
//!
//! The server sends coordinates as `{"lng": .., "lat": ..}` objects; locally
//! they are `[lng, lat]` pairs. Annotation shapes are carried by the
//! [`Geometry`] enum so an unknown shape cannot be constructed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::KiwiError;

/// A `[lng, lat]` pair in degrees.
pub type LngLat = [f64; 2];

/// Coordinate as it appears on the wire. Both the object form used by the
/// server and the plain pair form are accepted.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum WireCoord {
    Object { lng: f64, lat: f64 },
    Pair(LngLat),
}

impl WireCoord {
    fn into_pair(self) -> LngLat {
        match self {
            WireCoord::Object { lng, lat } => [lng, lat],
            WireCoord::Pair(p) => p,
        }
    }

    fn from_pair(p: LngLat) -> Self {
        WireCoord::Object { lng: p[0], lat: p[1] }
    }
}

mod wire_coords {
    use super::{LngLat, WireCoord};
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    pub fn serialize<S: Serializer>(coords: &[LngLat], s: S) -> Result<S::Ok, S::Error> {
        let wire: Vec<WireCoord> = coords.iter().copied().map(WireCoord::from_pair).collect();
        wire.serialize(s)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Vec<LngLat>, D::Error> {
        let wire = Vec::<WireCoord>::deserialize(d)?;
        Ok(wire.into_iter().map(WireCoord::into_pair).collect())
    }
}

/// Annotation shape discriminator as named by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Shape {
    Point,
    Polygon,
    #[serde(rename = "Linestring")]
    LineString,
}

impl Shape {
    pub fn as_str(&self) -> &'static str {
        match self {
            Shape::Point => "Point",
            Shape::Polygon => "Polygon",
            Shape::LineString => "Linestring",
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Shape {
    type Err = KiwiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Point" => Ok(Shape::Point),
            "Polygon" => Ok(Shape::Polygon),
            "Linestring" | "LineString" => Ok(Shape::LineString),
            other => Err(KiwiError::invalid_geometry(format!(
                "shape must be one of Point, Polygon, Linestring; got '{}'",
                other
            ))),
        }
    }
}

/// Annotation geometry in `[lng, lat]` degrees.
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    Point(LngLat),
    LineString(Vec<LngLat>),
    /// Exterior ring; closed rings repeat the first vertex at the end.
    Polygon(Vec<LngLat>),
}

impl Geometry {
    /// Build a geometry from a shape tag and its vertices, as received
    /// from the server.
    ///
    /// Line strings and polygons keep whatever vertices they carry, so
    /// degenerate server data still decodes (its overlap with any tile is
    /// 0). A point must have exactly one coordinate. Use
    /// [`Geometry::check_arity`] before sending a geometry.
    pub fn from_parts(shape: Shape, coordinates: Vec<LngLat>) -> Result<Self, KiwiError> {
        match shape {
            Shape::Point => match coordinates.as_slice() {
                [p] => Ok(Geometry::Point(*p)),
                _ => Err(KiwiError::invalid_geometry(format!(
                    "Point needs exactly 1 coordinate, got {}",
                    coordinates.len()
                ))),
            },
            Shape::LineString => Ok(Geometry::LineString(coordinates)),
            Shape::Polygon => Ok(Geometry::Polygon(coordinates)),
        }
    }

    /// Require at least 2 vertices for a line string and 3 for a polygon.
    pub fn check_arity(&self) -> Result<(), KiwiError> {
        let (needed, got) = match self {
            Geometry::Point(_) => return Ok(()),
            Geometry::LineString(coords) => (2, coords.len()),
            Geometry::Polygon(coords) => (3, coords.len()),
        };
        if got < needed {
            return Err(KiwiError::invalid_geometry(format!(
                "{} needs at least {} coordinates, got {}",
                self.shape(),
                needed,
                got
            )));
        }
        Ok(())
    }

    pub fn shape(&self) -> Shape {
        match self {
            Geometry::Point(_) => Shape::Point,
            Geometry::LineString(_) => Shape::LineString,
            Geometry::Polygon(_) => Shape::Polygon,
        }
    }

    /// Vertices in order.
    pub fn coordinates(&self) -> &[LngLat] {
        match self {
            Geometry::Point(p) => std::slice::from_ref(p),
            Geometry::LineString(c) | Geometry::Polygon(c) => c,
        }
    }
}

/// An annotation label (sometimes called an annotation layer).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Label {
    pub id: i64,
    pub name: String,
    pub color: String,
    pub active: bool,
    pub modified_at: DateTime<Utc>,
}

/// A project owned by the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Project {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub owner: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<Label>>,
}

/// An imagery layer (geotiff) attached to a project.
///
/// The signed download URL is not part of this record; it is resolved on
/// demand and memoized by the client's download-URL cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImageryLayer {
    pub id: i64,
    pub sub: String,
    pub name: String,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub ready: bool,
    pub error: bool,
    #[serde(rename = "storageSizeKB", default)]
    pub storage_size_kb: Option<i64>,
}

/// A single labeling task inside a queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelingTask {
    pub id: i64,
    pub complete: bool,
    #[serde(default)]
    pub completed_by: Option<String>,
    #[serde(rename = "taskCoordinates", with = "wire_coords")]
    pub coordinates: Vec<LngLat>,
}

/// A labeling queue (sometimes called a labeling workflow).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelingQueue {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    pub created_by: String,
    pub modified_at: DateTime<Utc>,
    #[serde(rename = "labelingTasks", default)]
    pub tasks: Vec<LabelingTask>,
}

impl LabelingQueue {
    /// Look up a task by id.
    pub fn task(&self, task_id: i64) -> Option<&LabelingTask> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

fn default_confidence() -> f64 {
    1.0
}

/// Annotation record exactly as exchanged with the server, before the
/// shape tag and vertices are folded into a [`Geometry`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationRecord {
    pub id: i64,
    pub sub: String,
    pub shape: Shape,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    #[serde(default = "default_confidence")]
    pub confidence: f64,
    pub label_id: i64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<Label>,
    #[serde(with = "wire_coords")]
    pub coordinates: Vec<LngLat>,
}

/// An annotation snapshot returned by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "AnnotationRecord", into = "AnnotationRecord")]
pub struct Annotation {
    pub id: i64,
    pub sub: String,
    pub geometry: Geometry,
    pub created_at: DateTime<Utc>,
    pub modified_at: DateTime<Utc>,
    pub confidence: f64,
    pub label_id: i64,
    pub label: Option<Label>,
}

impl Annotation {
    pub fn shape(&self) -> Shape {
        self.geometry.shape()
    }

    pub fn coordinates(&self) -> &[LngLat] {
        self.geometry.coordinates()
    }
}

impl TryFrom<AnnotationRecord> for Annotation {
    type Error = KiwiError;

    fn try_from(r: AnnotationRecord) -> Result<Self, Self::Error> {
        Ok(Annotation {
            id: r.id,
            sub: r.sub,
            geometry: Geometry::from_parts(r.shape, r.coordinates)?,
            created_at: r.created_at,
            modified_at: r.modified_at,
            confidence: r.confidence,
            label_id: r.label_id,
            label: r.label,
        })
    }
}

impl From<Annotation> for AnnotationRecord {
    fn from(a: Annotation) -> Self {
        let shape = a.geometry.shape();
        let coordinates = a.geometry.coordinates().to_vec();
        AnnotationRecord {
            id: a.id,
            sub: a.sub,
            shape,
            created_at: a.created_at,
            modified_at: a.modified_at,
            confidence: a.confidence,
            label_id: a.label_id,
            label: a.label,
            coordinates,
        }
    }
}

/// Body for creating an annotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AnnotationPayload {
    pub coordinates: Vec<LngLat>,
    pub shape: Shape,
    pub label_id: i64,
    pub confidence: f64,
}

impl AnnotationPayload {
    /// Build a payload, validating the geometry against its shape.
    pub fn new(
        geometry: Geometry,
        label_id: i64,
        confidence: f64,
    ) -> Result<Self, KiwiError> {
        geometry.check_arity()?;
        if !(0.0..=1.0).contains(&confidence) {
            return Err(KiwiError::invalid_value(
                "confidence",
                format!("must be within [0, 1], got {}", confidence),
            ));
        }
        Ok(Self {
            shape: geometry.shape(),
            coordinates: geometry.coordinates().to_vec(),
            label_id,
            confidence,
        })
    }
}

//! Slippy-map tile addressing (Web Mercator, XYZ scheme).
//!
//! Tiles are addressed as `z/x/y` with the origin at the north-west corner
//! of the world. Pixel coordinates inside a tile grow east (x) and south (y).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::{KiwiError, KiwiResult};
use crate::BoundingBox;

/// Highest zoom level accepted (2^30 tiles per axis still fits in u32).
pub const MAX_ZOOM: u32 = 30;

/// Edge length of a served imagery tile in pixels.
pub const DEFAULT_TILE_SIZE: u32 = 256;

/// Largest tile edge length accepted for mosaics and pixel math.
pub const MAX_TILE_SIZE: u32 = 4096;

/// A tile coordinate (z/x/y).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TileId {
    /// Zoom level
    pub zoom: u32,
    /// Column (x), counted from the antimeridian eastwards
    pub x: u32,
    /// Row (y), counted from the north edge southwards
    pub y: u32,
}

impl TileId {
    /// Create a tile id, checking the zoom range and grid bounds.
    pub fn new(zoom: u32, x: u32, y: u32) -> KiwiResult<Self> {
        if zoom > MAX_ZOOM {
            return Err(KiwiError::invalid_zoom(format!(
                "zoom {} exceeds maximum {}",
                zoom, MAX_ZOOM
            )));
        }
        let n = tiles_per_axis(zoom);
        if x >= n || y >= n {
            return Err(KiwiError::malformed_tile_id(
                format!("{}/{}/{}", zoom, x, y),
                format!("x and y must be below {} at zoom {}", n, zoom),
            ));
        }
        Ok(Self { zoom, x, y })
    }

    /// Get the parent tile (zoom - 1).
    pub fn parent(&self) -> Option<TileId> {
        if self.zoom == 0 {
            return None;
        }
        Some(TileId {
            zoom: self.zoom - 1,
            x: self.x / 2,
            y: self.y / 2,
        })
    }

    /// Get the four children tiles (zoom + 1).
    pub fn children(&self) -> KiwiResult<[TileId; 4]> {
        if self.zoom >= MAX_ZOOM {
            return Err(KiwiError::invalid_zoom(format!(
                "tile {} has no children below zoom {}",
                self, MAX_ZOOM
            )));
        }
        let x = self.x * 2;
        let y = self.y * 2;
        let zoom = self.zoom + 1;
        Ok([
            TileId { zoom, x, y },
            TileId { zoom, x: x + 1, y },
            TileId { zoom, x, y: y + 1 },
            TileId {
                zoom,
                x: x + 1,
                y: y + 1,
            },
        ])
    }

    /// Number of descendant tiles per axis at `zoom` covering this tile.
    pub fn span_at(&self, zoom: u32) -> KiwiResult<u32> {
        if zoom < self.zoom {
            return Err(KiwiError::invalid_zoom(format!(
                "target zoom {} is below tile zoom {}",
                zoom, self.zoom
            )));
        }
        if zoom > MAX_ZOOM {
            return Err(KiwiError::invalid_zoom(format!(
                "zoom {} exceeds maximum {}",
                zoom, MAX_ZOOM
            )));
        }
        Ok(1u32 << (zoom - self.zoom))
    }

    /// The north-west descendant at `zoom`; the footprint is the
    /// `span_at(zoom)` square starting there.
    pub fn first_descendant_at(&self, zoom: u32) -> KiwiResult<TileId> {
        let span = self.span_at(zoom)?;
        Ok(TileId {
            zoom,
            x: self.x * span,
            y: self.y * span,
        })
    }

    /// All descendants at `zoom` in row-major order (north to south, west to east).
    pub fn descendants_at(&self, zoom: u32) -> KiwiResult<Vec<TileId>> {
        let span = self.span_at(zoom)?;
        let origin = self.first_descendant_at(zoom)?;
        let mut tiles = Vec::with_capacity((span as usize) * (span as usize));
        for row in 0..span {
            for col in 0..span {
                tiles.push(TileId {
                    zoom,
                    x: origin.x + col,
                    y: origin.y + row,
                });
            }
        }
        Ok(tiles)
    }

    /// Geographic bounds of this tile.
    pub fn bbox(&self) -> BoundingBox {
        tile_to_bbox(self)
    }
}

impl fmt::Display for TileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}/{}", self.zoom, self.x, self.y)
    }
}

impl FromStr for TileId {
    type Err = KiwiError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parts: Vec<&str> = s.split('/').collect();
        if parts.len() != 3 {
            return Err(KiwiError::malformed_tile_id(
                s,
                format!("expected 3 segments 'z/x/y', found {}", parts.len()),
            ));
        }

        // Only canonical decimals: no sign, no leading zeros
        let parse = |name: &str, part: &str| -> KiwiResult<u32> {
            let canonical = !part.is_empty()
                && part.bytes().all(|b| b.is_ascii_digit())
                && (part.len() == 1 || !part.starts_with('0'));
            if !canonical {
                return Err(KiwiError::malformed_tile_id(
                    s,
                    format!("{} '{}' is not a canonical unsigned integer", name, part),
                ));
            }
            part.parse::<u32>().map_err(|_| {
                KiwiError::malformed_tile_id(s, format!("{} '{}' does not fit in u32", name, part))
            })
        };

        let zoom = parse("zoom", parts[0])?;
        let x = parse("x", parts[1])?;
        let y = parse("y", parts[2])?;

        TileId::new(zoom, x, y)
    }
}

/// Parse a `"z/x/y"` tile id.
pub fn parse_tile_id(s: &str) -> KiwiResult<TileId> {
    s.parse()
}

/// Format a tile id in its canonical `"z/x/y"` form.
pub fn format_tile_id(tile: &TileId) -> String {
    tile.to_string()
}

/// Number of tiles along one axis at `zoom`.
pub fn tiles_per_axis(zoom: u32) -> u32 {
    1u32 << zoom.min(MAX_ZOOM)
}

fn lat_of_row(row: f64, n: f64) -> f64 {
    (std::f64::consts::PI * (1.0 - 2.0 * row / n))
        .sinh()
        .atan()
        .to_degrees()
}

/// Convert Web Mercator tile coordinates to lat/lon bounds.
pub fn tile_to_bbox(tile: &TileId) -> BoundingBox {
    let n = tiles_per_axis(tile.zoom) as f64;

    let lon_min = tile.x as f64 / n * 360.0 - 180.0;
    let lon_max = (tile.x as f64 + 1.0) / n * 360.0 - 180.0;

    let lat_max = lat_of_row(tile.y as f64, n);
    let lat_min = lat_of_row(tile.y as f64 + 1.0, n);

    BoundingBox::new(lon_min, lat_min, lon_max, lat_max)
}

/// Convert lng/lat to the Web Mercator tile containing it.
///
/// Latitudes beyond the Mercator limit are clamped to the first/last row.
pub fn lnglat_to_tile(lng: f64, lat: f64, zoom: u32) -> KiwiResult<TileId> {
    if zoom > MAX_ZOOM {
        return Err(KiwiError::invalid_zoom(format!(
            "zoom {} exceeds maximum {}",
            zoom, MAX_ZOOM
        )));
    }
    let n = tiles_per_axis(zoom);
    let nf = n as f64;

    let x = ((lng + 180.0) / 360.0 * nf).floor();
    let lat_rad = lat.to_radians();
    let y = ((1.0 - lat_rad.tan().asinh() / std::f64::consts::PI) / 2.0 * nf).floor();

    let clamp = |v: f64| -> u32 {
        if v.is_nan() || v < 0.0 {
            0
        } else {
            (v as u64).min(n as u64 - 1) as u32
        }
    };

    Ok(TileId {
        zoom,
        x: clamp(x),
        y: clamp(y),
    })
}

/// Map a pixel offset inside a tile to `[lng, lat]`.
///
/// Interpolates linearly across the tile's bounding box. Offsets outside
/// `0..tile_size` extrapolate past the tile edge.
pub fn pixel_to_lnglat(tile: &TileId, px: f64, py: f64, tile_size: u32) -> [f64; 2] {
    let bbox = tile_to_bbox(tile);
    let size = tile_size as f64;
    let lng = bbox.min_x + px / size * bbox.width();
    let lat = bbox.max_y - py / size * bbox.height();
    [lng, lat]
}

/// Inverse of [`pixel_to_lnglat`]: map `[lng, lat]` into the tile's pixel frame.
pub fn lnglat_to_pixel(tile: &TileId, lng: f64, lat: f64, tile_size: u32) -> [f64; 2] {
    let bbox = tile_to_bbox(tile);
    let size = tile_size as f64;
    let px = (lng - bbox.min_x) / bbox.width() * size;
    let py = (bbox.max_y - lat) / bbox.height() * size;
    [px, py]
}

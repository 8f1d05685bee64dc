//! Geometry utilities for matching annotations against map tiles.
//!
//! - [`polygon`]: conversions between tile pixel space and `[lng, lat]` rings
//! - [`overlap`]: fraction of a geometry inside a bounding box
//! - [`filter`]: selecting the annotations that belong to a tile

pub mod filter;
pub mod overlap;
pub mod polygon;

pub use filter::{filter_annotations, get_annotations_for_tile, FilterOptions, ThresholdMode};
pub use overlap::overlap_ratio;
pub use polygon::{
    bbox_to_polygon, close_ring, coords_from_polygon, get_bbox_tile_coords,
    get_bbox_tile_coords_with, validate_polygon,
};

//! Common types and utilities shared across the projectkiwi client crates.

pub mod bbox;
pub mod error;
pub mod models;
pub mod tile;

pub use bbox::BoundingBox;
pub use error::{KiwiError, KiwiResult};
pub use models::{
    Annotation, AnnotationPayload, AnnotationRecord, Geometry, ImageryLayer, Label, LabelingQueue, LabelingTask,
    LngLat, Project, Shape,
};
pub use tile::{TileId, DEFAULT_TILE_SIZE, MAX_TILE_SIZE, MAX_ZOOM};

//! Common test fixtures for projectkiwi client tests.
//!
//! The polygons are real annotations from the project's test data: a city
//! block in Chicago, the outline of Chad and a point in Texas.

use chrono::{DateTime, TimeZone, Utc};
use kiwi_common::{Annotation, Geometry, ImageryLayer, Label, LngLat};

/// Tile identifiers used across the test suite.
pub mod tiles {
    /// Zoom 12 tile over downtown Chicago; contains [`super::CHICAGO_BLOCK`].
    pub const CHICAGO: &str = "12/1051/1522";

    /// North-west corner tile of zoom 12, far from every fixture.
    pub const DISJOINT: &str = "12/0/0";

    /// Zoom 14 tile used for pixel-space predictions.
    pub const PREDICTION: &str = "14/4202/6087";

    /// Zoom 13 tile used for padded super-tile requests.
    pub const SUPER_TILE: &str = "13/2101/3045";
}

/// Closed rectangle around a Chicago city block.
pub const CHICAGO_BLOCK: [LngLat; 5] = [
    [-87.612448, 41.867452],
    [-87.605238, 41.867452],
    [-87.605238, 41.852301],
    [-87.612448, 41.852301],
    [-87.612448, 41.867452],
];

/// Closed outline of Chad.
pub const CHAD: [LngLat; 10] = [
    [16.268203655953613, 23.383943456026273],
    [14.935034924543771, 23.108145130196803],
    [15.76079746570636, 16.90123576626638],
    [13.399196837322421, 14.817993358986172],
    [14.211783577458817, 9.775538609780241],
    [15.783947274898964, 7.296930569584262],
    [22.459154641909862, 10.472609517588566],
    [24.034652422437063, 15.63906863793278],
    [23.922648463490617, 19.680835605784765],
    [16.268203655953613, 23.383943456026273],
];

/// A point in Texas.
pub const MAVERICK: LngLat = [-100.19435596377956, 31.836754697531916];

/// Rectangle that crosses the east edge of the Chicago tile; about 52% of
/// its area lies inside.
pub const EAST_EDGE_STRADDLE: [LngLat; 5] = [
    [-87.56, 41.88],
    [-87.52, 41.88],
    [-87.52, 41.86],
    [-87.56, 41.86],
    [-87.56, 41.88],
];

/// Rectangle with only about 6% of its area inside the Chicago tile.
pub const EAST_EDGE_SLIVER: [LngLat; 5] = [
    [-87.545, 41.88],
    [-87.445, 41.88],
    [-87.445, 41.86],
    [-87.545, 41.86],
    [-87.545, 41.88],
];

/// Fixed reference time for fixture timestamps (2023-05-01T12:00:00Z).
pub fn reference_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2023, 5, 1, 12, 0, 0).unwrap()
}

/// A label fixture.
pub fn label(id: i64, name: &str) -> Label {
    Label {
        id,
        name: name.to_string(),
        color: "rgb(255, 0, 0)".to_string(),
        active: true,
        modified_at: reference_time(),
    }
}

/// Build an annotation around `geometry` with fixture metadata.
pub fn annotation(id: i64, geometry: Geometry) -> Annotation {
    Annotation {
        id,
        sub: "test-user".to_string(),
        geometry,
        created_at: reference_time(),
        modified_at: reference_time(),
        confidence: 1.0,
        label_id: 374,
        label: Some(label(374, "building")),
    }
}

pub fn chicago_block() -> Annotation {
    annotation(1, Geometry::Polygon(CHICAGO_BLOCK.to_vec()))
}

pub fn chad() -> Annotation {
    annotation(2, Geometry::Polygon(CHAD.to_vec()))
}

pub fn maverick_point() -> Annotation {
    annotation(3, Geometry::Point(MAVERICK))
}

/// A line along the Chicago lakeshore, inside the Chicago tile.
pub fn lakeshore_line() -> Annotation {
    annotation(
        4,
        Geometry::LineString(vec![[-87.60, 41.88], [-87.59, 41.87], [-87.58, 41.86]]),
    )
}

pub fn east_edge_straddle() -> Annotation {
    annotation(5, Geometry::Polygon(EAST_EDGE_STRADDLE.to_vec()))
}

pub fn east_edge_sliver() -> Annotation {
    annotation(6, Geometry::Polygon(EAST_EDGE_SLIVER.to_vec()))
}

/// Every annotation fixture, in id order.
pub fn all_annotations() -> Vec<Annotation> {
    vec![
        chicago_block(),
        chad(),
        maverick_point(),
        lakeshore_line(),
        east_edge_straddle(),
        east_edge_sliver(),
    ]
}

/// An imagery layer fixture.
pub fn imagery_layer(id: i64) -> ImageryLayer {
    ImageryLayer {
        id,
        sub: "test-user".to_string(),
        name: format!("orthomosaic-{}", id),
        created_at: reference_time(),
        modified_at: reference_time(),
        ready: true,
        error: false,
        storage_size_kb: Some(20_480),
    }
}

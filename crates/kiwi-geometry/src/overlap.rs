//! Fraction of an annotation geometry that lies inside a bounding box.
//!
//! Areas are planar, measured in square degrees. That is not an equal-area
//! measure, but both operands of the ratio share the same distortion at
//! tile scale.

use geo::{Area, BooleanOps, Coord, Intersects, LineString, Polygon, Rect};
use kiwi_common::{BoundingBox, Geometry, LngLat};

/// Overlap of `geometry` with `bbox` in `[0, 1]`.
///
/// Polygons give `area(geometry ∩ bbox) / area(geometry)`; zero-area
/// polygons give 0. Points and line strings give 1 when any vertex lies in
/// the box (edges inclusive) or any segment crosses it, otherwise 0.
pub fn overlap_ratio(geometry: &Geometry, bbox: &BoundingBox) -> f64 {
    match geometry {
        Geometry::Point(p) => hit(bbox.contains_point(p[0], p[1])),
        Geometry::LineString(coords) => hit(line_touches_bbox(coords, bbox)),
        Geometry::Polygon(coords) => polygon_overlap(coords, bbox),
    }
}

fn hit(inside: bool) -> f64 {
    if inside {
        1.0
    } else {
        0.0
    }
}

fn to_rect(bbox: &BoundingBox) -> Rect<f64> {
    Rect::new(
        Coord {
            x: bbox.min_x,
            y: bbox.min_y,
        },
        Coord {
            x: bbox.max_x,
            y: bbox.max_y,
        },
    )
}

fn all_finite(coords: &[LngLat]) -> bool {
    coords.iter().all(|c| c[0].is_finite() && c[1].is_finite())
}

fn line_touches_bbox(coords: &[LngLat], bbox: &BoundingBox) -> bool {
    if coords.is_empty() || !all_finite(coords) {
        return false;
    }
    if coords.iter().any(|c| bbox.contains_point(c[0], c[1])) {
        return true;
    }
    LineString::from(coords.to_vec()).intersects(&to_rect(bbox))
}

fn polygon_overlap(coords: &[LngLat], bbox: &BoundingBox) -> f64 {
    if coords.len() < 3 || !all_finite(coords) {
        return 0.0;
    }

    let polygon = Polygon::new(LineString::from(coords.to_vec()), vec![]);
    let area = polygon.unsigned_area();
    if !(area > 0.0) {
        return 0.0;
    }

    // Cheap answers from the envelope before running the clipper
    if let Some(envelope) = BoundingBox::enclosing(coords) {
        if !envelope.intersects(bbox) {
            return 0.0;
        }
        if bbox.contains_point(envelope.min_x, envelope.min_y)
            && bbox.contains_point(envelope.max_x, envelope.max_y)
        {
            return 1.0;
        }
    }

    let clipped = polygon.intersection(&to_rect(bbox).to_polygon());
    (clipped.unsigned_area() / area).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kiwi_common::TileId;
    use test_utils::fixtures::{
        CHAD, CHICAGO_BLOCK, EAST_EDGE_SLIVER, EAST_EDGE_STRADDLE, MAVERICK,
    };
    use test_utils::{assert_approx_eq, tiles};

    fn chicago_bbox() -> BoundingBox {
        tiles::CHICAGO.parse::<TileId>().unwrap().bbox()
    }

    // =========================================================================
    // Polygons
    // =========================================================================

    #[test]
    fn test_polygon_fully_inside() {
        let ratio = overlap_ratio(&Geometry::Polygon(CHICAGO_BLOCK.to_vec()), &chicago_bbox());
        assert_eq!(ratio, 1.0);
    }

    #[test]
    fn test_polygon_disjoint() {
        let ratio = overlap_ratio(&Geometry::Polygon(CHAD.to_vec()), &chicago_bbox());
        assert_eq!(ratio, 0.0);
    }

    #[test]
    fn test_polygon_straddling_edge() {
        // tile east edge is -87.5390625; the rectangle spans -87.56..-87.52
        let expected = (-87.5390625 - -87.56) / 0.04;
        let ratio = overlap_ratio(
            &Geometry::Polygon(EAST_EDGE_STRADDLE.to_vec()),
            &chicago_bbox(),
        );
        assert_approx_eq!(ratio, expected, 1e-6);
        assert!(ratio > 0.5 && ratio < 0.55);

        let sliver = overlap_ratio(&Geometry::Polygon(EAST_EDGE_SLIVER.to_vec()), &chicago_bbox());
        assert_approx_eq!(sliver, (-87.5390625 - -87.545) / 0.1, 1e-6);
    }

    #[test]
    fn test_polygon_winding_does_not_matter() {
        let mut reversed = EAST_EDGE_STRADDLE.to_vec();
        reversed.reverse();
        let a = overlap_ratio(&Geometry::Polygon(EAST_EDGE_STRADDLE.to_vec()), &chicago_bbox());
        let b = overlap_ratio(&Geometry::Polygon(reversed), &chicago_bbox());
        assert_approx_eq!(a, b, 1e-9);
    }

    #[test]
    fn test_zero_area_polygon() {
        let flat = vec![[-87.6, 41.87], [-87.59, 41.87], [-87.58, 41.87]];
        assert_eq!(overlap_ratio(&Geometry::Polygon(flat), &chicago_bbox()), 0.0);
    }

    // =========================================================================
    // Points and lines
    // =========================================================================

    #[test]
    fn test_point_hit() {
        let bbox = chicago_bbox();
        assert_eq!(overlap_ratio(&Geometry::Point([-87.6, 41.87]), &bbox), 1.0);
        assert_eq!(overlap_ratio(&Geometry::Point(MAVERICK), &bbox), 0.0);
        // edges count as inside
        assert_eq!(overlap_ratio(&Geometry::Point([bbox.west(), bbox.north()]), &bbox), 1.0);
    }

    #[test]
    fn test_line_crossing_without_vertices_inside() {
        let bbox = chicago_bbox();
        let crossing = Geometry::LineString(vec![[-87.7, 41.87], [-87.4, 41.87]]);
        assert_eq!(overlap_ratio(&crossing, &bbox), 1.0);

        let outside = Geometry::LineString(vec![[-87.7, 42.5], [-87.4, 42.5]]);
        assert_eq!(overlap_ratio(&outside, &bbox), 0.0);
    }
}

//! Conversions between tile pixel space and geographic polygons.
//!
//! Pixel coordinates are measured from the north-west corner of a tile,
//! `x` growing east and `y` growing south, in units of `tile_size`.

use geo::{Area, Intersects, Line, LineString, Polygon};
use kiwi_common::tile::{lnglat_to_pixel, pixel_to_lnglat};
use kiwi_common::{KiwiError, KiwiResult, LngLat, TileId, DEFAULT_TILE_SIZE};

/// Closed rectangle from pixel corners, clockwise on screen starting at
/// the top-left: `(x0,y0) (x1,y0) (x1,y1) (x0,y1) (x0,y0)`.
pub fn bbox_to_polygon(x0: f64, y0: f64, x1: f64, y1: f64) -> Vec<[f64; 2]> {
    vec![[x0, y0], [x1, y0], [x1, y1], [x0, y1], [x0, y0]]
}

/// Map a pixel-space polygon inside `tile` to `[lng, lat]` vertices.
///
/// Vertex order and closure are preserved.
pub fn coords_from_polygon(pixel_polygon: &[[f64; 2]], tile: &TileId, tile_size: u32) -> Vec<LngLat> {
    pixel_polygon
        .iter()
        .map(|p| pixel_to_lnglat(tile, p[0], p[1], tile_size))
        .collect()
}

/// Pixel bounding box `[x0, y0, x1, y1]` of `coordinates` inside `tile`,
/// using the default tile size and no clamping.
pub fn get_bbox_tile_coords(coordinates: &[LngLat], tile: &TileId) -> KiwiResult<[f64; 4]> {
    get_bbox_tile_coords_with(coordinates, tile, DEFAULT_TILE_SIZE, false)
}

/// Pixel bounding box `[x0, y0, x1, y1]` of `coordinates` inside `tile`.
///
/// Vertices outside the tile map to pixels outside `0..tile_size`; with
/// `clamp` set the result is limited to `[0, tile_size]`.
pub fn get_bbox_tile_coords_with(
    coordinates: &[LngLat],
    tile: &TileId,
    tile_size: u32,
    clamp: bool,
) -> KiwiResult<[f64; 4]> {
    if coordinates.is_empty() {
        return Err(KiwiError::invalid_geometry(
            "cannot compute a pixel bbox of an empty coordinate list",
        ));
    }

    let mut bbox = [f64::INFINITY, f64::INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY];
    for c in coordinates {
        let [px, py] = lnglat_to_pixel(tile, c[0], c[1], tile_size);
        bbox[0] = bbox[0].min(px);
        bbox[1] = bbox[1].min(py);
        bbox[2] = bbox[2].max(px);
        bbox[3] = bbox[3].max(py);
    }

    if clamp {
        let size = tile_size as f64;
        for v in bbox.iter_mut() {
            *v = v.clamp(0.0, size);
        }
    }

    Ok(bbox)
}

/// Return `coordinates` with the first vertex repeated at the end if the
/// ring is not already closed.
pub fn close_ring(coordinates: &[LngLat]) -> Vec<LngLat> {
    let mut ring = coordinates.to_vec();
    if let (Some(first), Some(last)) = (ring.first().copied(), ring.last().copied()) {
        if first != last {
            ring.push(first);
        }
    }
    ring
}

/// Check that `coordinates` describe a usable polygon: finite values, at
/// least 3 distinct vertices, non-zero area and no crossing edges.
pub fn validate_polygon(coordinates: &[LngLat]) -> KiwiResult<()> {
    if let Some(bad) = coordinates.iter().find(|c| !c[0].is_finite() || !c[1].is_finite()) {
        return Err(KiwiError::invalid_geometry(format!(
            "polygon vertex {:?} is not finite",
            bad
        )));
    }

    let mut distinct: Vec<LngLat> = Vec::with_capacity(coordinates.len());
    for c in coordinates {
        if !distinct.contains(c) {
            distinct.push(*c);
        }
    }
    if distinct.len() < 3 {
        return Err(KiwiError::invalid_geometry(format!(
            "polygon needs at least 3 distinct vertices, got {}",
            distinct.len()
        )));
    }

    let ring = close_ring(&dedup_consecutive(coordinates));
    let polygon = Polygon::new(LineString::from(ring.clone()), vec![]);
    if polygon.unsigned_area() <= 0.0 {
        return Err(KiwiError::invalid_geometry("polygon has zero area"));
    }

    if let Some((i, j)) = find_crossing_edges(&ring) {
        return Err(KiwiError::invalid_geometry(format!(
            "polygon is self-intersecting (edges {} and {} cross)",
            i, j
        )));
    }

    Ok(())
}

fn dedup_consecutive(coordinates: &[LngLat]) -> Vec<LngLat> {
    let mut out: Vec<LngLat> = Vec::with_capacity(coordinates.len());
    for c in coordinates {
        if out.last() != Some(c) {
            out.push(*c);
        }
    }
    out
}

/// First pair of non-adjacent edges of a closed ring that touch or cross.
fn find_crossing_edges(ring: &[LngLat]) -> Option<(usize, usize)> {
    let edges: Vec<Line<f64>> = ring
        .windows(2)
        .map(|w| Line::new(w[0], w[1]))
        .collect();
    let m = edges.len();

    for i in 0..m {
        for j in (i + 2)..m {
            // first and last edges share the closing vertex
            if i == 0 && j == m - 1 {
                continue;
            }
            if edges[i].intersects(&edges[j]) {
                return Some((i, j));
            }
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prediction_tile() -> TileId {
        "14/4202/6087".parse().unwrap()
    }

    // =========================================================================
    // Pixel rectangles
    // =========================================================================

    #[test]
    fn test_bbox_to_polygon_order() {
        let poly = bbox_to_polygon(100.0, 100.0, 200.0, 200.0);
        assert_eq!(
            poly,
            vec![
                [100.0, 100.0],
                [200.0, 100.0],
                [200.0, 200.0],
                [100.0, 200.0],
                [100.0, 100.0]
            ]
        );
    }

    #[test]
    fn test_coords_from_polygon_stays_in_tile() {
        let tile = prediction_tile();
        let bbox = tile.bbox();
        let coords = coords_from_polygon(&bbox_to_polygon(100.0, 100.0, 200.0, 200.0), &tile, 256);

        assert_eq!(coords.len(), 5);
        assert_eq!(coords.first(), coords.last());
        for c in &coords {
            assert!(bbox.contains_point(c[0], c[1]), "{:?} outside {:?}", c, bbox);
        }
        // y grows south, so the first vertex is the north-west corner
        assert!(coords[0][1] > coords[2][1]);
        assert!(coords[0][0] < coords[1][0]);
    }

    // =========================================================================
    // Pixel bounding boxes
    // =========================================================================

    #[test]
    fn test_bbox_tile_coords_inverts_coords_from_polygon() {
        let tile = prediction_tile();
        let coords = coords_from_polygon(&bbox_to_polygon(100.0, 100.0, 200.0, 200.0), &tile, 256);
        let bbox = get_bbox_tile_coords(&coords, &tile).unwrap();

        let expected = [100.0, 100.0, 200.0, 200.0];
        for (got, want) in bbox.iter().zip(expected.iter()) {
            assert!((got - want).abs() < 1e-6, "{:?} != {:?}", bbox, expected);
        }
    }

    #[test]
    fn test_bbox_tile_coords_clamp() {
        let tile = prediction_tile();
        let coords = coords_from_polygon(&bbox_to_polygon(-50.0, 100.0, 300.0, 400.0), &tile, 256);

        let raw = get_bbox_tile_coords_with(&coords, &tile, 256, false).unwrap();
        assert!(raw[0] < 0.0);
        assert!(raw[3] > 256.0);

        let clamped = get_bbox_tile_coords_with(&coords, &tile, 256, true).unwrap();
        assert_eq!(clamped[0], 0.0);
        assert!((clamped[1] - 100.0).abs() < 1e-6);
        assert_eq!(clamped[2], 256.0);
        assert_eq!(clamped[3], 256.0);
    }

    #[test]
    fn test_bbox_tile_coords_empty_is_error() {
        let err = get_bbox_tile_coords(&[], &prediction_tile()).unwrap_err();
        assert!(matches!(err, KiwiError::InvalidGeometry(_)));
    }

    // =========================================================================
    // Validation
    // =========================================================================

    #[test]
    fn test_close_ring() {
        let open = vec![[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]];
        let closed = close_ring(&open);
        assert_eq!(closed.len(), 4);
        assert_eq!(closed[3], [0.0, 0.0]);
        assert_eq!(close_ring(&closed), closed);
        assert!(close_ring(&[]).is_empty());
    }

    #[test]
    fn test_validate_polygon() {
        assert!(validate_polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0]]).is_ok());
        assert!(validate_polygon(&[[0.0, 0.0], [1.0, 0.0], [1.0, 1.0], [0.0, 0.0]]).is_ok());
    }

    #[test]
    fn test_validate_polygon_rejects_degenerate() {
        let cases: Vec<Vec<LngLat>> = vec![
            vec![],
            vec![[0.0, 0.0], [1.0, 1.0]],
            vec![[0.0, 0.0], [1.0, 1.0], [0.0, 0.0], [1.0, 1.0]],
            // collinear
            vec![[0.0, 0.0], [1.0, 1.0], [2.0, 2.0]],
            // bow tie
            vec![[0.0, 0.0], [1.0, 1.0], [1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
            // crossing edges with non-zero signed area
            vec![[0.0, 0.0], [2.0, 2.0], [2.0, 0.0], [0.0, 1.0]],
            vec![[0.0, 0.0], [f64::NAN, 1.0], [1.0, 0.0]],
        ];
        for coords in cases {
            let err = validate_polygon(&coords).unwrap_err();
            assert!(
                matches!(err, KiwiError::InvalidGeometry(_)),
                "{:?} gave {:?}",
                coords,
                err
            );
        }
    }
}

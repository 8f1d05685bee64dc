//! Padded mosaics of higher-zoom tiles ("super-tiles").
//!
//! A super-tile covers the footprint of one tile at `zoom` with the
//! `2^(max_zoom - zoom)` square of its descendants at `max_zoom`, plus a
//! border of `padding` pixels taken from the neighbouring tiles. The
//! output is square with side `tile_size * 2^(max_zoom - zoom) + 2 * padding`.
//!
//! The border is built by fetching `ceil(padding / tile_size)` extra rings
//! of tiles around the footprint, stitching the whole grid and cropping
//! the centre.

use futures::stream::{self, StreamExt};
use tracing::{debug, info, instrument};

use kiwi_common::tile::tiles_per_axis;
use kiwi_common::{KiwiError, KiwiResult, TileId, DEFAULT_TILE_SIZE, MAX_TILE_SIZE};

use crate::raster::Raster;
use crate::tile_source::{TileFetch, TileSource};

/// Largest stitched grid accepted, in tiles per axis (padding rings included).
pub const MAX_MOSAIC_TILES_PER_AXIS: u32 = 64;

/// Channel count used when no tile in the mosaic had data.
pub const DEFAULT_CHANNELS: u8 = 3;

/// Tunables for mosaic assembly.
#[derive(Debug, Clone, Copy)]
pub struct MosaicOptions {
    /// Edge length of one child tile in the output, in pixels.
    pub tile_size: u32,
    /// Maximum number of tile fetches in flight.
    pub concurrency: usize,
}

impl Default for MosaicOptions {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            concurrency: 8,
        }
    }
}

/// One cell of the stitched grid.
#[derive(Debug, Clone, Copy)]
struct GridCell {
    row: u32,
    col: u32,
    /// `None` when the cell lies outside the world grid.
    tile: Option<TileId>,
}

/// Build the super-tile for `zxy` with default options.
pub async fn get_super_tile<S>(
    source: &S,
    zxy: &str,
    imagery_id: i64,
    max_zoom: u32,
    padding: u32,
) -> KiwiResult<Raster>
where
    S: TileSource + ?Sized,
{
    let tile: TileId = zxy.parse()?;
    get_super_tile_with(
        source,
        &tile,
        imagery_id,
        max_zoom,
        padding,
        &MosaicOptions::default(),
    )
    .await
}

/// Build the super-tile for `tile`.
///
/// Tiles the source reports as missing, and cells beyond the edge of the
/// world, are black. Any other fetch failure aborts the mosaic.
#[instrument(skip(source, tile, options), fields(tile = %tile))]
pub async fn get_super_tile_with<S>(
    source: &S,
    tile: &TileId,
    imagery_id: i64,
    max_zoom: u32,
    padding: u32,
    options: &MosaicOptions,
) -> KiwiResult<Raster>
where
    S: TileSource + ?Sized,
{
    if options.tile_size == 0 || options.tile_size > MAX_TILE_SIZE {
        return Err(KiwiError::Config(format!(
            "tile_size must be in 1..={}, got {}",
            MAX_TILE_SIZE, options.tile_size
        )));
    }

    // Rejects max_zoom below the tile's zoom or above MAX_ZOOM
    let span = tile.span_at(max_zoom)?;
    let origin = tile.first_descendant_at(max_zoom)?;
    let tile_size = options.tile_size;
    let rings = padding.div_ceil(tile_size);

    let grid = span as u64 + 2 * rings as u64;
    if grid > MAX_MOSAIC_TILES_PER_AXIS as u64 {
        return Err(KiwiError::invalid_zoom(format!(
            "super-tile of {} at zoom {} with padding {} needs {}x{} tiles, limit is {} per axis",
            tile, max_zoom, padding, grid, grid, MAX_MOSAIC_TILES_PER_AXIS
        )));
    }
    let grid = grid as u32;

    let canvas_side = pixels(grid, tile_size, 0)?;
    let offset = pixels(rings, tile_size, 0)? - padding;
    let side = pixels(span, tile_size, padding)?;

    let cells = grid_cells(&origin, grid, rings);
    debug!(grid, rings, cells = cells.len(), "Fetching mosaic tiles");

    // `buffered` yields in input order, so placement never depends on
    // which fetch finishes first.
    let fetched: Vec<KiwiResult<(GridCell, TileFetch)>> = stream::iter(cells)
        .map(|cell| async move {
            match cell.tile {
                Some(child) => source
                    .fetch_tile(imagery_id, &child)
                    .await
                    .map(|fetch| (cell, fetch)),
                None => Ok((cell, TileFetch::Missing)),
            }
        })
        .buffered(options.concurrency.max(1))
        .collect()
        .await;
    let fetched = fetched.into_iter().collect::<KiwiResult<Vec<_>>>()?;

    let channels = fetched
        .iter()
        .filter_map(|(_, fetch)| match fetch {
            TileFetch::Found(raster) => Some(raster.channels()),
            TileFetch::Missing => None,
        })
        .max()
        .unwrap_or(DEFAULT_CHANNELS);

    let mut canvas = Raster::zeros(canvas_side, canvas_side, channels);
    let mut missing = 0usize;

    for (cell, fetch) in fetched {
        let raster = match fetch {
            TileFetch::Found(raster) => raster,
            TileFetch::Missing => {
                missing += 1;
                continue;
            }
        };
        let raster = raster.widen(channels).resize(tile_size, tile_size)?;
        canvas.blit(
            &raster,
            cell.col as i64 * tile_size as i64,
            cell.row as i64 * tile_size as i64,
        );
    }

    let mosaic = canvas.crop(offset, offset, side, side);

    info!(
        imagery_id,
        max_zoom,
        padding,
        side,
        channels,
        missing,
        "Assembled super-tile"
    );

    Ok(mosaic)
}

/// `tiles * tile_size + 2 * padding`, or `Config` when it leaves `u32`.
fn pixels(tiles: u32, tile_size: u32, padding: u32) -> KiwiResult<u32> {
    tiles
        .checked_mul(tile_size)
        .and_then(|n| padding.checked_mul(2).and_then(|p| n.checked_add(p)))
        .ok_or_else(|| {
            KiwiError::Config(format!(
                "mosaic of {} tiles of {} px with padding {} overflows",
                tiles, tile_size, padding
            ))
        })
}

/// Row-major cells of a `grid × grid` square whose inner part starts at
/// `origin`, with `rings` extra cells on each side.
fn grid_cells(origin: &TileId, grid: u32, rings: u32) -> Vec<GridCell> {
    let world = tiles_per_axis(origin.zoom) as i64;
    let mut cells = Vec::with_capacity(grid as usize * grid as usize);

    for row in 0..grid {
        for col in 0..grid {
            let x = origin.x as i64 + col as i64 - rings as i64;
            let y = origin.y as i64 + row as i64 - rings as i64;
            let tile = if (0..world).contains(&x) && (0..world).contains(&y) {
                Some(TileId {
                    zoom: origin.zoom,
                    x: x as u32,
                    y: y as u32,
                })
            } else {
                None
            };
            cells.push(GridCell { row, col, tile });
        }
    }

    cells
}

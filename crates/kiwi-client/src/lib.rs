//! Client for the projectkiwi geospatial annotation service.
//!
//! Besides the REST accessors on [`KiwiClient`], the crate assembles
//! padded super-tile mosaics from imagery tiles ([`supertile`]) and crops
//! imagery to task polygons through the extraction service ([`extract`]).
//! The network-facing collaborators are traits ([`TileSource`],
//! [`DownloadUrlResolver`], [`RegionExtractor`]) so they can be swapped.

pub mod client;
pub mod config;
pub mod download_url;
pub mod extract;
pub mod raster;
pub mod supertile;
pub mod tile_source;

pub use client::{KiwiClient, DEFAULT_LABEL_COLOR};
pub use config::ClientConfig;
pub use download_url::{DownloadUrlCache, DownloadUrlResolver, HttpDownloadUrlResolver};
pub use extract::{get_image_for_task, HttpRegionExtractor, RegionExtractor, DEFAULT_MAX_SIZE};
pub use raster::Raster;
pub use supertile::{get_super_tile, get_super_tile_with, MosaicOptions};
pub use tile_source::{HttpTileSource, TileFetch, TileSource};

pub use kiwi_common::{KiwiError, KiwiResult};

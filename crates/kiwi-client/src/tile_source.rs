//! Imagery tile sources.

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use tracing::{debug, instrument};

use kiwi_common::{KiwiError, KiwiResult, TileId};

use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::raster::Raster;

/// Outcome of a single tile fetch.
#[derive(Debug, Clone, PartialEq)]
pub enum TileFetch {
    Found(Raster),
    /// The source has no data for this tile; mosaics render it black.
    Missing,
}

impl TileFetch {
    pub fn is_missing(&self) -> bool {
        matches!(self, TileFetch::Missing)
    }
}

/// Anything that can produce imagery tiles by id.
#[async_trait]
pub trait TileSource: Send + Sync {
    /// Fetch one tile of an imagery layer.
    async fn fetch_tile(&self, imagery_id: i64, tile: &TileId) -> KiwiResult<TileFetch>;
}

/// Tiles served by the projectkiwi backend at
/// `{base_url}/api/imagery/{imagery_id}/tile/{z}/{x}/{y}`.
#[derive(Debug, Clone)]
pub struct HttpTileSource {
    client: Client,
    api_root: String,
    api_key: String,
}

impl HttpTileSource {
    pub fn new(config: &ClientConfig) -> KiwiResult<Self> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    /// Reuse an existing HTTP client (connection pool).
    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            api_root: config.api_root().to_string(),
            api_key: config.api_key.clone(),
        }
    }

    pub fn tile_url(&self, imagery_id: i64, tile: &TileId) -> String {
        format!(
            "{}/api/imagery/{}/tile/{}/{}/{}",
            self.api_root, imagery_id, tile.zoom, tile.x, tile.y
        )
    }
}

#[async_trait]
impl TileSource for HttpTileSource {
    #[instrument(skip(self, tile), fields(tile = %tile))]
    async fn fetch_tile(&self, imagery_id: i64, tile: &TileId) -> KiwiResult<TileFetch> {
        let url = self.tile_url(imagery_id, tile);
        let context = format!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .map_err(|e| KiwiError::transport(context.clone(), e))?;

        match response.status() {
            StatusCode::NOT_FOUND | StatusCode::NO_CONTENT => {
                debug!(status = %response.status(), "Tile not available");
                return Ok(TileFetch::Missing);
            }
            _ => {}
        }

        let response = response
            .error_for_status()
            .map_err(|e| KiwiError::transport(context.clone(), e))?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| KiwiError::transport(context, e))?;

        debug!(size = bytes.len(), "Fetched tile");
        Ok(TileFetch::Found(Raster::decode(&bytes)?))
    }
}

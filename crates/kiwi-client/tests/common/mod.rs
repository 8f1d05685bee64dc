//! Shared helpers for kiwi-client integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use axum::Router;
use image::DynamicImage;

use kiwi_client::{ClientConfig, KiwiClient, Raster, TileFetch, TileSource};
use kiwi_common::{KiwiError, KiwiResult, TileId};
use test_utils::{gradient_rgb_tile, tile_tag};

pub const API_KEY: &str = "test-key";

/// Serve `router` on an ephemeral local port and return its base URL.
pub async fn serve(router: Router) -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind mock server");
    let addr = listener.local_addr().expect("mock server has no address");
    tokio::spawn(async move {
        axum::serve(listener, router).await.expect("Mock server failed");
    });
    format!("http://{}", addr)
}

/// Base URL of a local port nothing listens on.
pub async fn closed_port_url() -> String {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind");
    let addr = listener.local_addr().expect("no address");
    drop(listener);
    format!("http://{}", addr)
}

pub fn client_for(base_url: &str) -> KiwiClient {
    KiwiClient::new(test_config(base_url)).expect("Failed to build client")
}

pub fn test_config(base_url: &str) -> ClientConfig {
    let mut config = ClientConfig::new(API_KEY, base_url);
    config.extract_url = format!("{}/v3/get_part", base_url.trim_end_matches('/'));
    config.request_timeout_secs = 10;
    config
}

/// Gradient tile tagged with its own column and row.
pub fn tagged_tile(tile: &TileId, size: u32) -> Raster {
    Raster::from_dynamic_image(DynamicImage::ImageRgb8(gradient_rgb_tile(
        size,
        tile_tag(tile.x, tile.y),
    )))
}

/// In-memory tile source that records every request.
#[derive(Default)]
pub struct MemoryTileSource {
    tiles: HashMap<TileId, Raster>,
    failing: Option<TileId>,
    delays: HashMap<TileId, Duration>,
    calls: AtomicUsize,
    requested: Mutex<Vec<TileId>>,
}

impl MemoryTileSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_tile(mut self, tile: TileId, raster: Raster) -> Self {
        self.tiles.insert(tile, raster);
        self
    }

    /// Tagged gradient tiles for every tile in `x_range × y_range`.
    pub fn with_gradient_block(
        mut self,
        zoom: u32,
        x_range: std::ops::RangeInclusive<u32>,
        y_range: std::ops::RangeInclusive<u32>,
        size: u32,
    ) -> Self {
        for x in x_range {
            for y in y_range.clone() {
                let tile = TileId { zoom, x, y };
                self.tiles.insert(tile, tagged_tile(&tile, size));
            }
        }
        self
    }

    pub fn with_delay(mut self, tile: TileId, delay: Duration) -> Self {
        self.delays.insert(tile, delay);
        self
    }

    pub fn failing_on(mut self, tile: TileId) -> Self {
        self.failing = Some(tile);
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn requested(&self) -> Vec<TileId> {
        self.requested.lock().unwrap().clone()
    }
}

#[async_trait]
impl TileSource for MemoryTileSource {
    async fn fetch_tile(&self, _imagery_id: i64, tile: &TileId) -> KiwiResult<TileFetch> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requested.lock().unwrap().push(*tile);

        if let Some(delay) = self.delays.get(tile) {
            tokio::time::sleep(*delay).await;
        }
        if self.failing == Some(*tile) {
            return Err(KiwiError::transport(
                format!("GET tile {}", tile),
                "connection reset by peer",
            ));
        }

        Ok(match self.tiles.get(tile) {
            Some(raster) => TileFetch::Found(raster.clone()),
            None => TileFetch::Missing,
        })
    }
}

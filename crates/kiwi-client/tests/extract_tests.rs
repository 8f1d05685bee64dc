//! Task image extraction against a mock backend and extraction service.

mod common;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use image::DynamicImage;
use serde_json::Value;

use kiwi_client::{
    get_image_for_task, DownloadUrlCache, HttpDownloadUrlResolver, HttpRegionExtractor,
    KiwiClient, DEFAULT_MAX_SIZE,
};
use kiwi_common::KiwiError;
use test_utils::{encode_png, imagery_layer, solid_rgb_tile, CHICAGO_BLOCK};

use common::{client_for, closed_port_url, serve, test_config};

/// Imagery whose COG the extraction service refuses.
const BROKEN_IMAGERY: i64 = 13;
/// Imagery for which the extraction service answers with non-base64 text.
const GARBAGE_IMAGERY: i64 = 14;

#[derive(Default)]
struct MockState {
    url_lookups: AtomicUsize,
    extractions: AtomicUsize,
    last_request: Mutex<Option<Value>>,
}

async fn download_url(
    State(state): State<Arc<MockState>>,
    Path(imagery_id): Path<i64>,
) -> Json<String> {
    state.url_lookups.fetch_add(1, Ordering::SeqCst);
    let name = match imagery_id {
        BROKEN_IMAGERY => "broken",
        GARBAGE_IMAGERY => "garbage",
        _ => "cog",
    };
    Json(format!("https://storage.example/{}-{}.tif", name, imagery_id))
}

async fn get_part(State(state): State<Arc<MockState>>, Json(body): Json<Value>) -> Response {
    state.extractions.fetch_add(1, Ordering::SeqCst);
    let cog_url = body["cog_url"].as_str().unwrap_or_default().to_string();
    let max_size = body["max_size"].as_u64().unwrap_or(64) as u32;
    *state.last_request.lock().unwrap() = Some(body);

    if cog_url.contains("broken") {
        return (StatusCode::BAD_REQUEST, "could not open COG").into_response();
    }
    if cog_url.contains("garbage") {
        return "<html>not an image</html>".into_response();
    }

    let side = max_size.min(32);
    let png = encode_png(&DynamicImage::ImageRgb8(solid_rgb_tile(side, [40, 80, 120])));
    STANDARD.encode(png).into_response()
}

async fn mock_backend() -> (String, Arc<MockState>) {
    let state = Arc::new(MockState::default());
    let router = Router::new()
        .route("/api/imagery/:imagery_id/download_url", get(download_url))
        .route("/v3/get_part", post(get_part))
        .with_state(state.clone());
    (serve(router).await, state)
}

fn open_block() -> Vec<[f64; 2]> {
    CHICAGO_BLOCK[..4].to_vec()
}

// =============================================================================
// Happy path
// =============================================================================

#[tokio::test]
async fn test_image_for_task() {
    let (base, state) = mock_backend().await;
    let client = client_for(&base);

    let raster = client
        .get_image_for_task(&imagery_layer(7), &open_block(), DEFAULT_MAX_SIZE)
        .await
        .unwrap();

    assert_eq!(raster.shape(), (32, 32, 3));
    assert_eq!(raster.pixel(0, 0), &[40, 80, 120]);

    let request = state.last_request.lock().unwrap().clone().unwrap();
    assert_eq!(request["cog_url"], "https://storage.example/cog-7.tif");
    assert_eq!(request["max_size"], 1024);
    assert_eq!(request["base64"], false);
    assert_eq!(request["polygon"]["type"], "Feature");
    assert_eq!(request["polygon"]["geometry"]["type"], "Polygon");

    // the open ring was closed before sending
    let ring = request["polygon"]["geometry"]["coordinates"][0]
        .as_array()
        .unwrap()
        .clone();
    assert_eq!(ring.len(), 5);
    assert_eq!(ring[0], ring[4]);
    assert_eq!(ring[1][0], CHICAGO_BLOCK[1][0]);
}

#[tokio::test]
async fn test_download_url_is_memoized_per_imagery() {
    let (base, state) = mock_backend().await;
    let client = client_for(&base);
    let imagery = imagery_layer(7);

    for _ in 0..3 {
        client
            .get_image_for_task(&imagery, &open_block(), 256)
            .await
            .unwrap();
    }
    assert_eq!(state.url_lookups.load(Ordering::SeqCst), 1);
    assert_eq!(state.extractions.load(Ordering::SeqCst), 3);
    assert_eq!(
        client.download_urls().cached(7).await.as_deref(),
        Some("https://storage.example/cog-7.tif")
    );

    client
        .get_image_for_task(&imagery_layer(8), &open_block(), 256)
        .await
        .unwrap();
    assert_eq!(state.url_lookups.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_free_function_with_explicit_collaborators() {
    let (base, state) = mock_backend().await;
    let config = test_config(&base);
    let cache = DownloadUrlCache::new(HttpDownloadUrlResolver::new(&config).unwrap());
    let extractor = HttpRegionExtractor::new(&config).unwrap();

    let raster = get_image_for_task(&cache, &extractor, &imagery_layer(9), &open_block(), 16)
        .await
        .unwrap();

    assert_eq!(raster.shape(), (16, 16, 3));
    assert_eq!(cache.len().await, 1);
    assert_eq!(state.url_lookups.load(Ordering::SeqCst), 1);
}

// =============================================================================
// Failures
// =============================================================================

#[tokio::test]
async fn test_invalid_polygon_never_reaches_the_network() {
    let (base, state) = mock_backend().await;
    let client = client_for(&base);

    let degenerate = vec![[-87.6, 41.8], [-87.5, 41.9]];
    let err = client
        .get_image_for_task(&imagery_layer(7), &degenerate, 1024)
        .await
        .unwrap_err();

    assert!(matches!(err, KiwiError::InvalidGeometry(_)));
    assert_eq!(state.url_lookups.load(Ordering::SeqCst), 0);
    assert_eq!(state.extractions.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_service_rejection_is_extraction_error() {
    let (base, _state) = mock_backend().await;
    let client = client_for(&base);

    let err = client
        .get_image_for_task(&imagery_layer(BROKEN_IMAGERY), &open_block(), 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, KiwiError::Extraction(ref msg) if msg.contains("400")));
}

#[tokio::test]
async fn test_undecodable_body_is_extraction_error() {
    let (base, _state) = mock_backend().await;
    let client = client_for(&base);

    let err = client
        .get_image_for_task(&imagery_layer(GARBAGE_IMAGERY), &open_block(), 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, KiwiError::Extraction(_)));
}

#[tokio::test]
async fn test_unreachable_service_is_transport_error() {
    let (base, _state) = mock_backend().await;
    let mut config = test_config(&base);
    config.extract_url = format!("{}/v3/get_part", closed_port_url().await);
    let client = KiwiClient::new(config).unwrap();

    let err = client
        .get_image_for_task(&imagery_layer(7), &open_block(), 1024)
        .await
        .unwrap_err();
    assert!(matches!(err, KiwiError::Transport { .. }));
}

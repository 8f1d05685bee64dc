//! Cropping imagery to a polygon through the region extraction service.

use async_trait::async_trait;
use base64::Engine;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use kiwi_common::{ImageryLayer, KiwiError, KiwiResult, LngLat};
use kiwi_geometry::{close_ring, validate_polygon};

use crate::config::ClientConfig;
use crate::download_url::DownloadUrlResolver;
use crate::raster::Raster;

/// Largest output edge requested when the caller does not choose one.
pub const DEFAULT_MAX_SIZE: u32 = 1024;

/// Crops a cloud-optimized GeoTIFF to a polygon.
#[async_trait]
pub trait RegionExtractor: Send + Sync {
    /// Image of `polygon` (a closed `[lng, lat]` ring) cut from the raster
    /// at `url`, at most `max_size` pixels wide.
    async fn extract_region(&self, url: &str, polygon: &[LngLat], max_size: u32) -> KiwiResult<Raster>;
}

/// Calls the hosted extraction service.
///
/// The request body is
/// `{"polygon": <GeoJSON Feature>, "cog_url": .., "max_size": .., "base64": false}`
/// and the answer is an encoded image as base64 text.
#[derive(Debug, Clone)]
pub struct HttpRegionExtractor {
    client: Client,
    endpoint: String,
}

impl HttpRegionExtractor {
    pub fn new(config: &ClientConfig) -> KiwiResult<Self> {
        Ok(Self::with_client(config.http_client()?, config.extract_url.clone()))
    }

    pub fn with_client(client: Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl RegionExtractor for HttpRegionExtractor {
    #[instrument(skip(self, url, polygon), fields(endpoint = %self.endpoint, vertices = polygon.len()))]
    async fn extract_region(&self, url: &str, polygon: &[LngLat], max_size: u32) -> KiwiResult<Raster> {
        let body = json!({
            "polygon": {
                "type": "Feature",
                "properties": {},
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [polygon],
                },
            },
            "cog_url": url,
            "max_size": max_size,
            "base64": false,
        });

        let context = format!("POST {}", self.endpoint);
        let response = self
            .client
            .post(&self.endpoint)
            .json(&body)
            .send()
            .await
            .map_err(|e| KiwiError::transport(context.clone(), e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| KiwiError::transport(context, e))?;

        if !status.is_success() {
            warn!(status = %status, "Extraction service rejected request");
            return Err(KiwiError::extraction(format!(
                "service answered {}: {}",
                status,
                snippet(&text)
            )));
        }

        decode_base64_image(&text)
    }
}

/// Decode base64 text (line breaks allowed) holding an encoded image.
fn decode_base64_image(text: &str) -> KiwiResult<Raster> {
    let compact: String = text.chars().filter(|c| !c.is_ascii_whitespace()).collect();
    let bytes = base64::engine::general_purpose::STANDARD
        .decode(compact.as_bytes())
        .map_err(|e| KiwiError::extraction(format!("response is not base64: {}", e)))?;

    Raster::decode(&bytes).map_err(|e| KiwiError::extraction(e.to_string()))
}

fn snippet(text: &str) -> &str {
    match text.char_indices().nth(200) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

/// Image of `imagery` inside the `[lng, lat]` polygon `coordinates`.
///
/// The ring is closed if needed. The imagery download URL comes from
/// `resolver`, which is normally a [`DownloadUrlCache`](crate::DownloadUrlCache).
/// Areas of the polygon's bounding box outside the polygon or the imagery
/// come back black.
#[instrument(skip(resolver, extractor, imagery, coordinates), fields(imagery_id = imagery.id))]
pub async fn get_image_for_task<R, E>(
    resolver: &R,
    extractor: &E,
    imagery: &ImageryLayer,
    coordinates: &[LngLat],
    max_size: u32,
) -> KiwiResult<Raster>
where
    R: DownloadUrlResolver + ?Sized,
    E: RegionExtractor + ?Sized,
{
    validate_polygon(coordinates)?;
    if max_size == 0 {
        return Err(KiwiError::Config("max_size must be > 0".to_string()));
    }
    let ring = close_ring(coordinates);

    let url = resolver.resolve_download_url(imagery.id).await?;
    debug!(max_size, "Requesting region");

    let raster = extractor.extract_region(&url, &ring, max_size).await?;
    info!(
        width = raster.width(),
        height = raster.height(),
        channels = raster.channels(),
        "Extracted task image"
    );
    Ok(raster)
}

#[cfg(test)]
mod tests {
    use super::*;
    use base64::engine::general_purpose::STANDARD;
    use image::DynamicImage;
    use test_utils::{encode_png, solid_rgb_tile};

    #[test]
    fn test_decode_base64_image() {
        let png = encode_png(&DynamicImage::ImageRgb8(solid_rgb_tile(4, [9, 9, 9])));
        let mut text = STANDARD.encode(&png);
        // MIME-style line breaks are tolerated
        text.insert(10, '\n');

        let raster = decode_base64_image(&text).unwrap();
        assert_eq!(raster.shape(), (4, 4, 3));
    }

    #[test]
    fn test_decode_failures_are_extraction_errors() {
        assert!(matches!(
            decode_base64_image("!!!not base64!!!"),
            Err(KiwiError::Extraction(_))
        ));
        assert!(matches!(
            decode_base64_image(&STANDARD.encode(b"plain text")),
            Err(KiwiError::Extraction(_))
        ));
    }

    #[test]
    fn test_snippet_is_char_safe() {
        let long = "é".repeat(300);
        assert_eq!(snippet(&long).chars().count(), 200);
        assert_eq!(snippet("short"), "short");
    }
}

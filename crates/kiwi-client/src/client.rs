//! Authenticated access to the projectkiwi REST API.

use reqwest::{Client, RequestBuilder};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use kiwi_common::{
    Annotation, AnnotationPayload, AnnotationRecord, ImageryLayer, KiwiError, KiwiResult, Label, LabelingQueue,
    LngLat, Project,
};
use kiwi_geometry::{filter_annotations, FilterOptions};

use crate::config::{ClientConfig, API_KEY_HEADER};
use crate::download_url::{DownloadUrlCache, HttpDownloadUrlResolver};
use crate::extract::{get_image_for_task, HttpRegionExtractor};
use crate::raster::Raster;
use crate::supertile::{get_super_tile_with, MosaicOptions};
use crate::tile_source::HttpTileSource;

/// Color given to new labels when none is chosen.
pub const DEFAULT_LABEL_COLOR: &str = "rgb(255, 0, 0)";

/// Client for one projectkiwi account.
///
/// Every request carries the configured API key. The client owns a
/// [`DownloadUrlCache`], so imagery download URLs are fetched once per
/// client.
pub struct KiwiClient {
    http: Client,
    config: ClientConfig,
    tiles: HttpTileSource,
    download_urls: DownloadUrlCache<HttpDownloadUrlResolver>,
    extractor: HttpRegionExtractor,
}

impl KiwiClient {
    /// Create a client; the configuration is validated first.
    pub fn new(config: ClientConfig) -> KiwiResult<Self> {
        config.validate()?;
        let http = config.http_client()?;

        Ok(Self {
            tiles: HttpTileSource::with_client(http.clone(), &config),
            download_urls: DownloadUrlCache::new(HttpDownloadUrlResolver::with_client(
                http.clone(),
                &config,
            )),
            extractor: HttpRegionExtractor::with_client(http.clone(), config.extract_url.clone()),
            http,
            config,
        })
    }

    /// Shorthand for a client with default settings.
    pub fn connect(api_key: impl Into<String>, base_url: impl Into<String>) -> KiwiResult<Self> {
        Self::new(ClientConfig::new(api_key, base_url))
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Tile source backed by this client's connection pool.
    pub fn tile_source(&self) -> &HttpTileSource {
        &self.tiles
    }

    pub fn download_urls(&self) -> &DownloadUrlCache<HttpDownloadUrlResolver> {
        &self.download_urls
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.api_root(), path)
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, context: String) -> KiwiResult<T> {
        let response = request
            .header(API_KEY_HEADER, &self.config.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| KiwiError::transport(context.clone(), e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| KiwiError::transport(context, e))?;

        Ok(serde_json::from_slice(&body)?)
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> KiwiResult<T> {
        let url = self.url(path);
        debug!(url = %url, "GET");
        self.send(self.http.get(&url), format!("GET {}", path)).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> KiwiResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(path);
        debug!(url = %url, "POST");
        self.send(self.http.post(&url).json(body), format!("POST {}", path))
            .await
    }

    // =========================================================================
    // Projects and labels
    // =========================================================================

    /// Projects visible to this key.
    #[instrument(skip(self))]
    pub async fn get_projects(&self) -> KiwiResult<Vec<Project>> {
        let projects: Vec<Project> = self.get_json("/api/project").await?;
        info!(count = projects.len(), "Listed projects");
        Ok(projects)
    }

    #[instrument(skip(self))]
    pub async fn create_project(&self, name: &str) -> KiwiResult<Project> {
        self.post_json("/api/project", &json!({ "name": name })).await
    }

    /// Labels (annotation layers) of a project.
    #[instrument(skip(self))]
    pub async fn get_labels(&self, project_id: i64) -> KiwiResult<Vec<Label>> {
        self.get_json(&format!("/api/project/{}/labels", project_id))
            .await
    }

    /// Add an active label. `color` defaults to [`DEFAULT_LABEL_COLOR`].
    #[instrument(skip(self))]
    pub async fn add_label(
        &self,
        project_id: i64,
        name: &str,
        color: Option<&str>,
    ) -> KiwiResult<Label> {
        let body = json!({
            "name": name,
            "color": color.unwrap_or(DEFAULT_LABEL_COLOR),
            "active": true,
        });
        self.post_json(&format!("/api/project/{}/labels", project_id), &body)
            .await
    }

    // =========================================================================
    // Annotations
    // =========================================================================

    /// Annotations of a project. Records whose geometry cannot be
    /// represented (a point without exactly one coordinate) are skipped
    /// with a warning.
    #[instrument(skip(self))]
    pub async fn get_annotations(&self, project_id: i64) -> KiwiResult<Vec<Annotation>> {
        let records: Vec<AnnotationRecord> = self
            .get_json(&format!("/api/project/{}/annotations", project_id))
            .await?;
        let total = records.len();

        // One unusable record must not hide the rest of the project
        let annotations: Vec<Annotation> = records
            .into_iter()
            .filter_map(|record| {
                let id = record.id;
                match Annotation::try_from(record) {
                    Ok(annotation) => Some(annotation),
                    Err(e) => {
                        warn!(annotation_id = id, error = %e, "Skipping annotation");
                        None
                    }
                }
            })
            .collect();

        debug!(count = annotations.len(), skipped = total - annotations.len(), "Listed annotations");
        Ok(annotations)
    }

    #[instrument(skip(self, annotation), fields(shape = %annotation.shape))]
    pub async fn add_annotation(
        &self,
        project_id: i64,
        annotation: &AnnotationPayload,
    ) -> KiwiResult<Annotation> {
        self.post_json(&format!("/api/project/{}/annotations", project_id), annotation)
            .await
    }

    /// Create several annotations in one request.
    #[instrument(skip(self, annotations), fields(count = annotations.len()))]
    pub async fn add_annotations(
        &self,
        project_id: i64,
        annotations: &[AnnotationPayload],
    ) -> KiwiResult<Vec<Annotation>> {
        self.post_json(
            &format!("/api/project/{}/annotations/batch", project_id),
            annotations,
        )
        .await
    }

    /// Annotations of a project overlapping the `"z/x/y"` tile by more
    /// than `threshold`.
    pub async fn get_annotations_for_tile(
        &self,
        project_id: i64,
        zxy: &str,
        threshold: f64,
    ) -> KiwiResult<Vec<Annotation>> {
        self.get_annotations_for_tile_with(project_id, zxy, &FilterOptions::new(threshold))
            .await
    }

    #[instrument(skip(self, options))]
    pub async fn get_annotations_for_tile_with(
        &self,
        project_id: i64,
        zxy: &str,
        options: &FilterOptions,
    ) -> KiwiResult<Vec<Annotation>> {
        // Fail on a bad tile id before paying for the listing
        let tile = zxy.parse()?;
        let annotations = self.get_annotations(project_id).await?;
        filter_annotations(&annotations, &tile, options)
    }

    // =========================================================================
    // Labeling queues and imagery
    // =========================================================================

    #[instrument(skip(self))]
    pub async fn get_labeling_queues(&self, project_id: i64) -> KiwiResult<Vec<LabelingQueue>> {
        self.get_json(&format!("/api/project/{}/labelingQueue", project_id))
            .await
    }

    #[instrument(skip(self))]
    pub async fn get_imagery(&self, project_id: i64) -> KiwiResult<Vec<ImageryLayer>> {
        self.get_json(&format!("/api/project/{}/imagery", project_id))
            .await
    }

    /// Padded mosaic of `max_zoom` tiles covering the `"z/x/y"` tile.
    pub async fn get_super_tile(
        &self,
        zxy: &str,
        imagery_id: i64,
        max_zoom: u32,
        padding: u32,
    ) -> KiwiResult<Raster> {
        let tile = zxy.parse()?;
        let options = MosaicOptions {
            tile_size: self.config.tile_size,
            concurrency: self.config.fetch_concurrency,
        };
        get_super_tile_with(&self.tiles, &tile, imagery_id, max_zoom, padding, &options).await
    }

    /// Image of `imagery` cropped to the polygon `coordinates`, at most
    /// `max_size` pixels wide.
    pub async fn get_image_for_task(
        &self,
        imagery: &ImageryLayer,
        coordinates: &[LngLat],
        max_size: u32,
    ) -> KiwiResult<Raster> {
        get_image_for_task(
            &self.download_urls,
            &self.extractor,
            imagery,
            coordinates,
            max_size,
        )
        .await
    }
}

//! Signed download URLs for imagery layers.
//!
//! Resolving a URL costs a backend round trip, so [`DownloadUrlCache`]
//! memoizes the result per imagery id for the lifetime of the cache.
//! Entries are never invalidated.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;
use tokio::sync::{OnceCell, RwLock};
use tracing::{debug, instrument};

use kiwi_common::{KiwiError, KiwiResult};

use crate::config::{ClientConfig, API_KEY_HEADER};

/// Resolves the download URL of an imagery layer.
#[async_trait]
pub trait DownloadUrlResolver: Send + Sync {
    async fn resolve_download_url(&self, imagery_id: i64) -> KiwiResult<String>;
}

/// Asks the backend at `GET {base_url}/api/imagery/{id}/download_url`.
#[derive(Debug, Clone)]
pub struct HttpDownloadUrlResolver {
    client: Client,
    api_root: String,
    api_key: String,
}

impl HttpDownloadUrlResolver {
    pub fn new(config: &ClientConfig) -> KiwiResult<Self> {
        Ok(Self::with_client(config.http_client()?, config))
    }

    pub fn with_client(client: Client, config: &ClientConfig) -> Self {
        Self {
            client,
            api_root: config.api_root().to_string(),
            api_key: config.api_key.clone(),
        }
    }
}

#[async_trait]
impl DownloadUrlResolver for HttpDownloadUrlResolver {
    #[instrument(skip(self))]
    async fn resolve_download_url(&self, imagery_id: i64) -> KiwiResult<String> {
        let url = format!("{}/api/imagery/{}/download_url", self.api_root, imagery_id);
        let context = format!("GET {}", url);

        let response = self
            .client
            .get(&url)
            .header(API_KEY_HEADER, &self.api_key)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| KiwiError::transport(context.clone(), e))?;

        let body = response
            .bytes()
            .await
            .map_err(|e| KiwiError::transport(context, e))?;

        parse_download_url(&body)
    }
}

/// The backend answers with a JSON string; an object carrying `url` or
/// `downloadUrl` is accepted as well.
fn parse_download_url(body: &[u8]) -> KiwiResult<String> {
    let value: Value = serde_json::from_slice(body)?;
    let url = match &value {
        Value::String(s) => Some(s.as_str()),
        Value::Object(map) => map
            .get("url")
            .or_else(|| map.get("downloadUrl"))
            .and_then(Value::as_str),
        _ => None,
    };

    match url {
        Some(url) if !url.is_empty() => Ok(url.to_string()),
        _ => Err(KiwiError::decode(format!(
            "download_url response is not a URL: {}",
            value
        ))),
    }
}

/// Memoizing wrapper around a [`DownloadUrlResolver`].
///
/// Safe to share between tasks; each imagery id is resolved at most once.
/// Every id has its own cell, so a slow resolution only holds up callers
/// asking for that same id.
pub struct DownloadUrlCache<R> {
    resolver: R,
    urls: RwLock<HashMap<i64, Arc<OnceCell<String>>>>,
}

impl<R: DownloadUrlResolver> DownloadUrlCache<R> {
    pub fn new(resolver: R) -> Self {
        Self {
            resolver,
            urls: RwLock::new(HashMap::new()),
        }
    }

    async fn cell(&self, imagery_id: i64) -> Arc<OnceCell<String>> {
        if let Some(cell) = self.urls.read().await.get(&imagery_id) {
            return cell.clone();
        }
        self.urls.write().await.entry(imagery_id).or_default().clone()
    }

    /// URL for `imagery_id`, resolving it on first use.
    ///
    /// Concurrent callers for the same id wait on one resolution. A failed
    /// resolution leaves the cell empty for the next caller to retry.
    pub async fn get(&self, imagery_id: i64) -> KiwiResult<String> {
        let cell = self.cell(imagery_id).await;
        let url = cell
            .get_or_try_init(|| async {
                let url = self.resolver.resolve_download_url(imagery_id).await?;
                debug!(imagery_id, "Cached imagery download URL");
                Ok::<_, KiwiError>(url)
            })
            .await?;
        Ok(url.clone())
    }

    /// Previously resolved URL, without resolving.
    pub async fn cached(&self, imagery_id: i64) -> Option<String> {
        self.urls
            .read()
            .await
            .get(&imagery_id)
            .and_then(|cell| cell.get().cloned())
    }

    /// Number of resolved ids.
    pub async fn len(&self) -> usize {
        self.urls
            .read()
            .await
            .values()
            .filter(|cell| cell.initialized())
            .count()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

#[async_trait]
impl<R: DownloadUrlResolver> DownloadUrlResolver for DownloadUrlCache<R> {
    async fn resolve_download_url(&self, imagery_id: i64) -> KiwiResult<String> {
        self.get(imagery_id).await
    }
}

//! Configuration for the projectkiwi client.

use std::time::Duration;

use reqwest::Client;
use serde::{Deserialize, Serialize};

use kiwi_common::{KiwiError, KiwiResult, DEFAULT_TILE_SIZE, MAX_TILE_SIZE};

/// Header carrying the API key on every backend call.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Region extraction endpoint used when none is configured.
pub const DEFAULT_EXTRACT_URL: &str = "https://api.projectkiwi.io/v3/get_part";

/// Backend used when none is configured.
pub const DEFAULT_BASE_URL: &str = "https://projectkiwi.io";

/// Client configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    /// Static API key sent as `x-api-key`.
    pub api_key: String,

    /// Backend base URL; a trailing `/` is ignored.
    pub base_url: String,

    /// Region extraction service.
    pub extract_url: String,

    /// Edge length of imagery tiles in pixels.
    pub tile_size: u32,

    /// Maximum number of tile fetches in flight while building a mosaic.
    pub fetch_concurrency: usize,

    /// Whole-request timeout in seconds.
    pub request_timeout_secs: u64,

    /// TCP connect timeout in seconds.
    pub connect_timeout_secs: u64,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            extract_url: DEFAULT_EXTRACT_URL.to_string(),
            tile_size: DEFAULT_TILE_SIZE,
            fetch_concurrency: 8,
            request_timeout_secs: 60,
            connect_timeout_secs: 10,
        }
    }
}

impl ClientConfig {
    /// Default configuration with the given key and base URL.
    pub fn new(api_key: impl Into<String>, base_url: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: base_url.into(),
            ..Self::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PROJECTKIWI_API_KEY") {
            config.api_key = val;
        }

        if let Ok(val) = std::env::var("PROJECTKIWI_URL") {
            config.base_url = val;
        }

        if let Ok(val) = std::env::var("PROJECTKIWI_EXTRACT_URL") {
            config.extract_url = val;
        }

        if let Ok(val) = std::env::var("PROJECTKIWI_TILE_SIZE") {
            if let Ok(size) = val.parse() {
                config.tile_size = size;
            }
        }

        if let Ok(val) = std::env::var("PROJECTKIWI_FETCH_CONCURRENCY") {
            if let Ok(n) = val.parse() {
                config.fetch_concurrency = n;
            }
        }

        if let Ok(val) = std::env::var("PROJECTKIWI_TIMEOUT_SECS") {
            if let Ok(secs) = val.parse() {
                config.request_timeout_secs = secs;
            }
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> KiwiResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(KiwiError::Config("api_key must not be empty".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(KiwiError::Config(format!(
                "base_url must be an http(s) URL, got '{}'",
                self.base_url
            )));
        }

        if self.tile_size == 0 || self.tile_size > MAX_TILE_SIZE {
            return Err(KiwiError::Config(format!(
                "tile_size must be in 1..={}, got {}",
                MAX_TILE_SIZE, self.tile_size
            )));
        }

        if self.fetch_concurrency == 0 {
            return Err(KiwiError::Config("fetch_concurrency must be > 0".to_string()));
        }

        if self.request_timeout_secs == 0 {
            return Err(KiwiError::Config("request_timeout_secs must be > 0".to_string()));
        }

        Ok(())
    }

    /// Base URL without trailing slashes.
    pub fn api_root(&self) -> &str {
        self.base_url.trim_end_matches('/')
    }

    /// Build the shared HTTP client with the configured timeouts.
    pub fn http_client(&self) -> KiwiResult<Client> {
        Client::builder()
            .timeout(Duration::from_secs(self.request_timeout_secs))
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .pool_max_idle_per_host(self.fetch_concurrency.max(1))
            .tcp_nodelay(true)
            .build()
            .map_err(|e| KiwiError::Config(format!("Failed to create HTTP client: {}", e)))
    }
}

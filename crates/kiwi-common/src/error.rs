//! Error types for the projectkiwi client.

use thiserror::Error;

/// Result type alias using KiwiError.
pub type KiwiResult<T> = Result<T, KiwiError>;

/// Boxed underlying cause carried by transport errors.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Primary error type for client operations.
#[derive(Debug, Error)]
pub enum KiwiError {
    // === Validation Errors ===
    #[error("Malformed tile id '{input}': {reason}")]
    MalformedTileId { input: String, reason: String },

    #[error("Invalid zoom: {0}")]
    InvalidZoom(String),

    #[error("Invalid geometry: {0}")]
    InvalidGeometry(String),

    #[error("Invalid {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },

    // === Remote Errors ===
    #[error("Transport error during {context}: {source}")]
    Transport {
        context: String,
        #[source]
        source: BoxError,
    },

    #[error("Extraction failed: {0}")]
    Extraction(String),

    #[error("Failed to decode response: {0}")]
    Decode(String),

    // === Setup Errors ===
    #[error("Configuration error: {0}")]
    Config(String),
}

impl KiwiError {
    /// Create a MalformedTileId error.
    pub fn malformed_tile_id(input: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::MalformedTileId {
            input: input.into(),
            reason: reason.into(),
        }
    }

    /// Create an InvalidZoom error.
    pub fn invalid_zoom(msg: impl Into<String>) -> Self {
        Self::InvalidZoom(msg.into())
    }

    /// Create an InvalidGeometry error.
    pub fn invalid_geometry(msg: impl Into<String>) -> Self {
        Self::InvalidGeometry(msg.into())
    }

    /// Create an InvalidValue error for a non-geometric field.
    pub fn invalid_value(field: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidValue {
            field,
            reason: reason.into(),
        }
    }

    /// Wrap a collaborator failure, keeping the underlying cause.
    pub fn transport(
        context: impl Into<String>,
        source: impl Into<BoxError>,
    ) -> Self {
        Self::Transport {
            context: context.into(),
            source: source.into(),
        }
    }

    /// Create an Extraction error.
    pub fn extraction(msg: impl Into<String>) -> Self {
        Self::Extraction(msg.into())
    }

    /// Create a Decode error.
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::Decode(msg.into())
    }

    /// True for errors raised by local validation (never worth retrying).
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            KiwiError::MalformedTileId { .. }
                | KiwiError::InvalidZoom(_)
                | KiwiError::InvalidGeometry(_)
                | KiwiError::InvalidValue { .. }
                | KiwiError::Config(_)
        )
    }
}

impl From<serde_json::Error> for KiwiError {
    fn from(err: serde_json::Error) -> Self {
        KiwiError::Decode(format!("JSON error: {}", err))
    }
}

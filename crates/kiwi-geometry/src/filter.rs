//! Selecting the annotations that belong to a tile.

use serde::{Deserialize, Serialize};
use tracing::debug;

use kiwi_common::{Annotation, KiwiError, KiwiResult, TileId};

use crate::overlap::overlap_ratio;

/// How an overlap ratio is compared against the threshold.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdMode {
    /// Keep annotations whose ratio is strictly greater than the threshold.
    #[default]
    Exclusive,
    /// Keep annotations whose ratio is greater than or equal to the threshold.
    Inclusive,
}

impl ThresholdMode {
    pub fn passes(&self, ratio: f64, threshold: f64) -> bool {
        match self {
            ThresholdMode::Exclusive => ratio > threshold,
            ThresholdMode::Inclusive => ratio >= threshold,
        }
    }
}

/// Options for [`filter_annotations`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Minimum overlap ratio, in `[0, 1]`.
    pub threshold: f64,
    #[serde(default)]
    pub mode: ThresholdMode,
}

impl FilterOptions {
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold,
            mode: ThresholdMode::Exclusive,
        }
    }

    pub fn with_mode(mut self, mode: ThresholdMode) -> Self {
        self.mode = mode;
        self
    }
}

impl Default for FilterOptions {
    fn default() -> Self {
        Self::new(0.2)
    }
}

/// Annotations overlapping the `"z/x/y"` tile by more than `threshold`.
///
/// Input order is kept; the input is not modified.
pub fn get_annotations_for_tile(
    annotations: &[Annotation],
    zxy: &str,
    threshold: f64,
) -> KiwiResult<Vec<Annotation>> {
    let tile: TileId = zxy.parse()?;
    filter_annotations(annotations, &tile, &FilterOptions::new(threshold))
}

/// Annotations whose overlap with `tile` passes `options`.
pub fn filter_annotations(
    annotations: &[Annotation],
    tile: &TileId,
    options: &FilterOptions,
) -> KiwiResult<Vec<Annotation>> {
    if !options.threshold.is_finite() {
        return Err(KiwiError::Config(format!(
            "overlap threshold must be a finite number, got {}",
            options.threshold
        )));
    }

    let bbox = tile.bbox();
    let selected: Vec<Annotation> = annotations
        .iter()
        .filter(|a| options.mode.passes(overlap_ratio(&a.geometry, &bbox), options.threshold))
        .cloned()
        .collect();

    debug!(
        tile = %tile,
        threshold = options.threshold,
        mode = ?options.mode,
        total = annotations.len(),
        selected = selected.len(),
        "Filtered annotations for tile"
    );

    Ok(selected)
}

//! Writing command results.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};
use image::ImageFormat;
use serde_json::Value;

use kiwi_client::Raster;

/// Pretty-print `value` as JSON on stdout.
pub fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    let json: Value = serde_json::to_value(value)?;
    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &json)?;
    writeln!(stdout)?;
    Ok(())
}

/// Save a raster as PNG, creating parent directories.
pub fn write_png(raster: &Raster, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    raster
        .to_dynamic_image()?
        .save_with_format(path, ImageFormat::Png)
        .with_context(|| format!("Failed to write {}", path.display()))
}

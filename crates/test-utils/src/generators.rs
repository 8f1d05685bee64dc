//! Synthetic tile image generators.
//!
//! These produce predictable pixel patterns so stitched mosaics can be
//! checked pixel-for-pixel against the tiles they were built from.

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};
use std::io::Cursor;

/// Creates an RGB tile filled with a single colour.
pub fn solid_rgb_tile(size: u32, color: [u8; 3]) -> RgbImage {
    RgbImage::from_pixel(size, size, Rgb(color))
}

/// Creates an RGBA tile filled with a single colour.
pub fn solid_rgba_tile(size: u32, color: [u8; 4]) -> RgbaImage {
    RgbaImage::from_pixel(size, size, Rgba(color))
}

/// Creates an RGB tile whose pixels encode their own position.
///
/// Red grows with the column, green with the row, and blue is a per-tile
/// tag so tiles can be told apart after stitching.
pub fn gradient_rgb_tile(size: u32, tag: u8) -> RgbImage {
    RgbImage::from_fn(size, size, |x, y| {
        let r = (x * 255 / size.max(2).saturating_sub(1)).min(255) as u8;
        let g = (y * 255 / size.max(2).saturating_sub(1)).min(255) as u8;
        Rgb([r, g, tag])
    })
}

/// Deterministic colour tag for a tile, derived from its column and row.
pub fn tile_tag(x: u32, y: u32) -> u8 {
    ((x.wrapping_mul(31) ^ y.wrapping_mul(17)) % 251) as u8 + 1
}

/// Encode an image as PNG bytes.
pub fn encode_png(image: &DynamicImage) -> Vec<u8> {
    let mut buf = Cursor::new(Vec::new());
    image
        .write_to(&mut buf, ImageOutputFormat::Png)
        .expect("PNG encoding of an in-memory image cannot fail");
    buf.into_inner()
}

/// Mean over every channel of every pixel.
pub fn mean_pixel_value(image: &DynamicImage) -> f64 {
    let bytes = image.as_bytes();
    if bytes.is_empty() {
        return 0.0;
    }
    bytes.iter().map(|&b| b as f64).sum::<f64>() / bytes.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gradient_corners() {
        let tile = gradient_rgb_tile(256, 9);
        assert_eq!(tile.get_pixel(0, 0), &Rgb([0, 0, 9]));
        assert_eq!(tile.get_pixel(255, 255), &Rgb([255, 255, 9]));
    }

    #[test]
    fn test_png_roundtrip() {
        let tile = DynamicImage::ImageRgb8(solid_rgb_tile(16, [10, 20, 30]));
        let png = encode_png(&tile);
        let decoded = image::load_from_memory(&png).unwrap();
        assert_eq!(decoded.to_rgb8(), tile.to_rgb8());
        assert_eq!(mean_pixel_value(&decoded), 20.0);
    }

    #[test]
    fn test_tile_tag_nonzero() {
        for x in 0..64 {
            for y in 0..64 {
                assert_ne!(tile_tag(x, y), 0);
            }
        }
    }
}

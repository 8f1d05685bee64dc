//! In-memory 8-bit rasters.
//!
//! A [`Raster`] is a row-major `height × width × channels` byte array.
//! Channel layouts follow the source image: 1 = gray, 2 = gray + alpha,
//! 3 = RGB, 4 = RGBA.

use image::imageops::FilterType;
use image::{DynamicImage, GrayAlphaImage, GrayImage, RgbImage, RgbaImage};

use kiwi_common::{KiwiError, KiwiResult};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Raster {
    width: u32,
    height: u32,
    channels: u8,
    data: Vec<u8>,
}

impl Raster {
    /// A black (all zero) raster.
    pub fn zeros(width: u32, height: u32, channels: u8) -> Self {
        let len = width as usize * height as usize * channels as usize;
        Self {
            width,
            height,
            channels,
            data: vec![0; len],
        }
    }

    /// Wrap raw pixel bytes, checking the buffer length.
    pub fn from_raw(width: u32, height: u32, channels: u8, data: Vec<u8>) -> KiwiResult<Self> {
        if !(1..=4).contains(&channels) {
            return Err(KiwiError::decode(format!(
                "unsupported channel count {}",
                channels
            )));
        }
        let expected = width as usize * height as usize * channels as usize;
        if data.len() != expected {
            return Err(KiwiError::decode(format!(
                "raster buffer has {} bytes, expected {} for {}x{}x{}",
                data.len(),
                expected,
                width,
                height,
                channels
            )));
        }
        Ok(Self {
            width,
            height,
            channels,
            data,
        })
    }

    /// Decode an encoded image (PNG, JPEG, WebP, TIFF...).
    pub fn decode(bytes: &[u8]) -> KiwiResult<Self> {
        let img = image::load_from_memory(bytes)
            .map_err(|e| KiwiError::decode(format!("Failed to decode image: {}", e)))?;
        Ok(Self::from_dynamic_image(img))
    }

    /// Convert a decoded image, keeping 8-bit layouts as they are and
    /// reducing wider sample types to 8 bits.
    pub fn from_dynamic_image(img: DynamicImage) -> Self {
        let (width, height) = (img.width(), img.height());
        let (channels, data) = match img {
            DynamicImage::ImageLuma8(buf) => (1, buf.into_raw()),
            DynamicImage::ImageLumaA8(buf) => (2, buf.into_raw()),
            DynamicImage::ImageRgb8(buf) => (3, buf.into_raw()),
            DynamicImage::ImageRgba8(buf) => (4, buf.into_raw()),
            other => match other.color().channel_count() {
                1 => (1, other.to_luma8().into_raw()),
                2 => (2, other.to_luma_alpha8().into_raw()),
                3 => (3, other.to_rgb8().into_raw()),
                _ => (4, other.to_rgba8().into_raw()),
            },
        };
        Self {
            width,
            height,
            channels,
            data,
        }
    }

    /// Convert into an `image` buffer of the matching color type.
    pub fn to_dynamic_image(&self) -> KiwiResult<DynamicImage> {
        let (w, h, data) = (self.width, self.height, self.data.clone());
        let img = match self.channels {
            1 => GrayImage::from_raw(w, h, data).map(DynamicImage::ImageLuma8),
            2 => GrayAlphaImage::from_raw(w, h, data).map(DynamicImage::ImageLumaA8),
            3 => RgbImage::from_raw(w, h, data).map(DynamicImage::ImageRgb8),
            _ => RgbaImage::from_raw(w, h, data).map(DynamicImage::ImageRgba8),
        };
        img.ok_or_else(|| KiwiError::decode("raster buffer does not match its dimensions"))
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn channels(&self) -> u8 {
        self.channels
    }

    /// `(height, width, channels)`.
    pub fn shape(&self) -> (usize, usize, usize) {
        (
            self.height as usize,
            self.width as usize,
            self.channels as usize,
        )
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    /// Channel values of the pixel at `(x, y)`.
    pub fn pixel(&self, x: u32, y: u32) -> &[u8] {
        let c = self.channels as usize;
        let start = (y as usize * self.width as usize + x as usize) * c;
        &self.data[start..start + c]
    }

    /// Mean over every channel of every pixel.
    pub fn mean(&self) -> f64 {
        if self.data.is_empty() {
            return 0.0;
        }
        self.data.iter().map(|&b| b as f64).sum::<f64>() / self.data.len() as f64
    }

    /// Widen to `channels` (gray to RGB, opaque alpha added when needed).
    ///
    /// Narrowing is not supported; asking for fewer channels returns an
    /// unchanged copy.
    pub fn widen(&self, channels: u8) -> Raster {
        let channels = channels.min(4);
        if channels <= self.channels {
            return self.clone();
        }

        let src_c = self.channels as usize;
        let dst_c = channels as usize;
        let mut data = Vec::with_capacity(self.data.len() / src_c * dst_c);
        for px in self.data.chunks_exact(src_c) {
            let (rgb, alpha) = match px {
                [g] => ([*g, *g, *g], 255),
                [g, a] => ([*g, *g, *g], *a),
                [r, g, b] => ([*r, *g, *b], 255),
                _ => ([px[0], px[1], px[2]], px[3]),
            };
            match dst_c {
                2 => data.extend_from_slice(&[rgb[0], alpha]),
                3 => data.extend_from_slice(&rgb),
                _ => data.extend_from_slice(&[rgb[0], rgb[1], rgb[2], alpha]),
            }
        }

        Raster {
            width: self.width,
            height: self.height,
            channels,
            data,
        }
    }

    /// Resample to `width × height` with bilinear filtering.
    pub fn resize(&self, width: u32, height: u32) -> KiwiResult<Raster> {
        if width == self.width && height == self.height {
            return Ok(self.clone());
        }
        let resized = self
            .to_dynamic_image()?
            .resize_exact(width, height, FilterType::Triangle);
        Ok(Raster::from_dynamic_image(resized))
    }

    /// Copy `src` into this raster with its top-left corner at
    /// `(x_off, y_off)`. Parts falling outside are dropped.
    ///
    /// Both rasters must have the same channel count.
    pub fn blit(&mut self, src: &Raster, x_off: i64, y_off: i64) {
        debug_assert_eq!(self.channels, src.channels);
        let c = self.channels as usize;

        let x0 = x_off.max(0);
        let y0 = y_off.max(0);
        let x1 = (x_off + src.width as i64).min(self.width as i64);
        let y1 = (y_off + src.height as i64).min(self.height as i64);
        if x0 >= x1 || y0 >= y1 {
            return;
        }

        let row_len = (x1 - x0) as usize * c;
        for y in y0..y1 {
            let sy = (y - y_off) as usize;
            let sx = (x0 - x_off) as usize;
            let src_start = (sy * src.width as usize + sx) * c;
            let dst_start = (y as usize * self.width as usize + x0 as usize) * c;
            self.data[dst_start..dst_start + row_len]
                .copy_from_slice(&src.data[src_start..src_start + row_len]);
        }
    }

    /// Sub-raster of `width × height` starting at `(x, y)`.
    ///
    /// Areas beyond this raster's edges come back black.
    pub fn crop(&self, x: u32, y: u32, width: u32, height: u32) -> Raster {
        let mut out = Raster::zeros(width, height, self.channels);
        out.blit(self, -(x as i64), -(y as i64));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_utils::{encode_png, gradient_rgb_tile, solid_rgb_tile};

    // =========================================================================
    // Decoding
    // =========================================================================

    #[test]
    fn test_decode_png_keeps_layout() {
        let png = encode_png(&DynamicImage::ImageRgb8(solid_rgb_tile(8, [10, 20, 30])));
        let raster = Raster::decode(&png).unwrap();
        assert_eq!(raster.shape(), (8, 8, 3));
        assert_eq!(raster.pixel(3, 4), &[10, 20, 30]);
        assert_eq!(raster.mean(), 20.0);
    }

    #[test]
    fn test_decode_garbage() {
        let err = Raster::decode(b"not an image").unwrap_err();
        assert!(matches!(err, KiwiError::Decode(_)));
    }

    #[test]
    fn test_from_raw_checks_length() {
        assert!(Raster::from_raw(2, 2, 3, vec![0; 12]).is_ok());
        assert!(Raster::from_raw(2, 2, 3, vec![0; 11]).is_err());
        assert!(Raster::from_raw(2, 2, 5, vec![0; 20]).is_err());
    }

    // =========================================================================
    // Channels
    // =========================================================================

    #[test]
    fn test_widen_gray() {
        let gray = Raster::from_raw(1, 1, 1, vec![7]).unwrap();
        assert_eq!(gray.widen(3).as_bytes(), &[7, 7, 7]);
        assert_eq!(gray.widen(4).as_bytes(), &[7, 7, 7, 255]);
        assert_eq!(gray.widen(2).as_bytes(), &[7, 255]);
    }

    #[test]
    fn test_widen_rgb_to_rgba() {
        let rgb = Raster::from_raw(2, 1, 3, vec![1, 2, 3, 4, 5, 6]).unwrap();
        let rgba = rgb.widen(4);
        assert_eq!(rgba.channels(), 4);
        assert_eq!(rgba.as_bytes(), &[1, 2, 3, 255, 4, 5, 6, 255]);
        assert_eq!(rgb.widen(1), rgb);
    }

    // =========================================================================
    // Geometry
    // =========================================================================

    #[test]
    fn test_blit_and_crop() {
        let mut canvas = Raster::zeros(4, 4, 1);
        let src = Raster::from_raw(2, 2, 1, vec![1, 2, 3, 4]).unwrap();
        canvas.blit(&src, 1, 1);
        assert_eq!(canvas.pixel(1, 1), &[1]);
        assert_eq!(canvas.pixel(2, 2), &[4]);
        assert_eq!(canvas.pixel(0, 0), &[0]);

        // partially outside on the top-left
        canvas.blit(&src, -1, -1);
        assert_eq!(canvas.pixel(0, 0), &[4]);

        let cropped = canvas.crop(1, 1, 2, 2);
        assert_eq!(cropped.as_bytes(), &[1, 2, 3, 4]);

        let beyond = canvas.crop(2, 2, 3, 3);
        assert_eq!(beyond.as_bytes(), &[4, 0, 0, 0, 0, 0, 0, 0, 0]);
    }

    #[test]
    fn test_resize() {
        let tile = Raster::from_dynamic_image(DynamicImage::ImageRgb8(gradient_rgb_tile(512, 5)));
        let small = tile.resize(256, 256).unwrap();
        assert_eq!(small.shape(), (256, 256, 3));
        assert_eq!(small.pixel(10, 10)[2], 5);
        assert!((small.mean() - tile.mean()).abs() < 2.0);
    }

    #[test]
    fn test_dynamic_image_roundtrip() {
        let raster = Raster::from_raw(2, 1, 4, vec![1, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        let img = raster.to_dynamic_image().unwrap();
        assert_eq!(Raster::from_dynamic_image(img), raster);
    }
}

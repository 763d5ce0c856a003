//! Image normalization
//!
//! Turns a raw capture into an upright image whose longest side does not
//! exceed the configured bound. Rotation happens before scaling so the scale
//! factor is computed from the upright dimensions.

use std::io::Cursor;
use std::path::Path;

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;

use crate::capture::{CapturedImage, Orientation};
use crate::{Error, Result};

/// Upright, size-bounded image ready for upload
#[derive(Debug, Clone)]
pub struct NormalizedImage {
    pixels: DynamicImage,
}

impl NormalizedImage {
    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub const fn pixels(&self) -> &DynamicImage {
        &self.pixels
    }

    /// Release the pixel buffer
    #[must_use]
    pub fn into_pixels(self) -> DynamicImage {
        self.pixels
    }

    /// Encode as baseline JPEG at the given quality (clamped to 1..=100)
    ///
    /// # Errors
    ///
    /// Returns `Encode` if the encoder rejects the image
    pub fn encode_jpeg(&self, quality: u8) -> Result<Vec<u8>> {
        let rgb = self.pixels.to_rgb8();
        let mut buf = Cursor::new(Vec::new());
        JpegEncoder::new_with_quality(&mut buf, quality.clamp(1, 100))
            .encode_image(&rgb)
            .map_err(|e| Error::Encode(e.to_string()))?;
        Ok(buf.into_inner())
    }

    /// Encode as JPEG and write to `path`
    ///
    /// # Errors
    ///
    /// Returns error if encoding or writing fails
    pub fn save_jpeg(&self, path: &Path, quality: u8) -> Result<()> {
        let bytes = self.encode_jpeg(quality)?;
        std::fs::write(path, bytes)?;
        Ok(())
    }
}

/// Rotates and bounds captures
#[derive(Debug, Clone, Copy)]
pub struct ImageNormalizer {
    max_dimension: u32,
}

impl ImageNormalizer {
    /// Create a normalizer bounding the longest side to `max_dimension`
    #[must_use]
    pub const fn new(max_dimension: u32) -> Self {
        Self { max_dimension }
    }

    #[must_use]
    pub const fn max_dimension(&self) -> u32 {
        self.max_dimension
    }

    /// Normalize a capture with this normalizer's bound
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` for a zero-area capture
    pub fn normalize(&self, image: CapturedImage) -> Result<NormalizedImage> {
        normalize(image, self.max_dimension)
    }
}

/// Rotate a capture upright, then scale it down so `max(w, h) <= max_dimension`
///
/// Never scales up. A single factor is applied to both axes and the resulting
/// dimensions are rounded to the nearest pixel.
///
/// # Errors
///
/// Returns `InvalidImage` for a zero-area capture or a zero bound
pub fn normalize(image: CapturedImage, max_dimension: u32) -> Result<NormalizedImage> {
    if image.width() == 0 || image.height() == 0 {
        return Err(Error::InvalidImage(format!(
            "zero-area capture ({}x{})",
            image.width(),
            image.height()
        )));
    }
    if max_dimension == 0 {
        return Err(Error::InvalidImage("max dimension must be positive".to_string()));
    }

    let (pixels, orientation) = image.into_parts();
    let upright = rotate_upright(pixels, orientation);

    let (width, height) = (upright.width(), upright.height());
    let pixels = match scaled_dimensions(width, height, max_dimension) {
        Some((new_width, new_height)) => {
            tracing::debug!(
                width,
                height,
                new_width,
                new_height,
                "scaling capture down"
            );
            upright.resize_exact(new_width, new_height, FilterType::Triangle)
        }
        None => upright,
    };

    Ok(NormalizedImage { pixels })
}

fn rotate_upright(pixels: DynamicImage, orientation: Orientation) -> DynamicImage {
    match orientation {
        Orientation::Normal => pixels,
        Orientation::Rotate90 => pixels.rotate90(),
        Orientation::Rotate180 => pixels.rotate180(),
        Orientation::Rotate270 => pixels.rotate270(),
    }
}

/// Target dimensions, or `None` when already within bounds
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
fn scaled_dimensions(width: u32, height: u32, max_dimension: u32) -> Option<(u32, u32)> {
    let longest = width.max(height);
    if longest <= max_dimension {
        return None;
    }

    let scale = f64::from(max_dimension) / f64::from(longest);
    let scale_axis = |v: u32| ((f64::from(v) * scale).round() as u32).clamp(1, max_dimension);
    Some((scale_axis(width), scale_axis(height)))
}

#[cfg(test)]
mod tests {
    use image::{GrayImage, Luma};

    use super::*;

    fn capture(width: u32, height: u32, orientation: Orientation) -> CapturedImage {
        CapturedImage::new(
            DynamicImage::ImageLuma8(GrayImage::new(width, height)),
            orientation,
        )
    }

    #[test]
    fn test_scaled_dimensions() {
        assert_eq!(scaled_dimensions(3000, 2000, 1600), Some((1600, 1067)));
        assert_eq!(scaled_dimensions(2000, 3000, 1600), Some((1067, 1600)));
        assert_eq!(scaled_dimensions(1600, 1600, 1600), None);
        assert_eq!(scaled_dimensions(800, 600, 1600), None);
        // Extreme aspect ratios never collapse an axis to zero
        assert_eq!(scaled_dimensions(10_000, 1, 100), Some((100, 1)));
    }

    #[test]
    fn test_zero_area_is_invalid() {
        let result = normalize(capture(0, 10, Orientation::Normal), 1600);
        assert!(matches!(result, Err(Error::InvalidImage(_))));

        let result = normalize(capture(10, 0, Orientation::Rotate90), 1600);
        assert!(matches!(result, Err(Error::InvalidImage(_))));
    }

    #[test]
    fn test_rotation_before_scaling() {
        let out = normalize(capture(400, 200, Orientation::Rotate90), 100).unwrap();
        assert_eq!((out.width(), out.height()), (50, 100));

        let out = normalize(capture(400, 200, Orientation::Rotate180), 100).unwrap();
        assert_eq!((out.width(), out.height()), (100, 50));
    }

    #[test]
    fn test_rotate90_moves_top_left_to_top_right() {
        // Mark the top-left pixel of a landscape capture
        let mut raw = GrayImage::new(4, 2);
        raw.put_pixel(0, 0, Luma([255]));
        let captured = CapturedImage::new(DynamicImage::ImageLuma8(raw), Orientation::Rotate90);

        let out = normalize(captured, 1600).unwrap().into_pixels().to_luma8();
        assert_eq!(out.dimensions(), (2, 4));
        assert_eq!(out.get_pixel(1, 0), &Luma([255]));
        assert_eq!(out.get_pixel(0, 0), &Luma([0]));
    }

    #[test]
    fn test_encode_jpeg_produces_jpeg() {
        let out = normalize(capture(32, 16, Orientation::Normal), 1600).unwrap();
        let bytes = out.encode_jpeg(90).unwrap();
        assert_eq!(&bytes[..3], &[0xFF, 0xD8, 0xFF]);
    }

    #[test]
    fn test_normalizer_uses_its_bound() {
        let normalizer = ImageNormalizer::new(64);
        let out = normalizer.normalize(capture(256, 128, Orientation::Normal)).unwrap();
        assert_eq!((out.width(), out.height()), (64, 32));
        assert_eq!(normalizer.max_dimension(), 64);
    }
}

//! Capture boundary
//!
//! A capture is a stored photo plus the orientation tag the camera wrote into
//! its EXIF metadata. The core never takes pictures itself; it only reads what
//! the camera collaborator left on disk.

use std::io::{BufReader, Cursor};
use std::path::Path;

use image::{DynamicImage, ImageReader};

use crate::{Error, Result};

/// EXIF orientation tag of a capture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Orientation {
    #[default]
    Normal,
    Rotate90,
    Rotate180,
    Rotate270,
}

impl Orientation {
    /// All admissible tags
    pub const ALL: [Self; 4] = [Self::Normal, Self::Rotate90, Self::Rotate180, Self::Rotate270];

    /// Map an EXIF orientation value (tag 0x0112)
    ///
    /// Mirrored variants (2, 4, 5, 7) are treated as normal.
    #[must_use]
    pub const fn from_exif(value: u32) -> Self {
        match value {
            6 => Self::Rotate90,
            3 => Self::Rotate180,
            8 => Self::Rotate270,
            _ => Self::Normal,
        }
    }

    /// Clockwise rotation needed to make the capture upright
    #[must_use]
    pub const fn degrees(self) -> u16 {
        match self {
            Self::Normal => 0,
            Self::Rotate90 => 90,
            Self::Rotate180 => 180,
            Self::Rotate270 => 270,
        }
    }

    /// Whether correcting this tag swaps width and height
    #[must_use]
    pub const fn swaps_axes(self) -> bool {
        matches!(self, Self::Rotate90 | Self::Rotate270)
    }
}

/// Raw photo as delivered by the camera, owned by one pipeline run
#[derive(Debug, Clone)]
pub struct CapturedImage {
    pixels: DynamicImage,
    orientation: Orientation,
}

impl CapturedImage {
    /// Wrap an in-memory capture
    #[must_use]
    pub const fn new(pixels: DynamicImage, orientation: Orientation) -> Self {
        Self {
            pixels,
            orientation,
        }
    }

    /// Load a stored photo and read its orientation tag
    ///
    /// # Errors
    ///
    /// Returns `Io` if the file cannot be read, `InvalidImage` if it cannot be decoded
    pub fn from_path(path: &Path) -> Result<Self> {
        let bytes = std::fs::read(path)?;
        Self::from_bytes(&bytes)
    }

    /// Decode an encoded photo (JPEG, PNG, ...) and read its orientation tag
    ///
    /// # Errors
    ///
    /// Returns `InvalidImage` if the bytes cannot be decoded
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.is_empty() {
            return Err(Error::InvalidImage("image data is empty".to_string()));
        }

        let pixels = ImageReader::new(Cursor::new(bytes))
            .with_guessed_format()?
            .decode()
            .map_err(|e| Error::InvalidImage(e.to_string()))?;

        let orientation = Orientation::from_exif(read_exif_orientation(bytes));

        tracing::debug!(
            width = pixels.width(),
            height = pixels.height(),
            ?orientation,
            "capture decoded"
        );

        Ok(Self::new(pixels, orientation))
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.pixels.width()
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.pixels.height()
    }

    #[must_use]
    pub const fn orientation(&self) -> Orientation {
        self.orientation
    }

    /// Split into pixels and tag, consuming the capture
    #[must_use]
    pub fn into_parts(self) -> (DynamicImage, Orientation) {
        (self.pixels, self.orientation)
    }
}

/// Read the EXIF orientation value, 1 (normal) when absent
fn read_exif_orientation(bytes: &[u8]) -> u32 {
    let mut reader = BufReader::new(Cursor::new(bytes));
    let Ok(exif) = exif::Reader::new().read_from_container(&mut reader) else {
        return 1;
    };

    exif.get_field(exif::Tag::Orientation, exif::In::PRIMARY)
        .and_then(|f| f.value.get_uint(0))
        .unwrap_or(1)
}

#[cfg(test)]
mod tests {
    use image::{ImageFormat, RgbImage};

    use super::*;

    #[test]
    fn test_exif_mapping() {
        assert_eq!(Orientation::from_exif(1), Orientation::Normal);
        assert_eq!(Orientation::from_exif(6), Orientation::Rotate90);
        assert_eq!(Orientation::from_exif(3), Orientation::Rotate180);
        assert_eq!(Orientation::from_exif(8), Orientation::Rotate270);
        // Mirrored and unknown values fall back to normal
        assert_eq!(Orientation::from_exif(2), Orientation::Normal);
        assert_eq!(Orientation::from_exif(7), Orientation::Normal);
        assert_eq!(Orientation::from_exif(0), Orientation::Normal);
    }

    #[test]
    fn test_degrees_and_axes() {
        let degrees: Vec<u16> = Orientation::ALL.iter().map(|o| o.degrees()).collect();
        assert_eq!(degrees, vec![0, 90, 180, 270]);
        assert!(Orientation::Rotate90.swaps_axes());
        assert!(Orientation::Rotate270.swaps_axes());
        assert!(!Orientation::Rotate180.swaps_axes());
    }

    #[test]
    fn test_from_bytes_without_exif_is_normal() {
        let mut png = Vec::new();
        DynamicImage::ImageRgb8(RgbImage::new(8, 4))
            .write_to(&mut Cursor::new(&mut png), ImageFormat::Png)
            .unwrap();

        let capture = CapturedImage::from_bytes(&png).unwrap();
        assert_eq!((capture.width(), capture.height()), (8, 4));
        assert_eq!(capture.orientation(), Orientation::Normal);
    }

    #[test]
    fn test_from_bytes_rejects_garbage() {
        let result = CapturedImage::from_bytes(&[0x00, 0x01, 0x02, 0x03]);
        assert!(matches!(result, Err(Error::InvalidImage(_))));

        let result = CapturedImage::from_bytes(&[]);
        assert!(matches!(result, Err(Error::InvalidImage(_))));
    }
}

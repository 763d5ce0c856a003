//! Capture decoding and normalization integration tests

use image::{DynamicImage, ImageFormat, RgbImage};
use tokio_test::assert_ok;
use visionspeak::{CapturedImage, ErrorKind, ImageNormalizer, Orientation, normalize};

mod common;

use common::{capture, jpeg_with_orientation};

const SIZES: [(u32, u32); 7] = [
    (300, 200),
    (200, 300),
    (160, 160),
    (161, 40),
    (80, 60),
    (400, 1),
    (1, 1),
];

const BOUNDS: [u32; 3] = [160, 50, 1];

/// Dimensions after rotating upright
const fn upright(width: u32, height: u32, orientation: Orientation) -> (u32, u32) {
    if orientation.swaps_axes() {
        (height, width)
    } else {
        (width, height)
    }
}

#[test]
fn test_output_respects_bound() {
    for orientation in Orientation::ALL {
        for (width, height) in SIZES {
            for bound in BOUNDS {
                let out = assert_ok!(normalize(capture(width, height, orientation), bound));
                assert!(
                    out.width().max(out.height()) <= bound,
                    "{width}x{height} {orientation:?} bound {bound} -> {}x{}",
                    out.width(),
                    out.height()
                );
            }
        }
    }
}

#[test]
fn test_aspect_ratio_within_one_pixel() {
    for orientation in Orientation::ALL {
        for (width, height) in SIZES {
            for bound in BOUNDS {
                let (up_w, up_h) = upright(width, height, orientation);
                let longest = up_w.max(up_h);
                let scale = if longest > bound {
                    f64::from(bound) / f64::from(longest)
                } else {
                    1.0
                };

                let out = normalize(capture(width, height, orientation), bound).unwrap();
                let dw = (f64::from(out.width()) - f64::from(up_w) * scale).abs();
                let dh = (f64::from(out.height()) - f64::from(up_h) * scale).abs();
                assert!(
                    dw <= 1.0 && dh <= 1.0,
                    "{width}x{height} {orientation:?} bound {bound} -> {}x{}",
                    out.width(),
                    out.height()
                );
            }
        }
    }
}

#[test]
fn test_never_upscales() {
    for orientation in Orientation::ALL {
        for (width, height) in SIZES {
            let out = normalize(capture(width, height, orientation), 1600).unwrap();
            assert_eq!(
                (out.width(), out.height()),
                upright(width, height, orientation)
            );
        }
    }
}

#[test]
fn test_normalizing_twice_is_stable() {
    let normalizer = ImageNormalizer::new(160);
    for orientation in Orientation::ALL {
        for (width, height) in SIZES {
            let once = normalizer
                .normalize(capture(width, height, orientation))
                .unwrap();
            let dims = (once.width(), once.height());

            let again = normalizer
                .normalize(CapturedImage::new(once.into_pixels(), Orientation::Normal))
                .unwrap();
            assert_eq!((again.width(), again.height()), dims);
        }
    }
}

#[test]
fn test_portrait_capture_tagged_rotate_90() {
    let out = normalize(capture(3000, 2000, Orientation::Rotate90), 1600).unwrap();
    assert_eq!((out.width(), out.height()), (1067, 1600));
}

#[test]
fn test_zero_area_capture_is_invalid() {
    let err = normalize(capture(0, 0, Orientation::Normal), 1600).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
}

#[test]
fn test_undecodable_bytes_are_invalid() {
    let err = CapturedImage::from_bytes(b"definitely not a photo").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);

    let err = CapturedImage::from_bytes(&[]).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::InvalidImage);
}

#[test]
fn test_untagged_png_decodes_as_normal() {
    let mut bytes = Vec::new();
    DynamicImage::ImageRgb8(RgbImage::new(12, 7))
        .write_to(&mut std::io::Cursor::new(&mut bytes), ImageFormat::Png)
        .unwrap();

    let capture = CapturedImage::from_bytes(&bytes).unwrap();
    assert_eq!(capture.orientation(), Orientation::Normal);
    assert_eq!((capture.width(), capture.height()), (12, 7));
}

#[test]
fn test_exif_orientation_tag_is_read() {
    let cases = [
        (1, Orientation::Normal),
        (6, Orientation::Rotate90),
        (3, Orientation::Rotate180),
        (8, Orientation::Rotate270),
        (2, Orientation::Normal),
    ];
    for (tag, expected) in cases {
        let capture = CapturedImage::from_bytes(&jpeg_with_orientation(30, 20, tag)).unwrap();
        assert_eq!(capture.orientation(), expected, "EXIF orientation {tag}");
        assert_eq!((capture.width(), capture.height()), (30, 20));
    }
}

#[test]
fn test_tagged_jpeg_normalizes_upright() {
    let normalizer = ImageNormalizer::new(15);
    for (tag, dims) in [(6, (10, 15)), (8, (10, 15)), (3, (15, 10)), (1, (15, 10))] {
        let capture = CapturedImage::from_bytes(&jpeg_with_orientation(30, 20, tag)).unwrap();
        let out = normalizer.normalize(capture).unwrap();
        assert_eq!((out.width(), out.height()), dims, "EXIF orientation {tag}");
    }
}

#[test]
fn test_saved_jpeg_reloads_with_same_dimensions() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("JPEG_20240101_120000.jpg");

    let out = normalize(capture(640, 480, Orientation::Rotate270), 320).unwrap();
    assert_ok!(out.save_jpeg(&path, 90));

    let reloaded = CapturedImage::from_path(&path).unwrap();
    assert_eq!((reloaded.width(), reloaded.height()), (240, 320));
    assert_eq!(reloaded.orientation(), Orientation::Normal);
}

#[test]
fn test_missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = CapturedImage::from_path(&dir.path().join("absent.jpg")).unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Io);
}

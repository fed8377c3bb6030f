//! Turns arbitrary images into the normalized NHWC tensor the classifiers take.

use std::path::Path;

use image::imageops::{self, FilterType};
use image::DynamicImage;
use ndarray::Array4;

use crate::error::ClassifierError;
use crate::labels::{CHANNELS, IMAGE_SIZE, INPUT_SHAPE};

/// Decodes encoded image bytes (format sniffed from the content) and normalizes them.
pub fn from_bytes(bytes: &[u8]) -> Result<Array4<f32>, ClassifierError> {
    let img = image::load_from_memory(bytes)?;
    Ok(from_image(&img))
}

pub fn from_path(path: &Path) -> Result<Array4<f32>, ClassifierError> {
    let bytes = std::fs::read(path)?;
    from_bytes(&bytes)
}

/// Forces RGB, resizes to 32x32 with Lanczos3 and scales to `[0, 1]`.
///
/// The result has shape `(1, 32, 32, 3)`.
pub fn from_image(img: &DynamicImage) -> Array4<f32> {
    let rgb = img.to_rgb8();
    let resized = imageops::resize(
        &rgb,
        IMAGE_SIZE as u32,
        IMAGE_SIZE as u32,
        FilterType::Lanczos3,
    );

    let mut input = Array4::zeros(INPUT_SHAPE);
    for (x, y, pixel) in resized.enumerate_pixels() {
        for c in 0..CHANNELS {
            input[[0, y as usize, x as usize, c]] = pixel[c] as f32 / 255.0;
        }
    }

    input
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use image::{ImageOutputFormat, Rgb, RgbImage, Rgba, RgbaImage};

    use super::*;

    fn encode(img: DynamicImage, format: ImageOutputFormat) -> Vec<u8> {
        let mut bytes = Cursor::new(Vec::new());
        img.write_to(&mut bytes, format).unwrap();
        bytes.into_inner()
    }

    fn assert_normalized(input: &Array4<f32>) {
        assert_eq!(input.shape(), &INPUT_SHAPE);
        assert!(input.iter().all(|v| (0.0..=1.0).contains(v)));
    }

    #[test]
    fn test_arbitrary_dimensions_are_resized() {
        for (w, h) in [(1, 1), (7, 300), (640, 480), (32, 32)] {
            let img = RgbImage::from_fn(w, h, |x, y| Rgb([(x % 256) as u8, (y % 256) as u8, 200]));
            let bytes = encode(DynamicImage::ImageRgb8(img), ImageOutputFormat::Png);
            let input = from_bytes(&bytes).unwrap();
            assert_normalized(&input);
        }
    }

    #[test]
    fn test_alpha_and_grayscale_become_rgb() {
        let rgba = RgbaImage::from_pixel(10, 20, Rgba([255, 0, 0, 10]));
        let input = from_image(&DynamicImage::ImageRgba8(rgba));
        assert_normalized(&input);
        assert!((input[[0, 5, 5, 0]] - 1.0).abs() < 1e-6);
        assert!(input[[0, 5, 5, 1]].abs() < 1e-6);

        let gray = image::GrayImage::from_pixel(50, 50, image::Luma([51]));
        let input = from_image(&DynamicImage::ImageLuma8(gray));
        assert_normalized(&input);
        for c in 0..CHANNELS {
            assert!((input[[0, 16, 16, c]] - 0.2).abs() < 1e-6);
        }
    }

    #[test]
    fn test_jpeg_and_bmp_decode() {
        let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(64, 48, Rgb([10, 120, 250])));
        for format in [ImageOutputFormat::Jpeg(90), ImageOutputFormat::Bmp] {
            let input = from_bytes(&encode(img.clone(), format)).unwrap();
            assert_normalized(&input);
        }
    }

    #[test]
    fn test_undecodable_bytes_are_reported() {
        let err = from_bytes(b"definitely not an image").unwrap_err();
        assert!(matches!(err, ClassifierError::Decode(_)));
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let err = from_path(Path::new("/nonexistent/cat.png")).unwrap_err();
        assert!(matches!(err, ClassifierError::Io(_)));
    }
}

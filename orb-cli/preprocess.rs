use std::path::Path;

use image::imageops::FilterType;
use image::{DynamicImage, GrayImage, ImageError, ImageReader, RgbImage};

use crate::error::{OrbError, OrbResult};

/// An image at canonical size, in colour and in grayscale
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedImage {
    pub color: RgbImage,
    pub gray: GrayImage,
}

/// Resizes every image to one canonical size and converts it to grayscale.
///
/// Resampling uses a triangle (bilinear) filter and grayscale uses the
/// `image` crate's fixed Rec. 709 luma weights, so the output is a pure
/// function of the input pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Preprocessor {
    width: u32,
    height: u32,
}

impl Preprocessor {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn prepare(&self, img: &DynamicImage) -> PreparedImage {
        let resized = if img.width() == self.width && img.height() == self.height {
            img.clone()
        } else {
            img.resize_exact(self.width, self.height, FilterType::Triangle)
        };

        PreparedImage {
            color: resized.to_rgb8(),
            gray: resized.to_luma8(),
        }
    }

    /// Decode a file and prepare it. The format is sniffed from the content.
    pub fn load(&self, path: &Path) -> OrbResult<PreparedImage> {
        let decode_error = |source: ImageError| OrbError::Decode {
            path: path.to_path_buf(),
            source,
        };
        let img = ImageReader::open(path)
            .and_then(|reader| reader.with_guessed_format())
            .map_err(|e| decode_error(ImageError::IoError(e)))?
            .decode()
            .map_err(decode_error)?;

        Ok(self.prepare(&img))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{Luma, Rgb};

    #[test]
    fn test_output_is_canonical_size() {
        let pre = Preprocessor::new(400, 300);
        for (w, h) in [(640, 480), (50, 70), (400, 300), (1, 1)] {
            let img = DynamicImage::ImageRgb8(RgbImage::from_pixel(w, h, Rgb([10, 200, 30])));
            let out = pre.prepare(&img);
            assert_eq!(out.color.dimensions(), (400, 300));
            assert_eq!(out.gray.dimensions(), (400, 300));
        }
    }

    #[test]
    fn test_gray_input_passes_through() {
        let pre = Preprocessor::new(8, 6);
        let gray = GrayImage::from_fn(8, 6, |x, y| Luma([(x * 20 + y) as u8]));
        let out = pre.prepare(&DynamicImage::ImageLuma8(gray.clone()));
        assert_eq!(out.gray, gray);
    }

    #[test]
    fn test_luma_is_deterministic() {
        let pre = Preprocessor::new(40, 30);
        let img = DynamicImage::ImageRgb8(RgbImage::from_fn(64, 48, |x, y| Rgb([x as u8, y as u8, (x ^ y) as u8])));
        assert_eq!(pre.prepare(&img), pre.prepare(&img));
    }

    #[test]
    fn test_load_reports_decode_failure() {
        let dir = tempfile::tempdir().unwrap();
        let pre = Preprocessor::new(40, 30);

        let junk = dir.path().join("cat_1.png");
        std::fs::write(&junk, b"definitely not a png").unwrap();
        assert!(matches!(pre.load(&junk), Err(OrbError::Decode { .. })));
        assert!(matches!(pre.load(&dir.path().join("missing.png")), Err(OrbError::Decode { .. })));
    }

    #[test]
    fn test_load_png() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("dog_1.png");
        GrayImage::from_pixel(20, 10, Luma([77])).save(&path).unwrap();
        let out = Preprocessor::new(40, 30).load(&path).unwrap();
        assert_eq!(out.gray.dimensions(), (40, 30));
        assert!(out.gray.pixels().all(|p| p.0[0].abs_diff(77) <= 1));
    }
}

use orb_core::{Image, PyramidLevel, ScaleLevel};
use crate::error::{FastError, FastResult};
use rayon::prelude::*;

/// Image pyramid operations for multi-scale feature detection
pub struct ImagePyramid;

impl ImagePyramid {
    /// Generate scale levels for image pyramid.
    ///
    /// Levels stop early once either side drops below `min_dim`.
    pub fn generate_scale_levels(
        width: usize,
        height: usize,
        n_levels: usize,
        scale_factor: f32,
        min_dim: usize,
    ) -> Vec<ScaleLevel> {
        let mut levels = Vec::with_capacity(n_levels);
        let mut current_scale = 1.0f32;

        for level in 0..n_levels {
            let scaled_width = ((width as f32) / current_scale).round() as usize;
            let scaled_height = ((height as f32) / current_scale).round() as usize;

            if scaled_width < min_dim || scaled_height < min_dim {
                break;
            }

            levels.push(ScaleLevel {
                level,
                scale: current_scale,
                width: scaled_width,
                height: scaled_height,
            });

            current_scale *= scale_factor;
        }

        levels
    }

    /// Build image pyramid from base image
    pub fn build_image_pyramid(
        img: &Image,
        width: usize,
        height: usize,
        scale_levels: &[ScaleLevel],
    ) -> FastResult<Vec<PyramidLevel>> {
        if img.len() != width * height {
            return Err(FastError::InvalidImageData {
                expected_len: width * height,
                actual_len: img.len(),
            });
        }

        let pyramid = scale_levels
            .par_iter()
            .map(|scale| {
                let image = if scale.level == 0 && scale.width == width && scale.height == height {
                    img.clone()
                } else {
                    Self::downsample_image(img, width, height, scale.width, scale.height)
                };
                PyramidLevel { scale: *scale, image }
            })
            .collect();

        Ok(pyramid)
    }

    /// Downsample image using bilinear interpolation
    fn downsample_image(
        img: &Image,
        src_width: usize,
        src_height: usize,
        target_width: usize,
        target_height: usize,
    ) -> Image {
        let mut downsampled = vec![0u8; target_width * target_height];

        let x_ratio = src_width as f32 / target_width as f32;
        let y_ratio = src_height as f32 / target_height as f32;

        for y in 0..target_height {
            for x in 0..target_width {
                let src_x = x as f32 * x_ratio;
                let src_y = y as f32 * y_ratio;

                let value = Self::bilinear_sample(img, src_width, src_height, src_x, src_y);
                downsampled[y * target_width + x] = value.round().clamp(0.0, 255.0) as u8;
            }
        }

        downsampled
    }

    /// Sample image at fractional coordinates using bilinear interpolation
    fn bilinear_sample(img: &Image, width: usize, height: usize, x: f32, y: f32) -> f32 {
        let x1 = (x.floor() as usize).min(width - 1);
        let y1 = (y.floor() as usize).min(height - 1);
        let x2 = (x1 + 1).min(width - 1);
        let y2 = (y1 + 1).min(height - 1);

        let fx = x - x1 as f32;
        let fy = y - y1 as f32;

        let p11 = img[y1 * width + x1] as f32;
        let p12 = img[y1 * width + x2] as f32;
        let p21 = img[y2 * width + x1] as f32;
        let p22 = img[y2 * width + x2] as f32;

        let interpolated_top = p11 * (1.0 - fx) + p12 * fx;
        let interpolated_bottom = p21 * (1.0 - fx) + p22 * fx;

        interpolated_top * (1.0 - fy) + interpolated_bottom * fy
    }
}

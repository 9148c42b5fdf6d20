use orb_core::{Image, Keypoint, OrbConfig, PyramidLevel, ScaleLevel};
use crate::error::{FastError, FastResult};
use crate::types::Detection;
use crate::pyramid::ImagePyramid;
use crate::corner_detection::CornerDetector;
use crate::refinement::KeypointRefinement;
use log::debug;
use rayon::prelude::*;

/// Main FAST corner detector with multi-scale capability
#[derive(Debug, Clone)]
pub struct FastDetector {
    cfg: OrbConfig,
    w: usize,
    h: usize,
    scale_levels: Vec<ScaleLevel>,
    budgets: Vec<usize>,
}

impl FastDetector {
    /// Creates a new FAST detector with validation
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> FastResult<Self> {
        if width == 0 || height == 0 {
            return Err(FastError::InvalidImageSize { width, height });
        }

        // 0 accepts every pixel of a textured image as a corner
        if cfg.threshold == 0 || cfg.threshold > 127 {
            return Err(FastError::InvalidThreshold(cfg.threshold));
        }

        if cfg.patch_size % 2 == 0 || cfg.patch_size < 3 || cfg.patch_size / 2 > cfg.edge_threshold {
            return Err(FastError::InvalidPatchSize {
                patch_size: cfg.patch_size,
                edge_threshold: cfg.edge_threshold,
            });
        }

        if cfg.n_levels == 0 || !(cfg.scale_factor > 1.0) {
            return Err(FastError::InvalidPyramid {
                n_levels: cfg.n_levels,
                scale_factor: cfg.scale_factor,
            });
        }

        if cfg.max_features == 0 {
            return Err(FastError::NoFeatureBudget);
        }

        // Room for the FAST circle plus the border on both sides
        let min_size = 2 * cfg.edge_threshold.max(3) + 1;
        if width < min_size || height < min_size {
            return Err(FastError::ImageTooSmall { width, height, min_size });
        }

        let scale_levels =
            ImagePyramid::generate_scale_levels(width, height, cfg.n_levels, cfg.scale_factor, min_size);
        let budgets = Self::feature_budgets(cfg.max_features, scale_levels.len(), cfg.scale_factor);

        Ok(Self {
            cfg,
            w: width,
            h: height,
            scale_levels,
            budgets,
        })
    }

    /// Split `max_features` across `n_levels` geometrically, finer levels first.
    ///
    /// The budgets always sum to `max_features`.
    pub fn feature_budgets(max_features: usize, n_levels: usize, scale_factor: f32) -> Vec<usize> {
        if n_levels == 0 {
            return Vec::new();
        }

        let factor = 1.0 / scale_factor;
        let mut per_level =
            max_features as f32 * (1.0 - factor) / (1.0 - factor.powi(n_levels as i32));
        let mut budgets = Vec::with_capacity(n_levels);
        let mut total = 0usize;

        for _ in 0..n_levels - 1 {
            let n = (per_level.round() as usize).min(max_features - total);
            budgets.push(n);
            total += n;
            per_level *= factor;
        }
        budgets.push(max_features - total);

        budgets
    }

    /// Validates image data before processing
    fn validate_image(&self, img: &Image) -> FastResult<()> {
        let expected_len = self.w * self.h;
        if img.len() != expected_len {
            return Err(FastError::InvalidImageData {
                expected_len,
                actual_len: img.len(),
            });
        }
        Ok(())
    }

    /// Detect keypoints on every pyramid level and return them with the pyramid.
    ///
    /// Keypoints are ordered level by level, strongest first within a level.
    pub fn detect(&self, img: &Image) -> FastResult<Detection> {
        self.validate_image(img)?;

        let pyramid = ImagePyramid::build_image_pyramid(img, self.w, self.h, &self.scale_levels)?;

        let per_level: Vec<Vec<Keypoint>> = pyramid
            .par_iter()
            .zip(self.budgets.par_iter())
            .map(|(level, &budget)| self.detect_keypoints_at_level(level, budget))
            .collect();

        for (level, kps) in per_level.iter().enumerate() {
            debug!("level {}: {} keypoints (budget {})", level, kps.len(), self.budgets[level]);
        }

        let keypoints = per_level.into_iter().flatten().collect();
        Ok(Detection { keypoints, pyramid })
    }

    /// Detect keypoints without keeping the pyramid
    pub fn detect_keypoints(&self, img: &Image) -> FastResult<Vec<Keypoint>> {
        Ok(self.detect(img)?.keypoints)
    }

    /// FAST + Harris ranking + NMS + orientation on a single level
    pub fn detect_keypoints_at_level(&self, level: &PyramidLevel, budget: usize) -> Vec<Keypoint> {
        if budget == 0 {
            return Vec::new();
        }

        let scale = &level.scale;
        let corners = CornerDetector::detect_corners(
            &level.image,
            scale.width,
            scale.height,
            self.cfg.threshold,
            self.cfg.edge_threshold,
        );
        let suppressed = KeypointRefinement::non_maximum_suppression(&corners, self.cfg.nms_distance);
        let best = KeypointRefinement::retain_best(suppressed, budget);

        best.into_iter()
            .map(|corner| Keypoint {
                x: corner.x as f32 * scale.scale,
                y: corner.y as f32 * scale.scale,
                angle: KeypointRefinement::compute_orientation(
                    &level.image,
                    scale.width,
                    scale.height,
                    corner.x,
                    corner.y,
                    self.cfg.patch_size,
                ),
                size: self.cfg.patch_size as f32 * scale.scale,
                response: corner.response,
                octave: scale.level,
            })
            .collect()
    }

    /// Get scale levels for this detector
    pub fn get_scale_levels(&self) -> &[ScaleLevel] {
        &self.scale_levels
    }

    /// Per-level keypoint budgets
    pub fn budgets(&self) -> &[usize] {
        &self.budgets
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        &self.cfg
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        (self.w, self.h)
    }
}

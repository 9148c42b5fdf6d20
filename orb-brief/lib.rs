use image::GrayImage;
use imageproc::filter::gaussian_blur_f32;
use orb_core::{Descriptor, Image, Keypoint, PyramidLevel};
use rand::{SeedableRng, rngs::StdRng};
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;
use thiserror::Error;

const DESCRIPTOR_SIZE: usize = 32;
const N_PAIRS: usize = DESCRIPTOR_SIZE * 8;

/// Seed of the fixed sampling pattern; changing it invalidates every stored descriptor.
pub const DEFAULT_PATTERN_SEED: u64 = 0x0B_71EF;

/// Gaussian pre-smoothing applied to each level before the intensity tests
const SMOOTHING_SIGMA: f32 = 2.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum BriefError {
    #[error("Invalid BRIEF patch size {0} (must be odd and >= 5)")]
    InvalidPatchSize(usize),
    #[error("Keypoint refers to pyramid level {level}, but only {available} levels exist")]
    MissingLevel { level: usize, available: usize },
    #[error("Pyramid level {level} data does not match its {width}x{height} size")]
    InvalidLevel { level: usize, width: usize, height: usize },
}

pub type BriefResult<T> = Result<T, BriefError>;

/// Rotation-steered BRIEF over a fixed point-pair pattern
#[derive(Debug, Clone)]
pub struct BriefGenerator {
    patch_size: usize,
    pattern: Vec<[i32; 4]>,
}

impl BriefGenerator {
    pub fn new(patch_size: usize) -> BriefResult<Self> {
        Self::with_seed(patch_size, DEFAULT_PATTERN_SEED)
    }

    /// Generator whose 256 test pairs are drawn from an isotropic Gaussian
    /// (sigma = patch_size / 5) with a fixed seed, clamped to the patch.
    pub fn with_seed(patch_size: usize, seed: u64) -> BriefResult<Self> {
        if patch_size % 2 == 0 || patch_size < 5 {
            return Err(BriefError::InvalidPatchSize(patch_size));
        }
        let pattern = Self::sampling_pattern(patch_size, seed)?;
        Ok(Self { patch_size, pattern })
    }

    fn sampling_pattern(patch_size: usize, seed: u64) -> BriefResult<Vec<[i32; 4]>> {
        let half = (patch_size / 2) as f32;
        let normal = Normal::new(0.0f32, patch_size as f32 / 5.0)
            .map_err(|_| BriefError::InvalidPatchSize(patch_size))?;
        let mut rng = StdRng::seed_from_u64(seed);
        let mut sample = || normal.sample(&mut rng).round().clamp(-half, half) as i32;

        let mut pattern = Vec::with_capacity(N_PAIRS);
        while pattern.len() < N_PAIRS {
            let pair = [sample(), sample(), sample(), sample()];
            // A point compared with itself carries no information
            if pair[0] != pair[2] || pair[1] != pair[3] {
                pattern.push(pair);
            }
        }
        Ok(pattern)
    }

    pub fn patch_size(&self) -> usize {
        self.patch_size
    }

    /// Test pairs as `(x1, y1, x2, y2)` offsets from the keypoint
    pub fn pattern(&self) -> &[[i32; 4]] {
        &self.pattern
    }

    /// Gaussian-smooth every pyramid level
    pub fn smooth_pyramid(&self, pyramid: &[PyramidLevel]) -> BriefResult<Vec<Image>> {
        pyramid
            .par_iter()
            .map(|level| {
                let s = &level.scale;
                let gray = GrayImage::from_raw(s.width as u32, s.height as u32, level.image.clone())
                    .ok_or(BriefError::InvalidLevel {
                        level: s.level,
                        width: s.width,
                        height: s.height,
                    })?;
                Ok(gaussian_blur_f32(&gray, SMOOTHING_SIGMA).into_raw())
            })
            .collect()
    }

    /// One descriptor per keypoint, in keypoint order.
    ///
    /// Each keypoint is described on the smoothed copy of the level it was
    /// detected at (`Keypoint::octave`).
    pub fn generate_descriptors(&self, pyramid: &[PyramidLevel], kps: &[Keypoint]) -> BriefResult<Vec<Descriptor>> {
        if let Some(kp) = kps.iter().find(|kp| kp.octave >= pyramid.len()) {
            return Err(BriefError::MissingLevel {
                level: kp.octave,
                available: pyramid.len(),
            });
        }

        let smoothed = self.smooth_pyramid(pyramid)?;

        let descriptors = kps
            .par_iter()
            .map(|kp| {
                let s = &pyramid[kp.octave].scale;
                let (cx, cy) = (kp.x / s.scale, kp.y / s.scale);
                self.describe(&smoothed[kp.octave], s.width, s.height, cx, cy, kp.angle)
            })
            .collect();

        Ok(descriptors)
    }

    /// Evaluate the rotated pattern around `(cx, cy)` on a single image
    pub fn describe(&self, img: &Image, w: usize, h: usize, cx: f32, cy: f32, angle: f32) -> Descriptor {
        let (s, c) = angle.sin_cos();
        let sample = |dx: i32, dy: i32| {
            let rx = cx + c * dx as f32 - s * dy as f32;
            let ry = cy + s * dx as f32 + c * dy as f32;
            let x = rx.round().clamp(0.0, (w - 1) as f32) as usize;
            let y = ry.round().clamp(0.0, (h - 1) as f32) as usize;
            img[y * w + x]
        };

        let mut d = [0u8; DESCRIPTOR_SIZE];
        for (i, &[x1, y1, x2, y2]) in self.pattern.iter().enumerate() {
            let bit = (sample(x1, y1) < sample(x2, y2)) as u8;
            d[i / 8] |= bit << (i % 8);
        }
        d
    }
}

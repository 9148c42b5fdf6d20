#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Row-major 8-bit grayscale image
pub type Image = Vec<u8>;

/// Key-point ≙ FAST corner + orientation (radians), in level-0 coordinates
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Keypoint {
    pub x: f32,
    pub y: f32,
    pub angle: f32,
    /// Diameter of the described patch, in level-0 pixels
    pub size: f32,
    pub response: f32,
    /// Pyramid level the keypoint was detected at
    pub octave: usize,
}

/// 256-bit binary descriptor = 32 bytes
pub type Descriptor = [u8; 32];

pub const DESCRIPTOR_BITS: u32 = 256;

/// Number of differing bits between two descriptors.
#[inline]
pub fn hamming_distance(a: &Descriptor, b: &Descriptor) -> u32 {
    a.iter().zip(b.iter()).map(|(&x, &y)| (x ^ y).count_ones()).sum()
}

/// Scale information for pyramid levels
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScaleLevel {
    pub level: usize,
    pub scale: f32,
    pub width: usize,
    pub height: usize,
}

/// One downscaled copy of the input image
#[derive(Debug, Clone)]
pub struct PyramidLevel {
    pub scale: ScaleLevel,
    pub image: Image,
}

#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, deny_unknown_fields))]
pub struct OrbConfig {
    /// FAST intensity threshold
    pub threshold: u8,
    /// Orientation and descriptor patch diameter (odd)
    pub patch_size: usize,
    /// Border in pixels where no keypoint is detected
    pub edge_threshold: usize,
    /// Upper bound on keypoints per image, across all levels
    pub max_features: usize,
    pub n_levels: usize,
    pub scale_factor: f32,
    pub nms_distance: f32,
    pub n_threads: usize,
}

impl Default for OrbConfig {
    fn default() -> Self {
        Self {
            threshold: 20,
            patch_size: 31,
            edge_threshold: 31,
            max_features: 500,
            n_levels: 8,
            scale_factor: 1.2,
            nms_distance: 3.0,
            n_threads: num_cpus::get().max(1),
        }
    }
}

/// Initialize Rayon thread pool with the specified number of threads
pub fn init_thread_pool(n_threads: usize) -> Result<(), rayon::ThreadPoolBuildError> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(n_threads)
        .build_global()
}

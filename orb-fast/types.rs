use orb_core::{Keypoint, PyramidLevel};

/// Corner found on a single pyramid level, in that level's pixel grid
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScoredKeypoint {
    pub x: usize,
    pub y: usize,
    pub response: f32,
}

/// Keypoints found on one image together with the pyramid they were found on.
///
/// Descriptors are computed against the same pyramid, so the two travel together.
#[derive(Debug, Clone)]
pub struct Detection {
    pub keypoints: Vec<Keypoint>,
    pub pyramid: Vec<PyramidLevel>,
}

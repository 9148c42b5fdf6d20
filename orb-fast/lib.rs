//! Multi-scale FAST keypoint detection.
//!
//! Each pyramid level is searched with the FAST-9 segment test, corners are
//! ranked by Harris response, thinned with non-maximum suppression and capped
//! to a per-level budget, then oriented by intensity centroid.

pub mod error;
pub mod types;
pub mod utils;
pub mod pyramid;
pub mod corner_detection;
pub mod refinement;
pub mod detector;

pub use error::{FastError, FastResult};
pub use types::{Detection, ScoredKeypoint};
pub use pyramid::ImagePyramid;
pub use corner_detection::CornerDetector;
pub use refinement::KeypointRefinement;
pub use detector::FastDetector;

//! ORB-based image classification.
//!
//! A query image is normalised, described with ORB features, matched against
//! every image of a labeled corpus and assigned the label of the best-scoring
//! corpus image.

pub mod classifier;
pub mod config;
pub mod corpus;
pub mod error;
pub mod preprocess;
pub mod visualize;

use log::debug;
use orb_brief::BriefGenerator;
use orb_core::{Descriptor, Image, Keypoint, OrbConfig};
use orb_fast::FastDetector;

pub use classifier::{Classification, Classifier, EntryScore, Outcome, Prediction, Query, SkipReason, SkippedEntry};
pub use config::ClassifierConfig;
pub use corpus::{Corpus, CorpusEntry, CorpusLoader, Manifest};
pub use error::{OrbError, OrbResult};
pub use orb_core::{self, Descriptor as OrbDescriptor, Image as OrbImage, Keypoint as OrbKeypoint, OrbConfig as Config};
pub use preprocess::{PreparedImage, Preprocessor};

/// Keypoints of one image with their descriptors, index-aligned
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Features {
    pub keypoints: Vec<Keypoint>,
    pub descriptors: Vec<Descriptor>,
}

impl Features {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// High-level ORB feature extractor that combines FAST corner detection with BRIEF descriptors
#[derive(Debug, Clone)]
pub struct OrbMax {
    fast_detector: FastDetector,
    brief_generator: BriefGenerator,
}

impl OrbMax {
    /// Create a new ORB extractor for grayscale images of the given dimensions.
    ///
    /// The Rayon pool is not touched here; the binary sizes it once at startup.
    pub fn new(cfg: OrbConfig, width: usize, height: usize) -> OrbResult<Self> {
        let brief_generator = BriefGenerator::new(cfg.patch_size)?;
        let fast_detector = FastDetector::new(cfg, width, height)?;

        Ok(Self {
            fast_detector,
            brief_generator,
        })
    }

    /// Detect keypoints and compute one descriptor per keypoint.
    ///
    /// An empty result is valid for flat or low-contrast images.
    pub fn detect_and_describe(&self, img: &Image) -> OrbResult<Features> {
        let detection = self.fast_detector.detect(img)?;
        let descriptors = self
            .brief_generator
            .generate_descriptors(&detection.pyramid, &detection.keypoints)?;
        debug!("extracted {} descriptors", descriptors.len());

        Ok(Features {
            keypoints: detection.keypoints,
            descriptors,
        })
    }

    /// Get detector configuration
    pub fn config(&self) -> &OrbConfig {
        self.fast_detector.config()
    }

    /// Get image dimensions
    pub fn dimensions(&self) -> (usize, usize) {
        self.fast_detector.dimensions()
    }
}

use std::fs;
use std::path::Path;

use orb_core::OrbConfig;
use orb_match::{BruteForceMatcher, Scorer};
use serde::{Deserialize, Serialize};

use crate::error::{OrbError, OrbResult};

/// Default label allow-list
pub const DEFAULT_LABELS: [&str; 6] = ["cat", "dog", "horse", "giraffe", "sheep", "cow"];

/// Every tunable of a classification run
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ClassifierConfig {
    /// Canonical width every image is resized to
    pub width: u32,
    /// Canonical height every image is resized to
    pub height: u32,
    /// Neighbours kept per query descriptor
    pub k: usize,
    /// Size of the globally best match window
    pub top_n: usize,
    /// A match is accepted when its distance is strictly below this
    pub max_distance: u32,
    /// Recognised labels, compared lower-cased
    pub labels: Vec<String>,
    pub detector: OrbConfig,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            width: 400,
            height: 300,
            k: 5,
            top_n: 25,
            max_distance: 50,
            labels: DEFAULT_LABELS.iter().map(|l| l.to_string()).collect(),
            detector: OrbConfig::default(),
        }
    }
}

impl ClassifierConfig {
    pub fn validate(&self) -> OrbResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(OrbError::InvalidConfig(format!(
                "canonical size must be non-zero, got {}x{}",
                self.width, self.height
            )));
        }
        if self.labels.iter().all(|l| l.trim().is_empty()) {
            return Err(OrbError::InvalidConfig("label allow-list is empty".to_string()));
        }
        if self.detector.n_threads == 0 {
            return Err(OrbError::InvalidConfig("n_threads must be at least 1".to_string()));
        }
        BruteForceMatcher::new(self.k)?;
        Scorer::new(self.top_n, self.max_distance)?;
        Ok(())
    }

    /// Lower-cased, trimmed labels without blanks
    pub fn normalized_labels(&self) -> Vec<String> {
        self.labels
            .iter()
            .map(|l| l.trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect()
    }

    pub fn load_toml(path: &Path) -> OrbResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| OrbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| OrbError::ConfigParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> OrbResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn to_toml(&self) -> OrbResult<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    pub fn save_toml(&self, path: &Path) -> OrbResult<()> {
        let text = self.to_toml()?;
        fs::write(path, text).map_err(|source| OrbError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn to_json(&self) -> OrbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(text: &str) -> OrbResult<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// One-line description for startup logging
    pub fn summary(&self) -> String {
        format!(
            "{}x{}, k={}, top_n={}, max_distance={}, labels=[{}], max_features={}, threads={}",
            self.width,
            self.height,
            self.k,
            self.top_n,
            self.max_distance,
            self.normalized_labels().join(","),
            self.detector.max_features,
            self.detector.n_threads
        )
    }
}

use std::collections::{BTreeMap, BTreeSet};
use std::fs;
use std::path::{Path, PathBuf};

use image::RgbImage;
use log::{debug, info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{OrbError, OrbResult};
use crate::preprocess::Preprocessor;
use crate::{Features, OrbMax};

/// Explicit file name to label mapping for a corpus directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Manifest {
    #[serde(default)]
    pub entries: BTreeMap<String, String>,
}

impl Manifest {
    pub fn load(path: &Path) -> OrbResult<Self> {
        let text = fs::read_to_string(path).map_err(|source| OrbError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&text).map_err(|source| OrbError::ManifestParse {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn from_toml(text: &str) -> OrbResult<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn label(&self, file_name: &str) -> Option<&str> {
        self.entries.get(file_name).map(String::as_str)
    }
}

/// A labeled reference image, loaded and described once per run
#[derive(Debug, Clone)]
pub struct CorpusEntry {
    pub file_name: String,
    pub label: String,
    pub path: PathBuf,
    /// Canonical-size colour copy, kept for match visualisation
    pub image: RgbImage,
    /// May be empty; such entries are never scored
    pub features: Features,
}

/// Corpus entries in enumeration order
#[derive(Debug, Clone, Default)]
pub struct Corpus {
    entries: Vec<CorpusEntry>,
}

impl Corpus {
    pub fn new(entries: Vec<CorpusEntry>) -> Self {
        Self { entries }
    }

    pub fn entries(&self) -> &[CorpusEntry] {
        &self.entries
    }

    pub fn get(&self, index: usize) -> Option<&CorpusEntry> {
        self.entries.get(index)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// A corpus file selected for loading
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CorpusFile {
    pub file_name: String,
    pub label: String,
    pub path: PathBuf,
}

/// Selects labeled files from a directory and turns them into corpus entries.
///
/// Labels come from the manifest when one is set, otherwise from the
/// lower-cased file name prefix before the first `_`. Hidden files and
/// labels outside the allow-list are skipped.
#[derive(Debug, Clone)]
pub struct CorpusLoader {
    labels: BTreeSet<String>,
    manifest: Option<Manifest>,
}

impl CorpusLoader {
    pub fn new<I, S>(labels: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let labels = labels
            .into_iter()
            .map(|l| l.as_ref().trim().to_lowercase())
            .filter(|l| !l.is_empty())
            .collect();
        Self { labels, manifest: None }
    }

    pub fn with_manifest(mut self, manifest: Manifest) -> Self {
        self.manifest = Some(manifest);
        self
    }

    pub fn labels(&self) -> &BTreeSet<String> {
        &self.labels
    }

    /// Allow-listed label of a file, or `None` when the file is skipped
    pub fn label_for(&self, file_name: &str) -> Option<String> {
        if file_name.starts_with('.') {
            debug!("skipping hidden file {}", file_name);
            return None;
        }

        let label = match &self.manifest {
            Some(manifest) => match manifest.label(file_name) {
                Some(label) => label.trim().to_lowercase(),
                None => {
                    debug!("skipping {}: not listed in manifest", file_name);
                    return None;
                }
            },
            None => file_name.split('_').next().unwrap_or(file_name).to_lowercase(),
        };

        if !self.labels.contains(&label) {
            debug!("skipping {}: label '{}' not recognised", file_name, label);
            return None;
        }
        Some(label)
    }

    /// Files to load from `dir`, sorted by file name
    pub fn enumerate(&self, dir: &Path) -> OrbResult<Vec<CorpusFile>> {
        let io_error = |source| OrbError::Io {
            path: dir.to_path_buf(),
            source,
        };
        let listing = fs::read_dir(dir).map_err(io_error)?;

        let mut names: Vec<String> = match &self.manifest {
            Some(manifest) => manifest.entries.keys().cloned().collect(),
            None => {
                let mut names = Vec::new();
                for entry in listing {
                    let path = entry.map_err(io_error)?.path();
                    if !path.is_file() {
                        continue;
                    }
                    match path.file_name().and_then(|n| n.to_str()) {
                        Some(name) => names.push(name.to_string()),
                        None => debug!("skipping non UTF-8 file name {}", path.display()),
                    }
                }
                names
            }
        };
        names.sort();

        Ok(names
            .into_iter()
            .filter_map(|file_name| {
                let label = self.label_for(&file_name)?;
                let path = dir.join(&file_name);
                Some(CorpusFile { file_name, label, path })
            })
            .collect())
    }

    /// Decode, normalise and describe every selected file.
    ///
    /// A file that fails to decode is logged and left out. Entries without
    /// descriptors are kept.
    pub fn load(&self, dir: &Path, preprocessor: &Preprocessor, extractor: &OrbMax) -> OrbResult<Corpus> {
        let files = self.enumerate(dir)?;
        info!("loading {} corpus images from {}", files.len(), dir.display());

        let loaded: Vec<Option<CorpusEntry>> = files
            .into_par_iter()
            .map(|file| Self::load_entry(file, preprocessor, extractor))
            .collect::<OrbResult<_>>()?;

        Ok(Corpus::new(loaded.into_iter().flatten().collect()))
    }

    fn load_entry(file: CorpusFile, preprocessor: &Preprocessor, extractor: &OrbMax) -> OrbResult<Option<CorpusEntry>> {
        let prepared = match preprocessor.load(&file.path) {
            Ok(prepared) => prepared,
            Err(err) => {
                warn!("skipping corpus file {}: {}", file.file_name, err);
                return Ok(None);
            }
        };

        let features = extractor.detect_and_describe(prepared.gray.as_raw())?;
        debug!("{} ({}): {} descriptors", file.file_name, file.label, features.len());

        Ok(Some(CorpusEntry {
            file_name: file.file_name,
            label: file.label,
            path: file.path,
            image: prepared.color,
            features,
        }))
    }
}

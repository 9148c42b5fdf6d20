use std::path::PathBuf;

use orb_brief::BriefError;
use orb_fast::FastError;
use orb_match::MatchError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrbError {
    #[error("FAST error: {0}")]
    Fast(#[from] FastError),
    #[error("BRIEF error: {0}")]
    Brief(#[from] BriefError),
    #[error("Match error: {0}")]
    Match(#[from] MatchError),
    #[error("failed to decode image {path}: {source}")]
    Decode { path: PathBuf, source: image::ImageError },
    #[error("failed to write image {path}: {source}")]
    Encode { path: PathBuf, source: image::ImageError },
    #[error("failed to read {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },
    #[error("failed to parse config file {path}: {source}")]
    ConfigParse { path: PathBuf, source: toml::de::Error },
    #[error("failed to parse manifest {path}: {source}")]
    ManifestParse { path: PathBuf, source: toml::de::Error },
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),
    #[error("TOML serialization error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

pub type OrbResult<T> = Result<T, OrbError>;

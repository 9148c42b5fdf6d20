//! Descriptor matching and candidate ranking.
//!
//! [`BruteForceMatcher`] finds the k nearest candidate descriptors of every
//! query descriptor under Hamming distance, [`Scorer`] reduces those neighbour
//! lists to a bounded quality score, and [`Selection`] folds scored entries
//! into a single winner.
//!
//! Matching is exhaustive, O(|Q| x |C|) per image pair. That is fine for a
//! corpus of a few hundred images; larger corpora need an indexed
//! approximate search instead.

pub mod error;
pub mod matcher;
pub mod scorer;
pub mod selector;

pub use error::{MatchError, MatchResult};
pub use matcher::{BruteForceMatcher, MatchCandidate};
pub use scorer::{Score, Scorer};
pub use selector::{ScoreRecord, Selection};

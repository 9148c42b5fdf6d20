use std::path::Path;
use std::time::Instant;

use log::{debug, info, warn};
use orb_match::{BruteForceMatcher, MatchCandidate, ScoreRecord, Scorer, Selection};
use rayon::prelude::*;
use serde::Serialize;

use crate::config::ClassifierConfig;
use crate::corpus::{Corpus, CorpusLoader, Manifest};
use crate::error::OrbResult;
use crate::preprocess::{PreparedImage, Preprocessor};
use crate::{Features, OrbMax};

/// Score of one corpus entry against the query
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryScore {
    pub file_name: String,
    pub label: String,
    pub score: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// The corpus image produced no descriptors
    EmptyDescriptors,
    /// The query image produced no descriptors
    EmptyQuery,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SkippedEntry {
    pub file_name: String,
    pub reason: SkipReason,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Prediction {
    pub label: String,
    pub file_name: String,
    pub score: usize,
    /// Index of the winning entry in the corpus
    pub entry_index: usize,
    /// The winner's top-N matches, ascending distance
    pub matches: Vec<MatchCandidate>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Outcome {
    Match(Prediction),
    NoMatch,
}

/// Result of one classification run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Scored entries in corpus order
    pub scores: Vec<EntryScore>,
    pub skipped: Vec<SkippedEntry>,
    pub outcome: Outcome,
}

impl Classification {
    pub fn prediction(&self) -> Option<&Prediction> {
        match &self.outcome {
            Outcome::Match(prediction) => Some(prediction),
            Outcome::NoMatch => None,
        }
    }

    /// Human-readable report, one line per scored entry followed by the verdict
    pub fn report_lines(&self) -> Vec<String> {
        let mut lines: Vec<String> = self
            .scores
            .iter()
            .map(|s| format!("{} => score: {}", s.file_name, s.score))
            .collect();

        match &self.outcome {
            Outcome::Match(p) => {
                lines.push(format!("Prediction: {}", p.label));
                lines.push(format!("Best image: {}", p.file_name));
                lines.push(format!("Score: {}", p.score));
            }
            Outcome::NoMatch => lines.push("No match found.".to_string()),
        }
        lines
    }

    pub fn to_json(&self) -> OrbResult<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A decoded, normalised and described query image
#[derive(Debug, Clone)]
pub struct Query {
    pub image: PreparedImage,
    pub features: Features,
}

/// The full pipeline: preprocessing, extraction, matching, scoring and selection
#[derive(Debug, Clone)]
pub struct Classifier {
    config: ClassifierConfig,
    preprocessor: Preprocessor,
    extractor: OrbMax,
    matcher: BruteForceMatcher,
    scorer: Scorer,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> OrbResult<Self> {
        config.validate()?;

        let preprocessor = Preprocessor::new(config.width, config.height);
        let extractor = OrbMax::new(config.detector.clone(), config.width as usize, config.height as usize)?;
        let matcher = BruteForceMatcher::new(config.k)?;
        let scorer = Scorer::new(config.top_n, config.max_distance)?;

        Ok(Self {
            config,
            preprocessor,
            extractor,
            matcher,
            scorer,
        })
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn preprocessor(&self) -> &Preprocessor {
        &self.preprocessor
    }

    pub fn extractor(&self) -> &OrbMax {
        &self.extractor
    }

    pub fn corpus_loader(&self, manifest: Option<Manifest>) -> CorpusLoader {
        let loader = CorpusLoader::new(&self.config.labels);
        match manifest {
            Some(manifest) => loader.with_manifest(manifest),
            None => loader,
        }
    }

    pub fn load_corpus(&self, dir: &Path, manifest: Option<Manifest>) -> OrbResult<Corpus> {
        let t0 = Instant::now();
        let corpus = self
            .corpus_loader(manifest)
            .load(dir, &self.preprocessor, &self.extractor)?;
        info!("corpus ready: {} entries in {:.2?}", corpus.len(), t0.elapsed());
        Ok(corpus)
    }

    /// Decode and describe the query image. A decode failure here is fatal.
    pub fn prepare_query(&self, path: &Path) -> OrbResult<Query> {
        let image = self.preprocessor.load(path)?;
        let features = self.extractor.detect_and_describe(image.gray.as_raw())?;
        info!("query {}: {} descriptors", path.display(), features.len());
        Ok(Query { image, features })
    }

    pub fn classify(&self, query_path: &Path, corpus: &Corpus) -> OrbResult<Classification> {
        let query = self.prepare_query(query_path)?;
        self.classify_features(&query.features, corpus)
    }

    /// Score every corpus entry against the query features and pick the best.
    ///
    /// Entries without descriptors are skipped and never reach the matcher.
    /// Equal scores go to the entry that comes first in the corpus.
    pub fn classify_features(&self, query: &Features, corpus: &Corpus) -> OrbResult<Classification> {
        if query.is_empty() {
            warn!("query produced no descriptors; nothing can be scored");
            let skipped = corpus
                .entries()
                .iter()
                .map(|e| SkippedEntry {
                    file_name: e.file_name.clone(),
                    reason: SkipReason::EmptyQuery,
                })
                .collect();
            return Ok(Classification {
                scores: Vec::new(),
                skipped,
                outcome: Outcome::NoMatch,
            });
        }

        let t0 = Instant::now();
        let records: Vec<Option<ScoreRecord<usize>>> = corpus
            .entries()
            .par_iter()
            .enumerate()
            .map(|(index, entry)| -> OrbResult<Option<ScoreRecord<usize>>> {
                if entry.features.is_empty() {
                    return Ok(None);
                }
                let knn = self
                    .matcher
                    .knn_match(&query.descriptors, &entry.features.descriptors)?;
                Ok(Some(ScoreRecord::new(index, self.scorer.score(&knn))))
            })
            .collect::<OrbResult<_>>()?;

        let mut scores = Vec::new();
        let mut skipped = Vec::new();
        for (entry, record) in corpus.entries().iter().zip(&records) {
            match record {
                Some(record) => {
                    debug!("{} ({}) => score: {}", entry.file_name, entry.label, record.score);
                    scores.push(EntryScore {
                        file_name: entry.file_name.clone(),
                        label: entry.label.clone(),
                        score: record.score,
                    });
                }
                None => {
                    debug!("{}: no descriptors, skipped", entry.file_name);
                    skipped.push(SkippedEntry {
                        file_name: entry.file_name.clone(),
                        reason: SkipReason::EmptyDescriptors,
                    });
                }
            }
        }

        let selection = Selection::par_from_records(records.into_iter().flatten().collect());
        info!("scored {} entries in {:.2?}", scores.len(), t0.elapsed());

        let outcome = match selection.into_winner() {
            Some(best) => {
                let entry = &corpus.entries()[best.entry];
                Outcome::Match(Prediction {
                    label: entry.label.clone(),
                    file_name: entry.file_name.clone(),
                    score: best.score,
                    entry_index: best.entry,
                    matches: best.matches,
                })
            }
            None => Outcome::NoMatch,
        };

        Ok(Classification { scores, skipped, outcome })
    }
}

use rayon::prelude::*;

use crate::matcher::MatchCandidate;
use crate::scorer::Score;

/// A scored corpus entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoreRecord<E> {
    pub entry: E,
    pub score: usize,
    pub matches: Vec<MatchCandidate>,
}

impl<E> ScoreRecord<E> {
    pub fn new(entry: E, score: Score) -> Self {
        Self {
            entry,
            score: score.score,
            matches: score.matches,
        }
    }
}

/// Best-so-far state over a stream of score records.
///
/// A record replaces the held winner only with a strictly greater score, so
/// among equal scores the earliest record in stream order wins.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<E> {
    NoCandidate,
    Winner(ScoreRecord<E>),
}

impl<E> Default for Selection<E> {
    fn default() -> Self {
        Selection::NoCandidate
    }
}

impl<E> Selection<E> {
    /// Feed the next record in stream order
    pub fn observe(self, record: ScoreRecord<E>) -> Self {
        match self {
            Selection::Winner(best) if record.score <= best.score => Selection::Winner(best),
            _ => Selection::Winner(record),
        }
    }

    /// Combine with the selection of a later part of the stream.
    ///
    /// Associative, with `NoCandidate` as identity.
    pub fn merge(self, later: Self) -> Self {
        match later {
            Selection::NoCandidate => self,
            Selection::Winner(record) => self.observe(record),
        }
    }

    pub fn from_records<I>(records: I) -> Self
    where
        I: IntoIterator<Item = ScoreRecord<E>>,
    {
        records.into_iter().fold(Selection::NoCandidate, Selection::observe)
    }

    pub fn winner(&self) -> Option<&ScoreRecord<E>> {
        match self {
            Selection::NoCandidate => None,
            Selection::Winner(record) => Some(record),
        }
    }

    pub fn into_winner(self) -> Option<ScoreRecord<E>> {
        match self {
            Selection::NoCandidate => None,
            Selection::Winner(record) => Some(record),
        }
    }
}

impl<E: Send> Selection<E> {
    /// Parallel reduction; gives the same winner as [`Selection::from_records`]
    /// because Rayon keeps operand order in `reduce`.
    pub fn par_from_records(records: Vec<ScoreRecord<E>>) -> Self {
        records
            .into_par_iter()
            .map(Selection::Winner)
            .reduce(|| Selection::NoCandidate, Selection::merge)
    }
}

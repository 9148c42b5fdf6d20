use orb_core::DESCRIPTOR_BITS;

use crate::error::{MatchError, MatchResult};
use crate::matcher::MatchCandidate;

/// Counts good matches among the globally best nearest neighbours
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Scorer {
    top_n: usize,
    max_distance: u32,
}

/// Score of one candidate image
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Score {
    /// Matches in the top-N window with distance below the threshold; always <= N
    pub score: usize,
    /// The top-N window, ascending distance
    pub matches: Vec<MatchCandidate>,
}

impl Scorer {
    pub fn new(top_n: usize, max_distance: u32) -> MatchResult<Self> {
        if top_n == 0 {
            return Err(MatchError::InvalidTopN);
        }
        if max_distance == 0 || max_distance > DESCRIPTOR_BITS {
            return Err(MatchError::InvalidMaxDistance(max_distance));
        }
        Ok(Self { top_n, max_distance })
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn max_distance(&self) -> u32 {
        self.max_distance
    }

    /// Rank-0 neighbour of each query descriptor, sorted ascending by distance
    /// (ties keep query order), cut to N, counted against the threshold.
    pub fn score(&self, knn: &[Vec<MatchCandidate>]) -> Score {
        let mut nearest: Vec<MatchCandidate> = knn.iter().filter_map(|list| list.first().copied()).collect();
        nearest.sort_by_key(|m| m.distance);
        nearest.truncate(self.top_n);

        let score = nearest.iter().filter(|m| m.distance < self.max_distance).count();

        Score { score, matches: nearest }
    }
}

use orb_core::{Descriptor, hamming_distance};
use rayon::prelude::*;

use crate::error::{MatchError, MatchResult};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// One query descriptor paired with one candidate descriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MatchCandidate {
    pub query_idx: usize,
    pub train_idx: usize,
    pub distance: u32,
}

/// Exhaustive k-nearest-neighbour matcher under Hamming distance
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BruteForceMatcher {
    k: usize,
}

impl BruteForceMatcher {
    pub fn new(k: usize) -> MatchResult<Self> {
        if k == 0 {
            return Err(MatchError::InvalidK);
        }
        Ok(Self { k })
    }

    pub fn k(&self) -> usize {
        self.k
    }

    /// For every query descriptor, its `k` nearest train descriptors in
    /// ascending distance. Equal distances keep train order.
    ///
    /// Both sets must be non-empty.
    pub fn knn_match(&self, query: &[Descriptor], train: &[Descriptor]) -> MatchResult<Vec<Vec<MatchCandidate>>> {
        if query.is_empty() {
            return Err(MatchError::EmptyQuery);
        }
        if train.is_empty() {
            return Err(MatchError::EmptyTrain);
        }

        Ok(query
            .par_iter()
            .enumerate()
            .map(|(query_idx, q)| self.nearest(query_idx, q, train))
            .collect())
    }

    /// Neighbour list of a single query descriptor
    pub fn nearest(&self, query_idx: usize, q: &Descriptor, train: &[Descriptor]) -> Vec<MatchCandidate> {
        let k = self.k;
        let mut best: Vec<MatchCandidate> = Vec::with_capacity(k + 1);

        for (train_idx, t) in train.iter().enumerate() {
            let distance = hamming_distance(q, t);
            if best.len() == k && distance >= best[k - 1].distance {
                continue;
            }
            // After every equal distance already held: earlier candidates win ties
            let pos = best.partition_point(|m| m.distance <= distance);
            best.insert(pos, MatchCandidate { query_idx, train_idx, distance });
            best.truncate(k);
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn desc_with_bits(n: usize) -> Descriptor {
        let mut d = [0u8; 32];
        for i in 0..n {
            d[i / 8] |= 1 << (i % 8);
        }
        d
    }

    #[test]
    fn test_invalid_k() {
        assert_eq!(BruteForceMatcher::new(0), Err(MatchError::InvalidK));
    }

    #[test]
    fn test_empty_sets_rejected() {
        let m = BruteForceMatcher::new(2).unwrap();
        let d = [desc_with_bits(1)];
        assert_eq!(m.knn_match(&[], &d), Err(MatchError::EmptyQuery));
        assert_eq!(m.knn_match(&d, &[]), Err(MatchError::EmptyTrain));
    }

    #[test]
    fn test_nearest_ordering() {
        let m = BruteForceMatcher::new(2).unwrap();
        let query = [desc_with_bits(0)];
        let train = [desc_with_bits(10), desc_with_bits(3), desc_with_bits(7)];
        let result = m.knn_match(&query, &train).unwrap();
        assert_eq!(
            result,
            vec![vec![
                MatchCandidate { query_idx: 0, train_idx: 1, distance: 3 },
                MatchCandidate { query_idx: 0, train_idx: 2, distance: 7 },
            ]]
        );
    }

    #[test]
    fn test_ties_keep_train_order() {
        let m = BruteForceMatcher::new(3).unwrap();
        let query = [desc_with_bits(0)];
        let train = [desc_with_bits(5), desc_with_bits(2), desc_with_bits(5), desc_with_bits(2), desc_with_bits(5)];
        let result = m.knn_match(&query, &train).unwrap();
        let idx: Vec<usize> = result[0].iter().map(|c| c.train_idx).collect();
        assert_eq!(idx, vec![1, 3, 0]);
    }

    #[test]
    fn test_fewer_train_than_k() {
        let m = BruteForceMatcher::new(5).unwrap();
        let query = [desc_with_bits(1), desc_with_bits(2)];
        let train = [desc_with_bits(4), desc_with_bits(0)];
        let result = m.knn_match(&query, &train).unwrap();
        assert_eq!(result.len(), 2);
        assert!(result.iter().all(|l| l.len() == 2));
        assert_eq!(result[1][0].query_idx, 1);
    }

    fn descriptors(max: usize) -> impl Strategy<Value = Vec<Descriptor>> {
        prop::collection::vec(prop::array::uniform32(any::<u8>()), 1..max)
    }

    proptest! {
        #[test]
        fn prop_knn_is_nearest_k(query in descriptors(12), train in descriptors(40), k in 1usize..8) {
            let m = BruteForceMatcher::new(k).unwrap();
            let result = m.knn_match(&query, &train).unwrap();
            prop_assert_eq!(result.len(), query.len());

            for (qi, list) in result.iter().enumerate() {
                prop_assert_eq!(list.len(), k.min(train.len()));
                for pair in list.windows(2) {
                    prop_assert!(pair[0].distance <= pair[1].distance);
                    if pair[0].distance == pair[1].distance {
                        prop_assert!(pair[0].train_idx < pair[1].train_idx);
                    }
                }

                let worst = list.last().map(|c| c.distance).unwrap_or(0);
                for (ti, t) in train.iter().enumerate() {
                    let d = hamming_distance(&query[qi], t);
                    match list.iter().find(|c| c.train_idx == ti) {
                        Some(c) => {
                            prop_assert_eq!(c.distance, d);
                            prop_assert_eq!(c.query_idx, qi);
                        }
                        None => prop_assert!(d >= worst),
                    }
                }
            }
        }
    }
}

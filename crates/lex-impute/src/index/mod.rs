//! Neighbor indexes over fully-observed reference rows.
//!
//! An index is built once from the reference matrix and answers ranked
//! k-nearest-neighbor queries by reference-row position. Two variants ship
//! with the crate:
//!
//! - [`FlatIndex`] - exact brute-force scan
//! - [`IvfIndex`] - inverted-file index that scans only the closest partitions
//!
//! Other search structures plug in through [`NeighborIndex`] and
//! [`IndexFactory`].
//!
//! Rankings are deterministic: equal scores are ordered by ascending
//! reference-row position.

mod flat;
mod ivf;

pub use flat::FlatIndex;
pub use ivf::IvfIndex;

use ndarray::ArrayView2;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::fmt::Debug;

use crate::config::{IndexKind, Metric};
use crate::error::{ImputeError, Result};

/// A queryable similarity structure over a fixed set of reference vectors.
pub trait NeighborIndex: Send + Sync + Debug {
    /// Dimensionality of the indexed vectors.
    fn dim(&self) -> usize;

    /// Number of indexed vectors.
    fn len(&self) -> usize;

    /// Check if the index holds no vectors.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Similarity metric used to rank results.
    fn metric(&self) -> Metric;

    /// Positions of the `k` most similar reference vectors, most similar first.
    ///
    /// Returns exactly `min(k, self.len())` positions.
    fn search(&self, probe: &[f64], k: usize) -> Result<Vec<usize>>;
}

/// Builds a [`NeighborIndex`] from reference vectors.
pub trait IndexFactory: Send + Sync + Debug {
    /// Train and populate an index over the rows of `vectors`.
    ///
    /// Row `i` of `vectors` must be reported as position `i` by the index.
    fn build(&self, vectors: ArrayView2<'_, f64>, metric: Metric)
    -> Result<Box<dyn NeighborIndex>>;
}

impl IndexFactory for IndexKind {
    fn build(
        &self,
        vectors: ArrayView2<'_, f64>,
        metric: Metric,
    ) -> Result<Box<dyn NeighborIndex>> {
        match *self {
            IndexKind::Flat => Ok(Box::new(FlatIndex::build(vectors, metric)?)),
            IndexKind::Ivf { n_lists, n_probe } => Ok(Box::new(IvfIndex::build(
                vectors, metric, n_lists, n_probe,
            )?)),
        }
    }
}

/// Ranking score where smaller is more similar under either metric.
#[inline]
pub(crate) fn score(metric: Metric, a: &[f64], b: &[f64]) -> f64 {
    match metric {
        Metric::Euclidean => squared_l2(a, b),
        Metric::InnerProduct => -dot(a, b),
    }
}

#[inline]
pub(crate) fn squared_l2(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum()
}

#[inline]
pub(crate) fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

/// Common checks shared by every built-in index at construction time.
pub(crate) fn check_vectors(vectors: ArrayView2<'_, f64>) -> Result<()> {
    if vectors.nrows() == 0 {
        return Err(ImputeError::EmptyReference);
    }
    if vectors.ncols() == 0 {
        return Err(ImputeError::Index(
            "cannot index zero-dimensional vectors".to_string(),
        ));
    }
    if vectors.iter().any(|v| !v.is_finite()) {
        return Err(ImputeError::Index(
            "reference vectors must be fully observed and finite".to_string(),
        ));
    }
    Ok(())
}

/// Common checks shared by every built-in index at query time.
pub(crate) fn check_probe(probe: &[f64], dim: usize) -> Result<()> {
    if probe.len() != dim {
        return Err(ImputeError::DimensionMismatch {
            expected: dim,
            found: probe.len(),
        });
    }
    if probe.iter().any(|v| !v.is_finite()) {
        return Err(ImputeError::Index(
            "probe vector contains missing or non-finite values".to_string(),
        ));
    }
    Ok(())
}

/// A scored candidate; ordering is by score then position.
#[derive(Debug, Clone, Copy)]
struct Candidate {
    id: usize,
    score: f64,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Candidate {}

impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score
            .total_cmp(&other.score)
            .then_with(|| self.id.cmp(&other.id))
    }
}

/// Keep the `k` best `(id, score)` pairs and return their ids, best first.
pub(crate) fn top_k(candidates: impl Iterator<Item = (usize, f64)>, k: usize) -> Vec<usize> {
    if k == 0 {
        return Vec::new();
    }

    // Max-heap: the worst retained candidate sits on top.
    let mut heap: BinaryHeap<Candidate> = BinaryHeap::with_capacity(k + 1);

    for (id, score) in candidates {
        let candidate = Candidate { id, score };
        if heap.len() < k {
            heap.push(candidate);
        } else if let Some(worst) = heap.peek()
            && candidate < *worst
        {
            heap.pop();
            heap.push(candidate);
        }
    }

    heap.into_sorted_vec().into_iter().map(|c| c.id).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    #[test]
    fn test_top_k_orders_best_first() {
        let candidates = vec![(0, 5.0), (1, 1.0), (2, 3.0), (3, 0.5)];
        assert_eq!(top_k(candidates.into_iter(), 3), vec![3, 1, 2]);
    }

    #[test]
    fn test_top_k_breaks_ties_by_position() {
        let candidates = vec![(4, 1.0), (2, 1.0), (7, 1.0), (1, 2.0)];
        assert_eq!(top_k(candidates.into_iter(), 2), vec![2, 4]);
    }

    #[test]
    fn test_top_k_fewer_candidates_than_k() {
        let candidates = vec![(0, 2.0), (1, 1.0)];
        assert_eq!(top_k(candidates.into_iter(), 5), vec![1, 0]);
        assert!(top_k(std::iter::empty(), 0).is_empty());
    }

    #[test]
    fn test_score_inner_product_prefers_larger_dot() {
        let probe = [1.0, 1.0];
        let near = score(Metric::InnerProduct, &probe, &[3.0, 3.0]);
        let far = score(Metric::InnerProduct, &probe, &[1.0, 0.0]);
        assert!(near < far);
    }

    #[test]
    fn test_index_kind_builds_each_variant() {
        let vectors = array![[0.0, 0.0], [1.0, 1.0], [5.0, 5.0]];

        let flat = IndexKind::Flat
            .build(vectors.view(), Metric::Euclidean)
            .unwrap();
        assert_eq!(flat.len(), 3);
        assert_eq!(flat.dim(), 2);

        let ivf = IndexKind::Ivf {
            n_lists: 2,
            n_probe: 1,
        }
        .build(vectors.view(), Metric::Euclidean)
        .unwrap();
        assert_eq!(ivf.len(), 3);
        assert_eq!(ivf.search(&[0.9, 0.9], 1).unwrap(), vec![1]);
    }

    #[test]
    fn test_check_vectors_rejects_empty() {
        let vectors = ndarray::Array2::<f64>::zeros((0, 2));
        assert!(matches!(
            check_vectors(vectors.view()),
            Err(ImputeError::EmptyReference)
        ));
    }
}

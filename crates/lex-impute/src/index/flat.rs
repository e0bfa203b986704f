//! Exact brute-force neighbor index.

use ndarray::ArrayView2;

use super::{NeighborIndex, check_probe, check_vectors, score, top_k};
use crate::config::Metric;
use crate::error::Result;

/// Exact index: every query scores every reference vector.
#[derive(Debug, Clone)]
pub struct FlatIndex {
    /// Row-major reference vectors
    data: Vec<f64>,
    dim: usize,
    metric: Metric,
}

impl FlatIndex {
    /// Build a flat index over the rows of `vectors`.
    pub fn build(vectors: ArrayView2<'_, f64>, metric: Metric) -> Result<Self> {
        check_vectors(vectors)?;

        Ok(Self {
            data: vectors.iter().copied().collect(),
            dim: vectors.ncols(),
            metric,
        })
    }
}

impl NeighborIndex for FlatIndex {
    fn dim(&self) -> usize {
        self.dim
    }

    fn len(&self) -> usize {
        self.data.len() / self.dim
    }

    fn metric(&self) -> Metric {
        self.metric
    }

    fn search(&self, probe: &[f64], k: usize) -> Result<Vec<usize>> {
        check_probe(probe, self.dim())?;

        let scored = self
            .data
            .chunks_exact(self.dim)
            .enumerate()
            .map(|(id, row)| (id, score(self.metric, probe, row)));

        Ok(top_k(scored, k))
    }
}

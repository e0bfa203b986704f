//! IVF-Flat neighbor index.
//!
//! Reference vectors are partitioned with k-means; a query scans the
//! `n_probe` partitions whose centroids are closest to the probe, widening to
//! further partitions until at least `k` candidates have been scored. More
//! probes trade speed for recall.
//!
//! Partitioning always uses squared Euclidean distance; candidates inside the
//! scanned partitions are ranked with the index metric.

use ndarray::ArrayView2;
use tracing::debug;

use super::{NeighborIndex, check_probe, check_vectors, score, squared_l2, top_k};
use crate::config::Metric;
use crate::error::{ImputeError, Result};

const MAX_KMEANS_ITERATIONS: usize = 25;
const CONVERGENCE_TOLERANCE: f64 = 1e-10;

/// Inverted-file index with exact scoring inside each partition.
#[derive(Debug, Clone)]
pub struct IvfIndex {
    /// Row-major reference vectors
    data: Vec<f64>,
    dim: usize,
    metric: Metric,
    centroids: Vec<Vec<f64>>,
    /// Partition id -> reference positions, ascending
    lists: Vec<Vec<usize>>,
    n_probe: usize,
}

impl IvfIndex {
    /// Train the partitioning and add every row of `vectors`.
    ///
    /// `n_lists` is capped at the number of rows; `n_probe` at the resulting
    /// number of partitions.
    pub fn build(
        vectors: ArrayView2<'_, f64>,
        metric: Metric,
        n_lists: usize,
        n_probe: usize,
    ) -> Result<Self> {
        check_vectors(vectors)?;
        if n_lists == 0 || n_probe == 0 {
            return Err(ImputeError::Index(format!(
                "IVF requires n_lists >= 1 and n_probe >= 1 (got {n_lists}, {n_probe})"
            )));
        }

        let dim = vectors.ncols();
        let data: Vec<f64> = vectors.iter().copied().collect();
        let rows: Vec<&[f64]> = data.chunks_exact(dim).collect();

        let centroids = train_centroids(&rows, n_lists.min(rows.len()));
        let mut lists = vec![Vec::new(); centroids.len()];
        for (id, row) in rows.iter().enumerate() {
            lists[nearest_centroid(&centroids, row)].push(id);
        }

        debug!(
            "IVF index trained: {} vectors, {} lists, sizes {:?}",
            rows.len(),
            centroids.len(),
            lists.iter().map(Vec::len).collect::<Vec<_>>()
        );

        let n_probe = n_probe.min(centroids.len());
        Ok(Self {
            data,
            dim,
            metric,
            centroids,
            lists,
            n_probe,
        })
    }

    /// Number of partitions.
    pub fn n_lists(&self) -> usize {
        self.lists.len()
    }

    /// Number of partitions scanned per query before widening.
    pub fn n_probe(&self) -> usize {
        self.n_probe
    }

    /// Size of every partition.
    pub fn list_sizes(&self) -> Vec<usize> {
        self.lists.iter().map(Vec::len).collect()
    }

    fn row(&self, id: usize) -> &[f64] {
        &self.data[id * self.dim..(id + 1) * self.dim]
    }
}

impl NeighborIndex for IvfIndex {
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
        check_probe(probe, self.dim)?;
        if k == 0 {
            return Ok(Vec::new());
        }

        let mut order: Vec<(usize, f64)> = self
            .centroids
            .iter()
            .enumerate()
            .map(|(idx, c)| (idx, squared_l2(probe, c)))
            .collect();
        order.sort_by(|a, b| a.1.total_cmp(&b.1).then_with(|| a.0.cmp(&b.0)));

        let mut candidates: Vec<usize> = Vec::new();
        for (scanned, (list, _)) in order.iter().enumerate() {
            if scanned >= self.n_probe && candidates.len() >= k {
                break;
            }
            candidates.extend_from_slice(&self.lists[*list]);
        }

        let scored = candidates
            .into_iter()
            .map(|id| (id, score(self.metric, probe, self.row(id))));

        Ok(top_k(scored, k))
    }
}

/// Deterministic k-means: farthest-first seeding from row 0, then Lloyd steps.
fn train_centroids(rows: &[&[f64]], k: usize) -> Vec<Vec<f64>> {
    let mut centroids: Vec<Vec<f64>> = Vec::with_capacity(k);
    centroids.push(rows[0].to_vec());

    while centroids.len() < k {
        let mut best_idx = 0;
        let mut best_dist = 0.0;
        for (idx, row) in rows.iter().enumerate() {
            let dist = centroids
                .iter()
                .map(|c| squared_l2(row, c))
                .fold(f64::INFINITY, f64::min);
            if dist > best_dist {
                best_dist = dist;
                best_idx = idx;
            }
        }
        centroids.push(rows[best_idx].to_vec());
    }

    let dim = rows[0].len();
    for _ in 0..MAX_KMEANS_ITERATIONS {
        let mut sums = vec![vec![0.0; dim]; centroids.len()];
        let mut counts = vec![0usize; centroids.len()];

        for row in rows {
            let cluster = nearest_centroid(&centroids, row);
            counts[cluster] += 1;
            for (sum, value) in sums[cluster].iter_mut().zip(row.iter()) {
                *sum += value;
            }
        }

        let mut shift = 0.0;
        for ((centroid, sum), count) in centroids.iter_mut().zip(sums).zip(counts) {
            // Empty partitions keep their previous centroid
            if count == 0 {
                continue;
            }
            let updated: Vec<f64> = sum.into_iter().map(|s| s / count as f64).collect();
            shift += squared_l2(centroid, &updated);
            *centroid = updated;
        }

        if shift <= CONVERGENCE_TOLERANCE {
            break;
        }
    }

    centroids
}

/// Closest centroid by squared Euclidean distance; lowest index wins ties.
fn nearest_centroid(centroids: &[Vec<f64>], row: &[f64]) -> usize {
    let mut best = 0;
    let mut best_dist = f64::INFINITY;
    for (idx, centroid) in centroids.iter().enumerate() {
        let dist = squared_l2(row, centroid);
        if dist < best_dist {
            best_dist = dist;
            best = idx;
        }
    }
    best
}

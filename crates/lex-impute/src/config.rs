//! Configuration types for the nearest-neighbor imputer.
//!
//! This module provides configuration options using the builder pattern
//! for flexible and ergonomic imputer setup.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::str::FromStr;

use crate::stats::{nan_mean, nan_median};

/// Similarity measure used by the neighbor index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Metric {
    /// Squared Euclidean distance; smaller is more similar
    #[default]
    #[serde(alias = "l2", alias = "euclidean")]
    Euclidean,
    /// Inner product; larger is more similar
    #[serde(alias = "ip", alias = "inner_product", alias = "inner-product")]
    InnerProduct,
}

impl FromStr for Metric {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "l2" | "euclidean" => Ok(Metric::Euclidean),
            "ip" | "inner_product" | "inner-product" => Ok(Metric::InnerProduct),
            _ => Err(ConfigValidationError::UnknownMetric(s.to_string())),
        }
    }
}

/// Statistic used both for placeholders and for neighbor aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum Strategy {
    /// Arithmetic mean of non-missing values
    #[default]
    #[serde(alias = "mean")]
    Mean,
    /// Median of non-missing values
    #[serde(alias = "median")]
    Median,
}

/// Aggregation function resolved from a [`Strategy`].
///
/// Returns `None` when the input holds no observed value.
pub type Aggregator = fn(&[f64]) -> Option<f64>;

impl Strategy {
    /// Resolve the strategy into its concrete aggregation function.
    pub fn aggregator(self) -> Aggregator {
        match self {
            Strategy::Mean => nan_mean,
            Strategy::Median => nan_median,
        }
    }
}

impl FromStr for Strategy {
    type Err = ConfigValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" => Ok(Strategy::Mean),
            "median" => Ok(Strategy::Median),
            _ => Err(ConfigValidationError::UnknownStrategy(s.to_string())),
        }
    }
}

/// Neighbor index variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum IndexKind {
    /// Exact brute-force search
    #[default]
    Flat,
    /// Inverted-file index: k-means partitions, only `n_probe` closest lists are scanned
    Ivf { n_lists: usize, n_probe: usize },
}

impl FromStr for IndexKind {
    type Err = ConfigValidationError;

    /// Parse a factory-style description: `"Flat"` or `"IVF<n_lists>,Flat"`.
    ///
    /// IVF parsed this way probes a single list; use [`IndexKind::Ivf`]
    /// directly to set `n_probe`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unknown = || ConfigValidationError::UnknownIndexKind(s.to_string());
        let normalized = s.trim().to_ascii_lowercase();

        if normalized == "flat" {
            return Ok(IndexKind::Flat);
        }

        let lists = normalized
            .strip_prefix("ivf")
            .and_then(|rest| rest.strip_suffix(",flat"))
            .ok_or_else(unknown)?;
        let n_lists = lists.parse::<usize>().map_err(|_| unknown())?;

        Ok(IndexKind::Ivf {
            n_lists,
            n_probe: 1,
        })
    }
}

/// What to do when `n_neighbors` exceeds the number of reference rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum NeighborOverflow {
    /// Query every reference row instead
    #[default]
    #[serde(alias = "clamp")]
    Clamp,
    /// Fail `fit` with a neighbor-count error
    #[serde(alias = "error")]
    Error,
}

/// Configuration for the nearest-neighbor imputer.
///
/// Use [`ImputerConfig::builder()`] to create a new configuration
/// with fluent API.
///
/// # Example
///
/// ```rust,ignore
/// use lex_impute::config::{ImputerConfig, Metric, Strategy};
///
/// let config = ImputerConfig::builder()
///     .n_neighbors(5)
///     .metric(Metric::Euclidean)
///     .strategy(Strategy::Median)
///     .build()?;
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImputerConfig {
    /// Number of reference rows consulted per incomplete row.
    /// Default: 3
    pub n_neighbors: usize,

    /// Similarity measure.
    /// Default: Euclidean
    pub metric: Metric,

    /// Statistic for placeholders and neighbor aggregation.
    /// Default: Mean
    pub strategy: Strategy,

    /// Neighbor index variant.
    /// Default: Flat
    pub index_kind: IndexKind,

    /// Policy when fewer reference rows exist than `n_neighbors`.
    /// Default: Clamp
    pub neighbor_overflow: NeighborOverflow,

    /// Whether incomplete rows are repaired on the rayon thread pool.
    /// Default: true
    pub parallel: bool,
}

impl Default for ImputerConfig {
    fn default() -> Self {
        Self {
            n_neighbors: 3,
            metric: Metric::default(),
            strategy: Strategy::default(),
            index_kind: IndexKind::default(),
            neighbor_overflow: NeighborOverflow::default(),
            parallel: true,
        }
    }
}

impl ImputerConfig {
    /// Create a new configuration builder.
    pub fn builder() -> ImputerConfigBuilder {
        ImputerConfigBuilder::default()
    }

    /// Load a configuration from a JSON file. Missing fields take defaults.
    pub fn from_json_file(path: impl AsRef<Path>) -> crate::error::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: ImputerConfig = serde_json::from_str(&content)?;
        Ok(config)
    }

    /// Validate the configuration and return errors if invalid.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        if self.n_neighbors == 0 {
            return Err(ConfigValidationError::InvalidNeighbors(self.n_neighbors));
        }

        if let IndexKind::Ivf { n_lists, n_probe } = self.index_kind {
            if n_lists == 0 {
                return Err(ConfigValidationError::InvalidIndexParameter {
                    field: "n_lists".to_string(),
                    value: n_lists,
                    reason: "must be at least 1".to_string(),
                });
            }
            if n_probe == 0 || n_probe > n_lists {
                return Err(ConfigValidationError::InvalidIndexParameter {
                    field: "n_probe".to_string(),
                    value: n_probe,
                    reason: format!("must be between 1 and n_lists ({n_lists})"),
                });
            }
        }

        Ok(())
    }
}

/// Errors that can occur during configuration validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigValidationError {
    #[error("Invalid number of neighbors: {0} (must be at least 1)")]
    InvalidNeighbors(usize),

    #[error("Unknown metric '{0}' (expected 'l2' or 'ip')")]
    UnknownMetric(String),

    #[error("Unknown strategy '{0}' (expected 'mean' or 'median')")]
    UnknownStrategy(String),

    #[error("Unknown index kind '{0}' (expected 'Flat' or 'IVF<n>,Flat')")]
    UnknownIndexKind(String),

    #[error("Invalid index parameter '{field}': {value} ({reason})")]
    InvalidIndexParameter {
        field: String,
        value: usize,
        reason: String,
    },
}

/// Builder for [`ImputerConfig`] with fluent API.
#[derive(Debug, Default)]
pub struct ImputerConfigBuilder {
    n_neighbors: Option<usize>,
    metric: Option<Metric>,
    strategy: Option<Strategy>,
    index_kind: Option<IndexKind>,
    neighbor_overflow: Option<NeighborOverflow>,
    parallel: Option<bool>,
}

impl ImputerConfigBuilder {
    /// Set the number of neighbors consulted per incomplete row.
    pub fn n_neighbors(mut self, k: usize) -> Self {
        self.n_neighbors = Some(k);
        self
    }

    /// Set the similarity metric.
    pub fn metric(mut self, metric: Metric) -> Self {
        self.metric = Some(metric);
        self
    }

    /// Set the placeholder/aggregation strategy.
    pub fn strategy(mut self, strategy: Strategy) -> Self {
        self.strategy = Some(strategy);
        self
    }

    /// Set the neighbor index variant.
    pub fn index_kind(mut self, kind: IndexKind) -> Self {
        self.index_kind = Some(kind);
        self
    }

    /// Set the policy applied when `n_neighbors` exceeds the reference size.
    pub fn neighbor_overflow(mut self, policy: NeighborOverflow) -> Self {
        self.neighbor_overflow = Some(policy);
        self
    }

    /// Enable or disable parallel row repair.
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = Some(parallel);
        self
    }

    /// Build the configuration.
    ///
    /// Returns a validated `ImputerConfig` or an error if validation fails.
    pub fn build(self) -> Result<ImputerConfig, ConfigValidationError> {
        let defaults = ImputerConfig::default();
        let config = ImputerConfig {
            n_neighbors: self.n_neighbors.unwrap_or(defaults.n_neighbors),
            metric: self.metric.unwrap_or_default(),
            strategy: self.strategy.unwrap_or_default(),
            index_kind: self.index_kind.unwrap_or_default(),
            neighbor_overflow: self.neighbor_overflow.unwrap_or_default(),
            parallel: self.parallel.unwrap_or(defaults.parallel),
        };

        config.validate()?;
        Ok(config)
    }
}

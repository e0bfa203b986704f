//! Nearest-Neighbor Imputation Library
//!
//! Fills missing numeric values from the most similar fully-observed rows,
//! built on `ndarray` with a Polars adapter for tabular data.
//!
//! # Overview
//!
//! - **Neighbor indexes**: exact flat scan or IVF-Flat partitions, pluggable
//!   through [`NeighborIndex`] and [`IndexFactory`]
//! - **Seed-then-correct repair**: missing cells are seeded with a column
//!   statistic, the seeded row queries the index, and the neighbors' values
//!   are aggregated per missing column
//! - **Immutable models**: [`FittedImputer`] is `Send + Sync`; rows are
//!   repaired in parallel with rayon
//! - **DataFrame support**: [`impute_frame`] repairs numeric Polars columns
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use lex_impute::{ImputerConfig, KnnImputer, Metric, Strategy};
//! use ndarray::array;
//!
//! let config = ImputerConfig::builder()
//!     .n_neighbors(2)
//!     .metric(Metric::Euclidean)
//!     .strategy(Strategy::Median)
//!     .build()?;
//!
//! let train = array![[1.0, 1.0], [2.0, 2.0], [3.0, 3.0], [10.0, 10.0]];
//! let mut imputer = KnnImputer::new(config);
//! imputer.fit(train.view())?;
//!
//! let repaired = imputer.transform(array![[2.0, f64::NAN]].view())?;
//! ```
//!
//! # Index Variants
//!
//! [`IndexKind`] selects a built-in index and parses from the usual factory
//! strings:
//!
//! ```rust,ignore
//! let flat: IndexKind = "Flat".parse()?;
//! let ivf: IndexKind = "IVF16,Flat".parse()?;
//! ```
//!
//! Custom search structures implement [`IndexFactory`] and are passed to
//! [`KnnImputer::fit_with_factory`].

pub mod config;
pub mod error;
pub mod frame;
pub mod imputers;
pub mod index;
pub mod matrix;
pub mod stats;

// Re-export commonly used types
pub use config::{
    Aggregator, ConfigValidationError, ImputerConfig, ImputerConfigBuilder, IndexKind, Metric,
    NeighborOverflow, Strategy,
};
pub use error::{ImputeError, Result as ImputeResult, ResultExt};
pub use frame::{frame_to_matrix, impute_frame, is_numeric_column, is_numeric_dtype, numeric_columns};
pub use imputers::{FittedImputer, KnnImputer, TransformPlan};
pub use index::{FlatIndex, IndexFactory, IvfIndex, NeighborIndex};

//! Imputation module for handling missing values.
//!
//! [`FittedImputer`] is the immutable model produced by fitting; it repairs
//! matrices without ever changing. [`KnnImputer`] wraps it in the familiar
//! `fit`/`transform`/`is_fitted` lifecycle.

mod knn;

pub use knn::{FittedImputer, KnnImputer, TransformPlan};

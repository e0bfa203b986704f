//! Error types for nearest-neighbor imputation.
//!
//! A single `thiserror` hierarchy covers configuration, input validation,
//! index construction and the DataFrame adapter.
//!
//! Errors are serializable as `{ code, message }` so they can be forwarded
//! to a frontend or logged as structured data.

use serde::Serialize;
use serde::ser::SerializeStruct;
use thiserror::Error;

use crate::config::ConfigValidationError;

/// The main error type for imputation.
#[derive(Error, Debug)]
pub enum ImputeError {
    /// Invalid configuration provided.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(#[from] ConfigValidationError),

    /// Input matrix is malformed (ragged, empty, zero-width).
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A cell holds an infinite value, which is neither a number nor the missing marker.
    #[error("Non-finite value at row {row}, column {column}")]
    NonFinite { row: usize, column: usize },

    /// Feature count differs from the data the model was fitted on.
    #[error("Expected {expected} features, found {found}")]
    DimensionMismatch { expected: usize, found: usize },

    /// Every row of the fit data has at least one missing cell.
    #[error("No fully-observed rows available to build the neighbor index")]
    EmptyReference,

    /// `transform` called before a successful `fit`.
    #[error("Imputer is not fitted; call fit before transform")]
    NotFitted,

    /// More neighbors requested than reference rows exist (strict policy only).
    #[error("Requested {requested} neighbors but only {available} reference rows are available")]
    NeighborCountExceeded { requested: usize, available: usize },

    /// Neighbor index construction or query failed.
    #[error("Index error: {0}")]
    Index(String),

    /// Column was not found in the dataset.
    #[error("Column '{0}' not found in dataset")]
    ColumnNotFound(String),

    /// Type conversion failed.
    #[error("Failed to convert column '{column}' to {target_type}: {reason}")]
    TypeConversionFailed {
        column: String,
        target_type: String,
        reason: String,
    },

    /// IO error wrapper.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Polars error wrapper.
    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error with context.
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<ImputeError>,
    },
}

impl ImputeError {
    /// Add context to an error.
    pub fn with_context(self, context: impl Into<String>) -> Self {
        ImputeError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Stable error code for programmatic handling.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidConfig(_) => "INVALID_CONFIG",
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NonFinite { .. } => "NON_FINITE_VALUE",
            Self::DimensionMismatch { .. } => "DIMENSION_MISMATCH",
            Self::EmptyReference => "EMPTY_REFERENCE",
            Self::NotFitted => "NOT_FITTED",
            Self::NeighborCountExceeded { .. } => "NEIGHBOR_COUNT_EXCEEDED",
            Self::Index(_) => "INDEX_ERROR",
            Self::ColumnNotFound(_) => "COLUMN_NOT_FOUND",
            Self::TypeConversionFailed { .. } => "TYPE_CONVERSION_FAILED",
            Self::Io(_) => "IO_ERROR",
            Self::Polars(_) => "POLARS_ERROR",
            Self::Json(_) => "JSON_ERROR",
            Self::WithContext { source, .. } => source.error_code(),
        }
    }
}

impl Serialize for ImputeError {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        let mut state = serializer.serialize_struct("ImputeError", 2)?;
        state.serialize_field("code", &self.error_code())?;
        state.serialize_field("message", &self.to_string())?;
        state.end()
    }
}

/// Result type alias for imputation operations.
pub type Result<T> = std::result::Result<T, ImputeError>;

/// Extension trait for adding context to Results.
pub trait ResultExt<T> {
    /// Add context to an error result.
    fn context(self, context: impl Into<String>) -> Result<T>;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }
}

impl<T> ResultExt<T> for std::result::Result<T, polars::error::PolarsError> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| ImputeError::Polars(e).with_context(context))
    }
}

static_assertions::assert_impl_all!(ImputeError: Send, Sync);

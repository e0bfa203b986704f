//! Polars DataFrame adapter.
//!
//! Converts numeric columns to an `Array2<f64>` (nulls and NaN become the
//! missing marker), runs a fitted imputer over them, and writes the results
//! back as `Float64` columns. Columns not selected are left untouched.

use ndarray::Array2;
use polars::prelude::*;
use tracing::debug;

use crate::error::{ImputeError, Result, ResultExt};
use crate::imputers::FittedImputer;

/// Check if a DataType is numeric (integer or float).
#[inline]
pub fn is_numeric_dtype(dtype: &DataType) -> bool {
    matches!(
        dtype,
        DataType::Int8
            | DataType::Int16
            | DataType::Int32
            | DataType::Int64
            | DataType::UInt8
            | DataType::UInt16
            | DataType::UInt32
            | DataType::UInt64
            | DataType::Float32
            | DataType::Float64
    )
}

/// Check if a column can be read as `Float64`.
///
/// A non-empty column holding only nulls qualifies whatever its dtype: CSV
/// readers infer such columns as strings.
#[inline]
pub fn is_numeric_column(column: &Column) -> bool {
    is_numeric_dtype(column.dtype())
        || matches!(column.dtype(), DataType::Null)
        || (!column.is_empty() && column.null_count() == column.len())
}

/// Names of every numeric column, in frame order.
pub fn numeric_columns(df: &DataFrame) -> Vec<String> {
    df.get_columns()
        .iter()
        .filter(|col| is_numeric_column(col))
        .map(|col| col.name().to_string())
        .collect()
}

/// Resolve the requested columns, defaulting to every numeric column.
fn resolve_columns(df: &DataFrame, columns: Option<&[String]>) -> Result<Vec<String>> {
    let Some(columns) = columns else {
        return Ok(numeric_columns(df));
    };

    for name in columns {
        let column = df
            .column(name)
            .map_err(|_| ImputeError::ColumnNotFound(name.clone()))?;
        if !is_numeric_column(column) {
            return Err(ImputeError::TypeConversionFailed {
                column: name.clone(),
                target_type: "Float64".to_string(),
                reason: format!("column has non-numeric type {}", column.dtype()),
            });
        }
    }

    Ok(columns.to_vec())
}

/// Convert columns of `df` into a row-major matrix.
///
/// Uses every numeric column when `columns` is `None`. Returns the matrix
/// together with the column names in matrix order.
pub fn frame_to_matrix(
    df: &DataFrame,
    columns: Option<&[String]>,
) -> Result<(Array2<f64>, Vec<String>)> {
    let names = resolve_columns(df, columns)?;
    let mut matrix = Array2::from_elem((df.height(), names.len()), f64::NAN);

    for (col_idx, name) in names.iter().enumerate() {
        let series = df
            .column(name)?
            .as_materialized_series()
            .cast(&DataType::Float64)
            .context(format!("Casting '{name}' to Float64"))?;
        let values = series.f64()?;

        for (row_idx, value) in values.into_iter().enumerate() {
            if let Some(v) = value {
                matrix[[row_idx, col_idx]] = v;
            }
        }
    }

    Ok((matrix, names))
}

/// Impute the selected columns of `df` with a fitted model.
///
/// The selected columns must match the model's features in count and order.
pub fn impute_frame(
    model: &FittedImputer,
    df: &DataFrame,
    columns: Option<&[String]>,
) -> Result<DataFrame> {
    let (matrix, names) = frame_to_matrix(df, columns)?;
    let filled = model.transform(matrix.view())?;

    let mut result = df.clone();
    for (col_idx, name) in names.iter().enumerate() {
        let values: Vec<f64> = filled.column(col_idx).to_vec();
        let series = Series::new(name.as_str().into(), values);
        result.replace(name, series)?;
    }

    debug!("Imputed {} columns of a {}x{} frame", names.len(), df.height(), df.width());
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ImputerConfig;

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_numeric_columns() {
        let df = df![
            "name" => ["a", "b"],
            "age" => [Some(25.0), None],
            "count" => [1i64, 2i64],
        ]
        .unwrap();
        assert_eq!(numeric_columns(&df), cols(&["age", "count"]));
    }

    #[test]
    fn test_frame_to_matrix_nulls_become_missing() {
        let df = df![
            "a" => [Some(1.0), None, Some(3.0)],
            "b" => [Some(10i64), Some(20i64), None],
        ]
        .unwrap();

        let (matrix, names) = frame_to_matrix(&df, None).unwrap();
        assert_eq!(names, cols(&["a", "b"]));
        assert_eq!(matrix.dim(), (3, 2));
        assert_eq!(matrix[[0, 1]], 10.0);
        assert!(matrix[[1, 0]].is_nan());
        assert!(matrix[[2, 1]].is_nan());
    }

    #[test]
    fn test_frame_to_matrix_unknown_column() {
        let df = df!["a" => [1.0]].unwrap();
        let result = frame_to_matrix(&df, Some(&cols(&["missing"])));
        assert!(matches!(result, Err(ImputeError::ColumnNotFound(name)) if name == "missing"));
    }

    #[test]
    fn test_all_null_string_column_is_numeric() {
        let df = df![
            "a" => [2.0, 3.0],
            "b" => [None::<&str>, None],
        ]
        .unwrap();
        assert_eq!(numeric_columns(&df), cols(&["a", "b"]));

        let (matrix, names) = frame_to_matrix(&df, Some(&cols(&["a", "b"]))).unwrap();
        assert_eq!(names, cols(&["a", "b"]));
        assert!(matrix.column(1).iter().all(|v| v.is_nan()));
    }

    #[test]
    fn test_impute_frame_fills_all_null_string_column() {
        let train = df![
            "a" => [1.0, 2.0, 3.0, 10.0],
            "b" => [1.0, 2.0, 3.0, 10.0],
        ]
        .unwrap();
        let (matrix, names) = frame_to_matrix(&train, None).unwrap();
        let config = ImputerConfig::builder().n_neighbors(1).build().unwrap();
        let model = FittedImputer::fit(&config, matrix.view()).unwrap();

        let df = df![
            "a" => [2.0, 9.0],
            "b" => [None::<&str>, None],
        ]
        .unwrap();
        let result = impute_frame(&model, &df, Some(&names)).unwrap();

        let b = result.column("b").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(b.get(0), Some(2.0));
        assert_eq!(b.get(1), Some(10.0));
    }

    #[test]
    fn test_frame_to_matrix_rejects_string_column() {
        let df = df!["name" => ["Alice", "Bob"]].unwrap();
        let result = frame_to_matrix(&df, Some(&cols(&["name"])));
        assert!(matches!(result, Err(ImputeError::TypeConversionFailed { .. })));
    }

    #[test]
    fn test_impute_frame_fills_and_keeps_other_columns() {
        let train = df![
            "x" => [1.0, 2.0, 3.0, 10.0],
            "y" => [1.0, 2.0, 3.0, 10.0],
        ]
        .unwrap();
        let (matrix, _) = frame_to_matrix(&train, None).unwrap();
        let config = ImputerConfig::builder().n_neighbors(1).build().unwrap();
        let model = FittedImputer::fit(&config, matrix.view()).unwrap();

        let df = df![
            "id" => ["r1", "r2"],
            "x" => [Some(2.0), Some(9.0)],
            "y" => [None, Some(2.5)],
        ]
        .unwrap();
        let result = impute_frame(&model, &df, None).unwrap();

        let y = result.column("y").unwrap().as_materialized_series().f64().unwrap().clone();
        assert_eq!(y.null_count(), 0);
        assert_eq!(y.get(0), Some(2.0));
        assert_eq!(y.get(1), Some(2.5));
        assert_eq!(result.column("id").unwrap().dtype(), &DataType::String);
        assert_eq!(result.width(), 3);
    }
}

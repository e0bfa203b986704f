//! Matrix helpers: construction, validation and missing-cell queries.
//!
//! The missing sentinel is `f64::NAN`. Infinite values are rejected.

use ndarray::{Array2, ArrayView1, ArrayView2, Axis};

use crate::error::{ImputeError, Result};

/// Check whether a cell holds the missing sentinel.
#[inline]
pub fn is_missing(value: f64) -> bool {
    value.is_nan()
}

/// Build a matrix from row vectors, rejecting ragged input.
pub fn from_rows(rows: &[Vec<f64>]) -> Result<Array2<f64>> {
    let n_cols = rows.first().map_or(0, Vec::len);

    if let Some((idx, row)) = rows.iter().enumerate().find(|(_, row)| row.len() != n_cols) {
        return Err(ImputeError::InvalidInput(format!(
            "row {} has {} cells, expected {}",
            idx,
            row.len(),
            n_cols
        )));
    }

    let flat: Vec<f64> = rows.iter().flatten().copied().collect();
    Array2::from_shape_vec((rows.len(), n_cols), flat)
        .map_err(|e| ImputeError::InvalidInput(e.to_string()))
}

/// Validate a matrix for `fit`/`transform`.
///
/// Requires at least one column and only finite or missing cells.
pub fn validate(data: ArrayView2<'_, f64>) -> Result<()> {
    if data.ncols() == 0 {
        return Err(ImputeError::InvalidInput(
            "matrix must have at least one column".to_string(),
        ));
    }

    if let Some(((row, column), _)) = data.indexed_iter().find(|(_, v)| v.is_infinite()) {
        return Err(ImputeError::NonFinite { row, column });
    }

    Ok(())
}

/// Check whether a row has no missing cells.
#[inline]
pub fn is_complete(row: ArrayView1<'_, f64>) -> bool {
    row.iter().all(|&v| !is_missing(v))
}

/// Column indices of the missing cells in a row, ascending.
pub fn missing_columns(row: ArrayView1<'_, f64>) -> Vec<usize> {
    row.iter()
        .enumerate()
        .filter(|&(_, &v)| is_missing(v))
        .map(|(idx, _)| idx)
        .collect()
}

/// Count the missing cells in a matrix.
pub fn count_missing(data: ArrayView2<'_, f64>) -> usize {
    data.iter().filter(|&&v| is_missing(v)).count()
}

/// Fully-observed rows of `data`, in their original order.
pub fn complete_rows(data: ArrayView2<'_, f64>) -> Array2<f64> {
    let keep: Vec<usize> = data
        .axis_iter(Axis(0))
        .enumerate()
        .filter(|(_, row)| is_complete(row.view()))
        .map(|(idx, _)| idx)
        .collect();

    data.select(Axis(0), &keep)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_from_rows_rectangular() {
        let matrix = from_rows(&[vec![1.0, 2.0], vec![3.0, f64::NAN]]).unwrap();
        assert_eq!(matrix.dim(), (2, 2));
        assert_eq!(matrix[[1, 0]], 3.0);
        assert!(matrix[[1, 1]].is_nan());
    }

    #[test]
    fn test_from_rows_ragged() {
        let result = from_rows(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(ImputeError::InvalidInput(msg)) if msg.contains("row 1")));
    }

    #[test]
    fn test_from_rows_empty() {
        let matrix = from_rows(&[]).unwrap();
        assert_eq!(matrix.dim(), (0, 0));
    }

    #[test]
    fn test_validate_rejects_infinity() {
        let data = array![[1.0, 2.0], [f64::NEG_INFINITY, 0.0]];
        assert!(matches!(
            validate(data.view()),
            Err(ImputeError::NonFinite { row: 1, column: 0 })
        ));
    }

    #[test]
    fn test_validate_rejects_zero_width() {
        let data = Array2::<f64>::zeros((3, 0));
        assert!(matches!(
            validate(data.view()),
            Err(ImputeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_validate_accepts_missing() {
        let data = array![[f64::NAN, 2.0]];
        assert!(validate(data.view()).is_ok());
    }

    #[test]
    fn test_missing_columns() {
        let row = array![f64::NAN, 1.0, f64::NAN];
        assert_eq!(missing_columns(row.view()), vec![0, 2]);
        assert!(!is_complete(row.view()));
    }

    #[test]
    fn test_complete_rows_keeps_order() {
        let data = array![
            [1.0, 1.0],
            [f64::NAN, 2.0],
            [3.0, 3.0],
            [4.0, f64::NAN],
            [5.0, 5.0]
        ];
        let complete = complete_rows(data.view());
        assert_eq!(complete, array![[1.0, 1.0], [3.0, 3.0], [5.0, 5.0]]);
        assert_eq!(count_missing(data.view()), 2);
    }
}

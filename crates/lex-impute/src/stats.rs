//! NaN-aware summary statistics.

use ndarray::ArrayView2;
use rayon::prelude::*;

use crate::config::Aggregator;

/// Mean of the non-NaN values, or `None` if there are none.
///
/// Accumulated as a running mean so finite inputs near `f64::MAX` stay finite.
pub fn nan_mean(values: &[f64]) -> Option<f64> {
    let (mean, count) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0_f64, 0usize), |(mean, count), &v| {
            let n = (count + 1) as f64;
            (mean + (v / n - mean / n), count + 1)
        });

    (count > 0).then_some(mean)
}

/// Median of the non-NaN values, or `None` if there are none.
///
/// Even-length inputs average the two middle values.
pub fn nan_median(values: &[f64]) -> Option<f64> {
    let mut observed: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();
    if observed.is_empty() {
        return None;
    }

    observed.sort_by(f64::total_cmp);
    let mid = observed.len() / 2;

    if observed.len() % 2 == 0 {
        Some(observed[mid - 1] / 2.0 + observed[mid] / 2.0)
    } else {
        Some(observed[mid])
    }
}

/// Apply `aggregate` to every column of `data`.
///
/// A column with no observed value yields `None`. Columns are summarized in
/// parallel; the result is in column order.
pub fn column_statistics(data: ArrayView2<'_, f64>, aggregate: Aggregator) -> Vec<Option<f64>> {
    (0..data.ncols())
        .into_par_iter()
        .map(|col| aggregate(&data.column(col).to_vec()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_nan_mean_ignores_missing() {
        assert_relative_eq!(nan_mean(&[2.0, f64::NAN, 5.0]).unwrap(), 3.5);
    }

    #[test]
    fn test_nan_mean_all_missing() {
        assert_eq!(nan_mean(&[f64::NAN, f64::NAN]), None);
        assert_eq!(nan_mean(&[]), None);
    }

    #[test]
    fn test_nan_median_odd_and_even() {
        assert_eq!(nan_median(&[3.0, 1.0, 2.0]), Some(2.0));
        assert_eq!(nan_median(&[4.0, 1.0, f64::NAN, 3.0, 2.0]), Some(2.5));
        assert_eq!(nan_median(&[f64::NAN]), None);
    }

    #[test]
    fn test_nan_median_single_value() {
        assert_eq!(nan_median(&[7.0]), Some(7.0));
    }

    #[test]
    fn test_statistics_stay_finite_near_max() {
        let huge = [1e308, 1.7e308];
        assert_relative_eq!(nan_mean(&huge).unwrap(), 1.35e308, max_relative = 1e-12);
        assert_relative_eq!(nan_median(&huge).unwrap(), 1.35e308, max_relative = 1e-12);

        assert_eq!(nan_mean(&[f64::MAX, f64::MAX]), Some(f64::MAX));
        assert_eq!(nan_median(&[f64::MAX, f64::MAX]), Some(f64::MAX));
        assert_eq!(nan_median(&[-f64::MAX, f64::MAX]), Some(0.0));
    }

    #[test]
    fn test_column_statistics() {
        let data = array![[1.0, f64::NAN, 4.0], [3.0, f64::NAN, f64::NAN]];
        let means = column_statistics(data.view(), nan_mean);
        assert_eq!(means, vec![Some(2.0), None, Some(4.0)]);
    }
}

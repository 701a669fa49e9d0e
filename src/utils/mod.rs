//! Descriptive statistics over feature columns
//!
//! All helpers treat NaN as missing and skip it.

use std::cmp::Ordering;

/// Collect the non-NaN values and sort them ascending
pub fn sorted_values<I>(values: I) -> Vec<f64>
where
    I: IntoIterator<Item = f64>,
{
    let mut sorted: Vec<f64> = values.into_iter().filter(|v| !v.is_nan()).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    sorted
}

/// Percentile of already-sorted values using linear interpolation between
/// the closest ranks (`q` in `[0, 100]`).
pub fn percentile_sorted(sorted: &[f64], q: f64) -> Option<f64> {
    if sorted.is_empty() || !(0.0..=100.0).contains(&q) {
        return None;
    }

    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let (a, b) = (sorted[lo], sorted[hi]);

    if lo == hi || a == b {
        return Some(a);
    }
    Some(a + (b - a) * (pos - lo as f64))
}

/// Several percentiles of already-sorted values
pub fn percentiles_sorted(sorted: &[f64], qs: &[f64]) -> Option<Vec<f64>> {
    qs.iter().map(|&q| percentile_sorted(sorted, q)).collect()
}

/// Median of already-sorted values
pub fn median_sorted(sorted: &[f64]) -> Option<f64> {
    percentile_sorted(sorted, 50.0)
}

/// Arithmetic mean
pub fn mean(values: &[f64]) -> Option<f64> {
    let (sum, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + v, n + 1));
    if n == 0 {
        None
    } else {
        Some(sum / n as f64)
    }
}

/// Population standard deviation (divides by `n`)
pub fn std_dev(values: &[f64]) -> Option<f64> {
    let m = mean(values)?;
    let (sq, n) = values
        .iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, n), &v| (s + (v - m).powi(2), n + 1));
    Some((sq / n as f64).sqrt())
}

/// Minimum and maximum
pub fn min_max(values: &[f64]) -> Option<(f64, f64)> {
    values
        .iter()
        .copied()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

/// Sort ascending and drop exact duplicates (and NaN)
pub fn unique_sorted(values: Vec<f64>) -> Vec<f64> {
    let mut sorted = sorted_values(values);
    sorted.dedup();
    sorted
}

/// Smallest `f64` strictly greater than `x`
pub fn next_up(x: f64) -> f64 {
    if x.is_nan() || x == f64::INFINITY {
        return x;
    }
    if x == 0.0 {
        return f64::from_bits(1);
    }
    let bits = x.to_bits();
    if x > 0.0 {
        f64::from_bits(bits + 1)
    } else {
        f64::from_bits(bits - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_percentiles_linear_interpolation() {
        let sorted: Vec<f64> = (1..=10).map(f64::from).collect();
        let qts = percentiles_sorted(&sorted, &[25.0, 50.0, 75.0]).unwrap();
        assert_relative_eq!(qts[0], 3.25);
        assert_relative_eq!(qts[1], 5.5);
        assert_relative_eq!(qts[2], 7.75);
    }

    #[test]
    fn test_percentile_bounds() {
        let sorted = vec![2.0, 4.0];
        assert_eq!(percentile_sorted(&sorted, 0.0), Some(2.0));
        assert_eq!(percentile_sorted(&sorted, 100.0), Some(4.0));
        assert_eq!(percentile_sorted(&sorted, 101.0), None);
        assert_eq!(percentile_sorted(&[], 50.0), None);
    }

    #[test]
    fn test_percentile_with_infinite_ties() {
        let sorted = vec![1.0, f64::INFINITY, f64::INFINITY];
        assert_eq!(percentile_sorted(&sorted, 75.0), Some(f64::INFINITY));
    }

    #[test]
    fn test_mean_and_population_std() {
        let values = [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0];
        assert_relative_eq!(mean(&values).unwrap(), 5.0);
        assert_relative_eq!(std_dev(&values).unwrap(), 2.0);
        assert_eq!(mean(&[]), None);
    }

    #[test]
    fn test_nan_is_skipped() {
        let values = [1.0, f64::NAN, 3.0];
        assert_relative_eq!(mean(&values).unwrap(), 2.0);
        assert_eq!(min_max(&values), Some((1.0, 3.0)));
        assert_eq!(sorted_values(values), vec![1.0, 3.0]);
    }

    #[test]
    fn test_unique_sorted() {
        assert_eq!(unique_sorted(vec![3.0, 1.0, 3.0, 2.0, 1.0]), vec![1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_next_up() {
        assert!(next_up(1.0) > 1.0);
        assert!(next_up(-1.0) > -1.0);
        assert!(next_up(0.0) > 0.0);
        assert!(next_up(-0.0) > 0.0);
        assert_eq!(next_up(f64::INFINITY), f64::INFINITY);
        assert_eq!(next_up(f64::NEG_INFINITY), -f64::MAX);
    }
}

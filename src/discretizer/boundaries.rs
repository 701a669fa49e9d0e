//! Bin boundaries, interval lookup and human-readable bin labels

use crate::utils::unique_sorted;
use serde::{Deserialize, Serialize};

/// Ascending, deduplicated thresholds splitting a feature into
/// `len() + 1` intervals.
///
/// Bin `i` is the half-open interval `(b[i-1], b[i]]`, with `b[-1] = -inf`
/// and `b[len] = +inf`. A value equal to a boundary therefore belongs to the
/// lower bin.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<f64>", into = "Vec<f64>")]
pub struct BinBoundaries(Vec<f64>);

impl BinBoundaries {
    /// Sort and deduplicate raw thresholds. NaN thresholds are dropped.
    /// Returns `None` when nothing is left, i.e. the feature cannot be binned.
    pub fn new(raw: Vec<f64>) -> Option<Self> {
        let thresholds = unique_sorted(raw);
        if thresholds.is_empty() {
            None
        } else {
            Some(Self(thresholds))
        }
    }

    /// Thresholds as a slice
    pub fn as_slice(&self) -> &[f64] {
        &self.0
    }

    /// Number of thresholds
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Always false; kept for API symmetry with `len`
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of bins (`len() + 1`)
    pub fn n_bins(&self) -> usize {
        self.0.len() + 1
    }

    /// Index of the bin containing `value`: the number of thresholds strictly
    /// below it. NaN maps to the last bin.
    pub fn bin_index(&self, value: f64) -> usize {
        if value.is_nan() {
            return self.0.len();
        }
        self.0.partition_point(|&b| b < value)
    }

    /// `(exclusive lower, inclusive upper)` limits of bin `bin`; `None`
    /// stands for an unbounded side.
    pub fn interval(&self, bin: usize) -> (Option<f64>, Option<f64>) {
        let lower = bin.checked_sub(1).and_then(|i| self.0.get(i).copied());
        let upper = self.0.get(bin).copied();
        (lower, upper)
    }

    /// Labels for every bin, e.g. `age <= 30.00`, `30.00 < age <= 45.00`,
    /// `age > 45.00`.
    pub fn labels(&self, name: &str) -> Vec<String> {
        let qts = &self.0;
        let mut labels = Vec::with_capacity(self.n_bins());
        labels.push(format!("{} <= {:.2}", name, qts[0]));
        for pair in qts.windows(2) {
            labels.push(format!("{:.2} < {} <= {:.2}", pair[0], name, pair[1]));
        }
        labels.push(format!("{} > {:.2}", name, qts[qts.len() - 1]));
        labels
    }
}

impl TryFrom<Vec<f64>> for BinBoundaries {
    type Error = String;

    fn try_from(raw: Vec<f64>) -> Result<Self, Self::Error> {
        Self::new(raw).ok_or_else(|| "bin boundaries must contain a non-NaN value".to_string())
    }
}

impl From<BinBoundaries> for Vec<f64> {
    fn from(boundaries: BinBoundaries) -> Self {
        boundaries.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quartiles() -> BinBoundaries {
        BinBoundaries::new(vec![3.25, 5.5, 7.75]).unwrap()
    }

    #[test]
    fn test_new_sorts_and_deduplicates() {
        let b = BinBoundaries::new(vec![5.0, 1.0, 5.0, f64::NAN, 3.0]).unwrap();
        assert_eq!(b.as_slice(), &[1.0, 3.0, 5.0]);
        assert_eq!(b.n_bins(), 4);
        assert!(BinBoundaries::new(vec![]).is_none());
        assert!(BinBoundaries::new(vec![f64::NAN]).is_none());
    }

    #[test]
    fn test_bin_index_ties_go_to_lower_bin() {
        let b = quartiles();
        assert_eq!(b.bin_index(1.0), 0);
        assert_eq!(b.bin_index(3.25), 0);
        assert_eq!(b.bin_index(3.26), 1);
        assert_eq!(b.bin_index(5.5), 1);
        assert_eq!(b.bin_index(7.75), 2);
        assert_eq!(b.bin_index(10.0), 3);
        assert_eq!(b.bin_index(f64::NEG_INFINITY), 0);
        assert_eq!(b.bin_index(f64::INFINITY), 3);
        assert_eq!(b.bin_index(f64::NAN), 3);
    }

    #[test]
    fn test_interval() {
        let b = quartiles();
        assert_eq!(b.interval(0), (None, Some(3.25)));
        assert_eq!(b.interval(1), (Some(3.25), Some(5.5)));
        assert_eq!(b.interval(3), (Some(7.75), None));
    }

    #[test]
    fn test_labels() {
        let labels = quartiles().labels("x");
        assert_eq!(
            labels,
            vec!["x <= 3.25", "3.25 < x <= 5.50", "5.50 < x <= 7.75", "x > 7.75"]
        );

        let single = BinBoundaries::new(vec![2.0]).unwrap().labels("age");
        assert_eq!(single, vec!["age <= 2.00", "age > 2.00"]);
    }

    #[test]
    fn test_serde_normalizes() {
        let b: BinBoundaries = serde_json::from_str("[3.0, 1.0, 3.0]").unwrap();
        assert_eq!(b.as_slice(), &[1.0, 3.0]);
        assert!(serde_json::from_str::<BinBoundaries>("[]").is_err());
    }
}

//! Binning strategies
//!
//! Every strategy answers one question: where do the bin boundaries of each
//! continuous feature go. Statistics, labels and inverse sampling are shared
//! by the discretizer and do not depend on the strategy.

use super::data_stats::DataStats;
use crate::config::DiscretizerConfig;
use crate::error::{DiscretizerError, Result};
use crate::training::DecisionTree;
use crate::utils::{median_sorted, percentiles_sorted, sorted_values};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Inputs available to a strategy while computing boundaries
#[derive(Debug, Clone, Copy)]
pub struct BinningContext<'a> {
    /// Construction data
    pub data: ArrayView2<'a, f64>,
    /// Per-row targets, if supplied
    pub labels: Option<ArrayView1<'a, f64>>,
    /// Columns to discretize, ascending
    pub features: &'a [usize],
    /// External statistics, if supplied
    pub data_stats: Option<&'a DataStats>,
    /// Shared configuration
    pub config: &'a DiscretizerConfig,
}

impl BinningContext<'_> {
    fn require_rows(&self, strategy: &str) -> Result<()> {
        if self.data.nrows() == 0 {
            return Err(DiscretizerError::InvalidInput(format!(
                "{} binning needs at least one row of data",
                strategy
            )));
        }
        Ok(())
    }

    /// Sorted non-NaN values of one column
    fn sorted_column(&self, feature: usize) -> Vec<f64> {
        sorted_values(self.data.column(feature).iter().copied())
    }
}

/// Computes raw per-feature bin boundaries.
///
/// Implementations return `(feature, thresholds)` pairs; the discretizer
/// sorts and deduplicates the thresholds, and leaves features that are
/// missing from the result (or whose thresholds end up empty) undiscretized.
pub trait BinningStrategy: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Fail fast when inputs the strategy depends on are missing
    fn check_preconditions(&self, _ctx: &BinningContext<'_>) -> Result<()> {
        Ok(())
    }

    /// Boundaries for every feature in `ctx.features`
    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>>;
}

/// 25th, 50th and 75th percentiles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuartileStrategy;

impl BinningStrategy for QuartileStrategy {
    fn name(&self) -> &'static str {
        "quartile"
    }

    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>> {
        ctx.require_rows(self.name())?;
        Ok(ctx
            .features
            .iter()
            .map(|&feature| {
                let sorted = ctx.sorted_column(feature);
                let qts = percentiles_sorted(&sorted, &[25.0, 50.0, 75.0]).unwrap_or_default();
                (feature, qts)
            })
            .collect())
    }
}

/// Deciles, coarsened until every percentile is finite. Tied percentiles
/// are kept and collapse when the boundaries are deduplicated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecileStrategy;

impl DecileStrategy {
    /// Percentiles splitting `sorted` into `splits` equal-frequency parts, or
    /// `None` when a percentile is not finite.
    fn try_splits(sorted: &[f64], splits: usize) -> Option<Vec<f64>> {
        let qs: Vec<f64> = (1..splits)
            .map(|k| k as f64 * 100.0 / splits as f64)
            .collect();
        let qts = percentiles_sorted(sorted, &qs)?;
        if qts.iter().all(|q| q.is_finite()) {
            Some(qts)
        } else {
            None
        }
    }

    fn feature_boundaries(sorted: &[f64], ladder: &[usize], feature: usize) -> Vec<f64> {
        for &splits in ladder {
            if let Some(qts) = Self::try_splits(sorted, splits) {
                return qts;
            }
            debug!(feature, splits, "Decile split failed, trying a coarser one");
        }

        // Every rung failed: keep the coarsest percentiles as they are
        let coarsest = ladder.last().copied().unwrap_or(3);
        let qs: Vec<f64> = (1..coarsest)
            .map(|k| k as f64 * 100.0 / coarsest as f64)
            .collect();
        percentiles_sorted(sorted, &qs).unwrap_or_default()
    }
}

impl BinningStrategy for DecileStrategy {
    fn name(&self) -> &'static str {
        "decile"
    }

    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>> {
        ctx.require_rows(self.name())?;
        Ok(ctx
            .features
            .iter()
            .map(|&feature| {
                let sorted = ctx.sorted_column(feature);
                let qts = Self::feature_boundaries(&sorted, &ctx.config.decile_ladder, feature);
                (feature, qts)
            })
            .collect())
    }
}

/// Split thresholds of an entropy decision tree fitted on each feature alone
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntropyStrategy;

impl EntropyStrategy {
    fn feature_boundaries(
        column: ArrayView1<'_, f64>,
        labels: ArrayView1<'_, f64>,
        max_depth: usize,
        feature: usize,
    ) -> Vec<f64> {
        let (xs, ys): (Vec<f64>, Vec<f64>) = column
            .iter()
            .zip(labels.iter())
            .filter(|(x, _)| !x.is_nan())
            .map(|(&x, &y)| (x, y))
            .unzip();

        let mut tree = DecisionTree::new_classifier().with_max_depth(max_depth);

        let fitted = Array2::from_shape_vec((xs.len(), 1), xs.clone())
            .map_err(DiscretizerError::from)
            .and_then(|x| tree.fit(x.view(), Array1::from(ys).view()).map(|_| ()));

        let mut thresholds = match fitted {
            Ok(()) => tree.split_thresholds(),
            Err(e) => {
                debug!(feature, error = %e, "Entropy tree could not be fitted");
                Vec::new()
            }
        };

        if thresholds.is_empty() {
            // No informative split: a single boundary at the median
            let sorted = sorted_values(xs);
            return median_sorted(&sorted).into_iter().collect();
        }

        thresholds.sort_by(|a, b| a.total_cmp(b));
        thresholds
    }
}

impl BinningStrategy for EntropyStrategy {
    fn name(&self) -> &'static str {
        "entropy"
    }

    fn check_preconditions(&self, ctx: &BinningContext<'_>) -> Result<()> {
        if ctx.labels.is_none() {
            return Err(DiscretizerError::ConfigError(
                "Labels must be provided when using the entropy strategy".to_string(),
            ));
        }
        Ok(())
    }

    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>> {
        self.check_preconditions(ctx)?;
        ctx.require_rows(self.name())?;
        let labels = ctx.labels.ok_or_else(|| {
            DiscretizerError::ConfigError("Labels must be provided when using the entropy strategy".to_string())
        })?;

        Ok(ctx
            .features
            .iter()
            .map(|&feature| {
                let qts = Self::feature_boundaries(
                    ctx.data.column(feature),
                    labels,
                    ctx.config.entropy_max_depth,
                    feature,
                );
                (feature, qts)
            })
            .collect())
    }
}

/// Boundaries taken verbatim from `DataStats::bins`
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalStatsStrategy;

impl BinningStrategy for ExternalStatsStrategy {
    fn name(&self) -> &'static str {
        "external_stats"
    }

    fn check_preconditions(&self, ctx: &BinningContext<'_>) -> Result<()> {
        if ctx.data_stats.is_none() {
            return Err(DiscretizerError::ConfigError(
                "Data stats must be provided when using the external stats strategy".to_string(),
            ));
        }
        Ok(())
    }

    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>> {
        self.check_preconditions(ctx)?;
        let stats = match ctx.data_stats {
            Some(stats) => stats,
            None => return Ok(Vec::new()),
        };

        Ok(ctx
            .features
            .iter()
            .filter_map(|&feature| stats.bins_for(feature).map(|bins| (feature, bins.to_vec())))
            .collect())
    }
}

/// The built-in strategies
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    #[default]
    Quartile,
    Decile,
    Entropy,
    ExternalStats,
}

impl Strategy {
    fn inner(&self) -> &dyn BinningStrategy {
        match self {
            Strategy::Quartile => &QuartileStrategy,
            Strategy::Decile => &DecileStrategy,
            Strategy::Entropy => &EntropyStrategy,
            Strategy::ExternalStats => &ExternalStatsStrategy,
        }
    }
}

impl BinningStrategy for Strategy {
    fn name(&self) -> &'static str {
        self.inner().name()
    }

    fn check_preconditions(&self, ctx: &BinningContext<'_>) -> Result<()> {
        self.inner().check_preconditions(ctx)
    }

    fn compute_boundaries(&self, ctx: &BinningContext<'_>) -> Result<Vec<(usize, Vec<f64>)>> {
        self.inner().compute_boundaries(ctx)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discretizer::BinBoundaries;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn ctx<'a>(
        data: &'a Array2<f64>,
        labels: Option<&'a Array1<f64>>,
        features: &'a [usize],
        config: &'a DiscretizerConfig,
    ) -> BinningContext<'a> {
        BinningContext {
            data: data.view(),
            labels: labels.map(|l| l.view()),
            features,
            data_stats: None,
            config,
        }
    }

    fn one_to_ten() -> Array2<f64> {
        Array2::from_shape_vec((10, 1), (1..=10).map(f64::from).collect()).unwrap()
    }

    #[test]
    fn test_quartile_boundaries() {
        let data = one_to_ten();
        let config = DiscretizerConfig::default();
        let result = QuartileStrategy
            .compute_boundaries(&ctx(&data, None, &[0], &config))
            .unwrap();
        assert_eq!(result.len(), 1);
        let (feature, qts) = &result[0];
        assert_eq!(*feature, 0);
        assert_relative_eq!(qts[0], 3.25);
        assert_relative_eq!(qts[1], 5.5);
        assert_relative_eq!(qts[2], 7.75);
    }

    #[test]
    fn test_decile_uses_finest_distinct_split() {
        let data = Array2::from_shape_vec((100, 1), (0..100).map(f64::from).collect()).unwrap();
        let config = DiscretizerConfig::default();
        let result = DecileStrategy
            .compute_boundaries(&ctx(&data, None, &[0], &config))
            .unwrap();
        assert_eq!(result[0].1.len(), 9);
        assert_relative_eq!(result[0].1[0], 9.9, epsilon = 1e-9);
    }

    #[test]
    fn test_decile_keeps_finest_split_on_ties() {
        // 60 zeros then 1..=40: the lower deciles tie at zero
        let mut values = vec![0.0; 60];
        values.extend((1..=40).map(f64::from));
        let data = Array2::from_shape_vec((100, 1), values).unwrap();
        let config = DiscretizerConfig::default();
        let result = DecileStrategy
            .compute_boundaries(&ctx(&data, None, &[0], &config))
            .unwrap();
        assert_eq!(result[0].1.len(), 9);

        let qts = BinBoundaries::new(result[0].1.clone()).unwrap();
        let expected = [0.0, 0.4, 10.3, 20.2, 30.1];
        assert_eq!(qts.len(), expected.len());
        for (got, want) in qts.as_slice().iter().zip(expected) {
            assert_relative_eq!(*got, want, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_decile_coarsens_on_infinite_percentiles() {
        // An infinite tail makes the finer upper percentiles infinite
        let mut values: Vec<f64> = (1..=8).map(f64::from).collect();
        values.extend([f64::INFINITY, f64::INFINITY]);
        let data = Array2::from_shape_vec((10, 1), values).unwrap();
        let config = DiscretizerConfig::default().with_decile_ladder(vec![10, 4]);
        let result = DecileStrategy
            .compute_boundaries(&ctx(&data, None, &[0], &config))
            .unwrap();
        assert_eq!(result[0].1.len(), 3);
        assert!(result[0].1.iter().all(|q| q.is_finite()));
    }

    #[test]
    fn test_decile_constant_column_ties() {
        let data = Array2::from_elem((6, 1), 4.0);
        let config = DiscretizerConfig::default();
        let result = DecileStrategy
            .compute_boundaries(&ctx(&data, None, &[0], &config))
            .unwrap();
        assert_eq!(result[0].1, vec![4.0; 9]);
    }

    #[test]
    fn test_entropy_finds_class_boundary() {
        let data = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let labels = array![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];
        let config = DiscretizerConfig::default();
        let result = EntropyStrategy
            .compute_boundaries(&ctx(&data, Some(&labels), &[0], &config))
            .unwrap();
        assert_eq!(result[0].1, vec![3.5]);
    }

    #[test]
    fn test_entropy_fractional_labels() {
        let data = array![[1.0], [2.0], [3.0], [4.0], [5.0], [6.0]];
        let labels = array![0.2, 0.2, 0.2, 0.4, 0.4, 0.4];
        let config = DiscretizerConfig::default();
        let result = EntropyStrategy
            .compute_boundaries(&ctx(&data, Some(&labels), &[0], &config))
            .unwrap();
        assert_eq!(result[0].1, vec![3.5]);
    }

    #[test]
    fn test_entropy_without_split_uses_median() {
        let data = array![[1.0], [2.0], [3.0], [4.0]];
        let labels = array![1.0, 1.0, 1.0, 1.0];
        let config = DiscretizerConfig::default();
        let result = EntropyStrategy
            .compute_boundaries(&ctx(&data, Some(&labels), &[0], &config))
            .unwrap();
        assert_eq!(result[0].1, vec![2.5]);
    }

    #[test]
    fn test_entropy_requires_labels() {
        let data = one_to_ten();
        let config = DiscretizerConfig::default();
        let err = EntropyStrategy
            .check_preconditions(&ctx(&data, None, &[0], &config))
            .unwrap_err();
        assert!(matches!(err, DiscretizerError::ConfigError(_)));
    }

    #[test]
    fn test_external_stats_skips_missing_features() {
        let data = Array2::zeros((0, 3));
        let stats = DataStats::new().with_bins(2, vec![0.5, 1.5]);
        let config = DiscretizerConfig::default();
        let context = BinningContext {
            data: data.view(),
            labels: None,
            features: &[0, 1, 2],
            data_stats: Some(&stats),
            config: &config,
        };
        let result = ExternalStatsStrategy.compute_boundaries(&context).unwrap();
        assert_eq!(result, vec![(2, vec![0.5, 1.5])]);
    }

    #[test]
    fn test_strategy_enum_dispatch() {
        assert_eq!(Strategy::Quartile.name(), "quartile");
        assert_eq!(Strategy::ExternalStats.name(), "external_stats");
        let json = serde_json::to_string(&Strategy::ExternalStats).unwrap();
        assert_eq!(json, "\"external_stats\"");
    }

    #[test]
    fn test_empty_data_rejected() {
        let data = Array2::zeros((0, 1));
        let config = DiscretizerConfig::default();
        assert!(matches!(
            QuartileStrategy.compute_boundaries(&ctx(&data, None, &[0], &config)),
            Err(DiscretizerError::InvalidInput(_))
        ));
    }
}

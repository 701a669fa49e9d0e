//! Reversible discretization of continuous features
//!
//! A [`Discretizer`] is fitted once on a feature matrix. It maps continuous
//! values to bin indices ([`Discretizer::discretize`]) and bin indices back to
//! plausible continuous values ([`Discretizer::undiscretize`]) drawn from a
//! truncated normal fitted to each bin.
//!
//! ```
//! use lime_discretize::discretizer::{Discretizer, Strategy};
//! use ndarray::array;
//!
//! let data = array![[1.0, 0.0], [2.0, 1.0], [3.0, 0.0], [4.0, 1.0]];
//! let mut disc = Discretizer::builder(Strategy::Quartile)
//!     .with_categorical_features(vec![1])
//!     .with_seed(7)
//!     .build(data.view())?;
//!
//! let bins = disc.discretize(data.view())?;
//! let synthetic = disc.undiscretize(bins.view())?;
//! assert_eq!(disc.discretize(synthetic.view())?, bins);
//! # Ok::<(), lime_discretize::DiscretizerError>(())
//! ```

mod boundaries;
mod data_stats;
mod sampling;
mod strategy;

pub use boundaries::BinBoundaries;
pub use data_stats::DataStats;
pub use sampling::{
    sample_bin, BinStatistics, CacheState, InverseSampleCache, SampleRange, SamplingFailure,
    TruncatedNormal,
};
pub use strategy::{
    BinningContext, BinningStrategy, DecileStrategy, EntropyStrategy, ExternalStatsStrategy,
    QuartileStrategy, Strategy,
};

use crate::config::DiscretizerConfig;
use crate::error::{DiscretizerError, Result};
use crate::utils::{mean, min_max, std_dev};
use ndarray::{Array1, Array2, ArrayView1, ArrayView2};
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256PlusPlus;
use std::collections::{BTreeMap, BTreeSet};
use tracing::debug;

/// Everything the discretizer knows about one binned feature
#[derive(Debug, Clone)]
pub struct FeatureBinningInfo {
    name: String,
    boundaries: BinBoundaries,
    labels: Vec<String>,
    stats: Vec<BinStatistics>,
    ranges: Vec<SampleRange>,
    caches: Vec<InverseSampleCache>,
}

impl FeatureBinningInfo {
    /// Feature name used in the labels
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Bin boundaries
    pub fn boundaries(&self) -> &BinBoundaries {
        &self.boundaries
    }

    /// One label per bin
    pub fn labels(&self) -> &[String] {
        &self.labels
    }

    /// One statistics record per bin
    pub fn stats(&self) -> &[BinStatistics] {
        &self.stats
    }

    /// Number of bins
    pub fn n_bins(&self) -> usize {
        self.boundaries.n_bins()
    }

    /// Next inverse sample for `bin`, refilling its cache when exhausted
    fn draw(&mut self, bin: usize, rng: &mut Xoshiro256PlusPlus, config: &DiscretizerConfig) -> f64 {
        let cache = &mut self.caches[bin];
        if cache.is_exhausted() {
            debug!(feature = %self.name, bin, "Refilling inverse sample cache");
            cache.refill(sample_bin(&self.stats[bin], self.ranges[bin], config.precompute_size, rng));
        }

        let value = cache.next_value().unwrap_or(self.ranges[bin].low);
        if value.is_infinite() {
            value.signum() * config.infinity_sentinel
        } else {
            value
        }
    }

    /// Bin index encoded in `value`, truncated toward zero
    fn parse_bin(&self, feature: usize, value: f64) -> Result<usize> {
        let max_bin = self.boundaries.len();
        let index = value.trunc();
        if !value.is_finite() || index < 0.0 || index > max_bin as f64 {
            return Err(DiscretizerError::InvalidBin {
                feature,
                value,
                max_bin,
            });
        }
        Ok(index as usize)
    }
}

/// Builder for [`Discretizer`]
pub struct DiscretizerBuilder {
    strategy: Box<dyn BinningStrategy>,
    categorical_features: Vec<usize>,
    feature_names: Option<Vec<String>>,
    labels: Option<Array1<f64>>,
    data_stats: Option<DataStats>,
    config: DiscretizerConfig,
    rng: Option<Xoshiro256PlusPlus>,
}

impl DiscretizerBuilder {
    /// Start a builder for the given strategy
    pub fn new(strategy: impl BinningStrategy + 'static) -> Self {
        Self {
            strategy: Box::new(strategy),
            categorical_features: Vec::new(),
            feature_names: None,
            labels: None,
            data_stats: None,
            config: DiscretizerConfig::default(),
            rng: None,
        }
    }

    /// Columns that are left untouched
    pub fn with_categorical_features(mut self, features: Vec<usize>) -> Self {
        self.categorical_features = features;
        self
    }

    /// Names used in bin labels (defaults to the column index)
    pub fn with_feature_names<S: Into<String>>(mut self, names: Vec<S>) -> Self {
        self.feature_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Per-row targets; required by the entropy strategy
    pub fn with_labels(mut self, labels: Array1<f64>) -> Self {
        self.labels = Some(labels);
        self
    }

    /// Adopt external statistics instead of computing them from data
    pub fn with_data_stats(mut self, data_stats: DataStats) -> Self {
        self.data_stats = Some(data_stats);
        self
    }

    /// Replace the configuration
    pub fn with_config(mut self, config: DiscretizerConfig) -> Self {
        self.config = config;
        self
    }

    /// Seed the inverse-sampling generator
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.config.random_state = Some(seed);
        self
    }

    /// Use an existing generator for inverse sampling
    pub fn with_rng(mut self, rng: Xoshiro256PlusPlus) -> Self {
        self.rng = Some(rng);
        self
    }

    /// Fit boundaries and statistics on `data` and precompute the inverse
    /// sample caches.
    pub fn build(self, data: ArrayView2<'_, f64>) -> Result<Discretizer> {
        self.config.validate()?;

        let (n_rows, n_features) = data.dim();

        let feature_names = match self.feature_names {
            Some(names) if names.len() != n_features => {
                return Err(DiscretizerError::ShapeError {
                    expected: format!("{} feature names", n_features),
                    actual: format!("{} feature names", names.len()),
                });
            }
            Some(names) => names,
            None => (0..n_features).map(|i| i.to_string()).collect(),
        };

        if let Some(labels) = &self.labels {
            if labels.len() != n_rows {
                return Err(DiscretizerError::ShapeError {
                    expected: format!("{} labels", n_rows),
                    actual: format!("{} labels", labels.len()),
                });
            }
        }

        if let Some(&bad) = self.categorical_features.iter().find(|&&f| f >= n_features) {
            return Err(DiscretizerError::InvalidParameter {
                name: "categorical_features".to_string(),
                value: bad.to_string(),
                reason: format!("data has only {} columns", n_features),
            });
        }

        let categorical: BTreeSet<usize> = self.categorical_features.iter().copied().collect();
        let discretize_set: Vec<usize> = (0..n_features)
            .filter(|f| !categorical.contains(f))
            .collect();

        let ctx = BinningContext {
            data: data.reborrow(),
            labels: self.labels.as_ref().map(|l| l.view()),
            features: &discretize_set,
            data_stats: self.data_stats.as_ref(),
            config: &self.config,
        };

        debug!(
            strategy = self.strategy.name(),
            features = ?discretize_set,
            "Computing bin boundaries"
        );
        self.strategy.check_preconditions(&ctx)?;
        let raw_boundaries = self.strategy.compute_boundaries(&ctx)?;

        let mut rng = match (self.rng, self.config.random_state) {
            (Some(rng), _) => rng,
            (None, Some(seed)) => Xoshiro256PlusPlus::seed_from_u64(seed),
            (None, None) => Xoshiro256PlusPlus::from_entropy(),
        };

        let mut features = BTreeMap::new();
        for (feature, raw) in raw_boundaries {
            if categorical.contains(&feature) || feature >= n_features {
                continue;
            }
            let boundaries = match BinBoundaries::new(raw) {
                Some(b) => b,
                None => {
                    debug!(feature, "No usable boundaries, feature left undiscretized");
                    continue;
                }
            };
            debug!(feature, boundaries = ?boundaries.as_slice(), "Bin boundaries");

            let name = feature_names[feature].clone();
            let labels = boundaries.labels(&name);

            let adopted = match &self.data_stats {
                Some(ds) => ds.feature_stats(feature, boundaries.n_bins())?,
                None => None,
            };
            let stats = match adopted {
                Some(stats) => stats,
                None => compute_bin_statistics(data.column(feature), &boundaries, self.config.std_floor)
                    .ok_or_else(|| {
                        DiscretizerError::InvalidInput(format!(
                            "cannot compute statistics for feature {} without data",
                            feature
                        ))
                    })?,
            };

            let ranges: Vec<SampleRange> = stats
                .iter()
                .enumerate()
                .map(|(bin, s)| SampleRange::for_bin(s, boundaries.interval(bin)))
                .collect();

            let caches = stats
                .iter()
                .zip(&ranges)
                .map(|(s, &range)| {
                    let mut cache = InverseSampleCache::new(self.config.precompute_size);
                    cache.refill(sample_bin(s, range, self.config.precompute_size, &mut rng));
                    cache
                })
                .collect();

            features.insert(
                feature,
                FeatureBinningInfo {
                    name,
                    boundaries,
                    labels,
                    stats,
                    ranges,
                    caches,
                },
            );
        }

        Ok(Discretizer {
            strategy_name: self.strategy.name(),
            n_features,
            discretize_set,
            feature_names,
            features,
            config: self.config,
            rng,
        })
    }
}

/// Per-bin statistics of one column. Returns `None` when the column has no
/// non-NaN value to derive the outer truncation bounds from.
fn compute_bin_statistics(
    column: ArrayView1<'_, f64>,
    boundaries: &BinBoundaries,
    std_floor: f64,
) -> Option<Vec<BinStatistics>> {
    let values: Vec<f64> = column.iter().copied().filter(|v| !v.is_nan()).collect();
    let (data_min, data_max) = min_max(&values)?;

    let mut per_bin: Vec<Vec<f64>> = vec![Vec::new(); boundaries.n_bins()];
    for &v in &values {
        per_bin[boundaries.bin_index(v)].push(v);
    }

    let qts = boundaries.as_slice();
    Some(
        per_bin
            .iter()
            .enumerate()
            .map(|(bin, selection)| BinStatistics {
                mean: mean(selection).unwrap_or(0.0),
                std: std_dev(selection).unwrap_or(0.0) + std_floor,
                min: if bin == 0 { data_min } else { qts[bin - 1] },
                max: if bin == qts.len() { data_max } else { qts[bin] },
                count: selection.len(),
            })
            .collect(),
    )
}

/// Fitted discretizer
#[derive(Debug, Clone)]
pub struct Discretizer {
    strategy_name: &'static str,
    n_features: usize,
    discretize_set: Vec<usize>,
    feature_names: Vec<String>,
    features: BTreeMap<usize, FeatureBinningInfo>,
    config: DiscretizerConfig,
    rng: Xoshiro256PlusPlus,
}

impl Discretizer {
    /// Start building a discretizer with the given strategy
    pub fn builder(strategy: impl BinningStrategy + 'static) -> DiscretizerBuilder {
        DiscretizerBuilder::new(strategy)
    }

    /// Map each discretized value of a row to its bin index
    pub fn discretize_row(&self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_width(row.len())?;
        let mut out = row.to_owned();
        for (&feature, info) in &self.features {
            out[feature] = info.boundaries.bin_index(row[feature]) as f64;
        }
        Ok(out)
    }

    /// Map each discretized column of a matrix to bin indices
    pub fn discretize(&self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;
        let mut out = data.to_owned();
        for (&feature, info) in &self.features {
            out.column_mut(feature)
                .mapv_inplace(|v| info.boundaries.bin_index(v) as f64);
        }
        Ok(out)
    }

    /// Replace each bin index of a row with an inverse sample from that bin
    pub fn undiscretize_row(&mut self, row: ArrayView1<'_, f64>) -> Result<Array1<f64>> {
        self.check_width(row.len())?;

        let mut bins = Vec::with_capacity(self.features.len());
        for (&feature, info) in &self.features {
            bins.push((feature, info.parse_bin(feature, row[feature])?));
        }

        let mut out = row.to_owned();
        let Self { features, rng, config, .. } = self;
        for (feature, bin) in bins {
            if let Some(info) = features.get_mut(&feature) {
                out[feature] = info.draw(bin, rng, config);
            }
        }
        Ok(out)
    }

    /// Replace each bin index of a matrix with an inverse sample from that
    /// bin. Columns are processed one feature at a time, top to bottom.
    pub fn undiscretize(&mut self, data: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        self.check_width(data.ncols())?;

        let mut bins = Vec::with_capacity(self.features.len());
        for (&feature, info) in &self.features {
            let column = data
                .column(feature)
                .iter()
                .map(|&v| info.parse_bin(feature, v))
                .collect::<Result<Vec<usize>>>()?;
            bins.push((feature, column));
        }

        let mut out = data.to_owned();
        let Self { features, rng, config, .. } = self;
        for (feature, column) in bins {
            if let Some(info) = features.get_mut(&feature) {
                for (row, bin) in column.into_iter().enumerate() {
                    out[[row, feature]] = info.draw(bin, rng, config);
                }
            }
        }
        Ok(out)
    }

    fn check_width(&self, width: usize) -> Result<()> {
        if width != self.n_features {
            return Err(DiscretizerError::ShapeError {
                expected: format!("{} features", self.n_features),
                actual: format!("{} features", width),
            });
        }
        Ok(())
    }

    /// Name of the strategy the boundaries came from
    pub fn strategy_name(&self) -> &'static str {
        self.strategy_name
    }

    /// Number of columns expected by every operation
    pub fn n_features(&self) -> usize {
        self.n_features
    }

    /// Non-categorical columns, whether or not a boundary set was found
    pub fn discretize_set(&self) -> &[usize] {
        &self.discretize_set
    }

    /// Columns that actually carry bins, ascending
    pub fn discretized_features(&self) -> Vec<usize> {
        self.features.keys().copied().collect()
    }

    /// Names of all columns
    pub fn feature_names(&self) -> &[String] {
        &self.feature_names
    }

    /// Active configuration
    pub fn config(&self) -> &DiscretizerConfig {
        &self.config
    }

    /// Binning details of one feature
    pub fn feature_info(&self, feature: usize) -> Option<&FeatureBinningInfo> {
        self.features.get(&feature)
    }

    /// Boundaries of one feature
    pub fn boundaries(&self, feature: usize) -> Option<&[f64]> {
        self.features.get(&feature).map(|i| i.boundaries.as_slice())
    }

    /// Labels of one feature
    pub fn bin_labels(&self, feature: usize) -> Option<&[String]> {
        self.features.get(&feature).map(|i| i.labels.as_slice())
    }

    /// Per-bin statistics of one feature
    pub fn bin_statistics(&self, feature: usize) -> Option<&[BinStatistics]> {
        self.features.get(&feature).map(|i| i.stats.as_slice())
    }

    /// Number of bins of one feature
    pub fn n_bins(&self, feature: usize) -> Option<usize> {
        self.features.get(&feature).map(FeatureBinningInfo::n_bins)
    }

    /// Position of one inverse sample cache
    pub fn cache_state(&self, feature: usize, bin: usize) -> Option<CacheState> {
        self.features
            .get(&feature)
            .and_then(|i| i.caches.get(bin))
            .map(InverseSampleCache::state)
    }

    /// Snapshot boundaries and statistics so an equivalent discretizer can be
    /// rebuilt with [`Strategy::ExternalStats`] and no data.
    pub fn data_stats(&self) -> DataStats {
        let mut stats = DataStats::new();
        for (&feature, info) in &self.features {
            let column = |f: fn(&BinStatistics) -> f64| info.stats.iter().map(f).collect::<Vec<f64>>();
            stats = stats
                .with_bins(feature, info.boundaries.as_slice().to_vec())
                .with_feature_stats(
                    feature,
                    column(|s| s.mean),
                    column(|s| s.std),
                    column(|s| s.min),
                    column(|s| s.max),
                );
        }
        stats
    }
}

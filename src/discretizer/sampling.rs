//! Inverse sampling: per-bin statistics, truncated normal draws and the
//! fixed-capacity cache undiscretization reads from.

use crate::utils::next_up;
use rand::Rng;
use serde::{Deserialize, Serialize};
use statrs::distribution::{ContinuousCDF, Normal};
use std::fmt;
use tracing::warn;

/// Below this lower-tail mass the inverse CDF loses precision and the
/// exponential tail approximation takes over.
const TAIL_MASS_CUTOFF: f64 = 1e-200;

/// Descriptive statistics of the observations that fell into one bin
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BinStatistics {
    /// Mean of the bin (0 for an empty bin)
    pub mean: f64,
    /// Population standard deviation plus the configured floor
    pub std: f64,
    /// Lower truncation bound
    pub min: f64,
    /// Upper truncation bound
    pub max: f64,
    /// Rows observed in the bin during construction (0 when adopted from `DataStats`)
    pub count: usize,
}

/// Why a bin's truncated normal could not be parameterised
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SamplingFailure {
    /// Mean or standard deviation is NaN or infinite
    NonFiniteParameters,
    /// Standard deviation is zero or negative
    NonPositiveScale,
    /// A truncation bound is NaN or the bounds are reversed
    InvalidBounds,
}

impl fmt::Display for SamplingFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let reason = match self {
            SamplingFailure::NonFiniteParameters => "non-finite mean or standard deviation",
            SamplingFailure::NonPositiveScale => "non-positive standard deviation",
            SamplingFailure::InvalidBounds => "invalid truncation bounds",
        };
        f.write_str(reason)
    }
}

/// Normal distribution with mean `mean` and scale `std` restricted to
/// `[lower, upper]`.
#[derive(Debug, Clone)]
pub struct TruncatedNormal {
    mean: f64,
    std: f64,
    lower: f64,
    upper: f64,
    standard: Normal,
}

impl TruncatedNormal {
    /// Validate parameters. Infinite bounds give a one- or two-sided tail.
    pub fn new(mean: f64, std: f64, lower: f64, upper: f64) -> Result<Self, SamplingFailure> {
        if !mean.is_finite() || !std.is_finite() {
            return Err(SamplingFailure::NonFiniteParameters);
        }
        if std <= 0.0 {
            return Err(SamplingFailure::NonPositiveScale);
        }
        if lower.is_nan() || upper.is_nan() || lower > upper {
            return Err(SamplingFailure::InvalidBounds);
        }
        let standard = Normal::new(0.0, 1.0).map_err(|_| SamplingFailure::NonFiniteParameters)?;
        Ok(Self {
            mean,
            std,
            lower,
            upper,
            standard,
        })
    }

    /// Draw one value; always within `[lower, upper]`.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> f64 {
        if self.lower == self.upper {
            return self.lower;
        }

        let a = (self.lower - self.mean) / self.std;
        let b = (self.upper - self.mean) / self.std;

        // Sample on the side of the mean where the CDF keeps its precision
        let z = if a > 0.0 {
            -self.sample_standard(-b, -a, rng)
        } else {
            self.sample_standard(a, b, rng)
        };

        let value = self.mean + self.std * z;
        if value.is_nan() {
            return self.lower;
        }
        value.clamp(self.lower, self.upper)
    }

    /// Draw `n` values
    pub fn sample_n<R: Rng + ?Sized>(&self, rng: &mut R, n: usize) -> Vec<f64> {
        (0..n).map(|_| self.sample(rng)).collect()
    }

    /// Standard normal truncated to `[a, b]` with `a <= 0`
    fn sample_standard<R: Rng + ?Sized>(&self, a: f64, b: f64, rng: &mut R) -> f64 {
        let u: f64 = rng.gen();
        let pb = self.standard.cdf(b);

        if b < 0.0 && pb < TAIL_MASS_CUTOFF {
            // Far lower tail: the density decays like exp(t * (z - b)) below b
            let t = -b;
            let width = b - a;
            let mass = -(-t * width).exp_m1();
            let offset = -(-u * mass).ln_1p() / t;
            return (b - offset).max(a);
        }

        let pa = self.standard.cdf(a);
        let p = (pa + u * (pb - pa)).clamp(0.0, 1.0);
        self.standard.inverse_cdf(p).clamp(a, b)
    }
}

/// Range inverse samples for one bin are drawn from: the bin statistics'
/// `[min, max]` intersected with the bin's discretization interval.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleRange {
    /// Smallest value that still discretizes into the bin
    pub low: f64,
    /// Largest value that still discretizes into the bin
    pub high: f64,
}

impl SampleRange {
    /// `interval` is `(exclusive lower, inclusive upper)` as returned by
    /// [`BinBoundaries::interval`](super::BinBoundaries::interval).
    pub fn for_bin(stats: &BinStatistics, interval: (Option<f64>, Option<f64>)) -> Self {
        let (lower, upper) = interval;

        let mut low = stats.min;
        if let Some(l) = lower {
            low = low.max(next_up(l));
        }
        let mut high = stats.max;
        if let Some(u) = upper {
            high = high.min(u);
        }

        if low <= high {
            return Self { low, high };
        }

        // Statistics and interval do not overlap: collapse onto a value
        // that still lies inside the interval
        let point = match (lower, upper) {
            (_, Some(u)) => u,
            (Some(l), None) => next_up(l),
            (None, None) => low,
        };
        Self {
            low: point,
            high: point,
        }
    }
}

/// Fill a bin's sample buffer. Falls back to repeating the lower truncation
/// bound when the statistics cannot parameterise a truncated normal.
pub fn sample_bin<R: Rng + ?Sized>(
    stats: &BinStatistics,
    range: SampleRange,
    n: usize,
    rng: &mut R,
) -> Vec<f64> {
    match TruncatedNormal::new(stats.mean, stats.std, range.low, range.high) {
        Ok(dist) => dist.sample_n(rng, n),
        Err(reason) => {
            warn!(
                %reason,
                mean = stats.mean,
                std = stats.std,
                low = range.low,
                high = range.high,
                "Truncated normal sampling failed, filling bin with its lower bound"
            );
            vec![range.low; n]
        }
    }
}

/// Snapshot of one cache's position
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheState {
    /// Index of the next value to hand out
    pub cursor: usize,
    /// Number of times the cache has been filled
    pub refills: usize,
    /// Number of values currently buffered
    pub len: usize,
}

/// Fixed-capacity buffer of precomputed inverse samples for one bin
#[derive(Debug, Clone)]
pub struct InverseSampleCache {
    values: Vec<f64>,
    cursor: usize,
    refills: usize,
}

impl InverseSampleCache {
    /// Create an empty (exhausted) cache
    pub fn new(capacity: usize) -> Self {
        Self {
            values: Vec::with_capacity(capacity),
            cursor: 0,
            refills: 0,
        }
    }

    /// True once every buffered value has been handed out
    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.values.len()
    }

    /// Replace the buffer and rewind
    pub fn refill(&mut self, values: Vec<f64>) {
        self.values = values;
        self.cursor = 0;
        self.refills += 1;
    }

    /// Next buffered value, or `None` when exhausted
    pub fn next_value(&mut self) -> Option<f64> {
        let value = self.values.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(value)
    }

    /// Current position
    pub fn state(&self) -> CacheState {
        CacheState {
            cursor: self.cursor,
            refills: self.refills,
            len: self.values.len(),
        }
    }
}

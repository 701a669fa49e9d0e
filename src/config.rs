//! Discretizer configuration

use crate::error::{DiscretizerError, Result};
use serde::{Deserialize, Serialize};

/// Number of values precomputed per bin for inverse sampling
pub const DEFAULT_PRECOMPUTE_SIZE: usize = 10_000;

/// Magnitude that infinite inverse samples are clamped to
pub const DEFAULT_INFINITY_SENTINEL: f64 = 1_000_000.0;

/// Added to every per-bin standard deviation
pub const DEFAULT_STD_FLOOR: f64 = 1e-11;

/// Configuration shared by every binning strategy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiscretizerConfig {
    /// Capacity of each per-bin inverse sample cache
    pub precompute_size: usize,

    /// Replacement magnitude for infinite inverse samples
    pub infinity_sentinel: f64,

    /// Offset added to each bin's standard deviation
    pub std_floor: f64,

    /// Depth of the entropy decision tree (at most 2^depth bins)
    pub entropy_max_depth: usize,

    /// Split counts tried by the decile strategy, finest first
    pub decile_ladder: Vec<usize>,

    /// Random seed for inverse sampling
    pub random_state: Option<u64>,
}

impl Default for DiscretizerConfig {
    fn default() -> Self {
        Self {
            precompute_size: DEFAULT_PRECOMPUTE_SIZE,
            infinity_sentinel: DEFAULT_INFINITY_SENTINEL,
            std_floor: DEFAULT_STD_FLOOR,
            entropy_max_depth: 3,
            decile_ladder: (3..=10).rev().collect(),
            random_state: None,
        }
    }
}

impl DiscretizerConfig {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method to set the inverse sample cache size
    pub fn with_precompute_size(mut self, size: usize) -> Self {
        self.precompute_size = size;
        self
    }

    /// Builder method to set the infinity sentinel
    pub fn with_infinity_sentinel(mut self, sentinel: f64) -> Self {
        self.infinity_sentinel = sentinel;
        self
    }

    /// Builder method to set the entropy tree depth
    pub fn with_entropy_max_depth(mut self, depth: usize) -> Self {
        self.entropy_max_depth = depth;
        self
    }

    /// Builder method to set the decile retry ladder
    pub fn with_decile_ladder(mut self, ladder: Vec<usize>) -> Self {
        self.decile_ladder = ladder;
        self
    }

    /// Builder method to set the random seed
    pub fn with_random_state(mut self, seed: u64) -> Self {
        self.random_state = Some(seed);
        self
    }

    /// Check that every value is usable
    pub fn validate(&self) -> Result<()> {
        if self.precompute_size == 0 {
            return Err(DiscretizerError::ConfigError(
                "precompute_size must be at least 1".to_string(),
            ));
        }
        if !(self.std_floor > 0.0 && self.std_floor.is_finite()) {
            return Err(DiscretizerError::ConfigError(format!(
                "std_floor must be a positive finite number, got {}",
                self.std_floor
            )));
        }
        if !(self.infinity_sentinel.is_finite() && self.infinity_sentinel > 0.0) {
            return Err(DiscretizerError::ConfigError(format!(
                "infinity_sentinel must be a positive finite number, got {}",
                self.infinity_sentinel
            )));
        }
        if self.entropy_max_depth == 0 {
            return Err(DiscretizerError::ConfigError(
                "entropy_max_depth must be at least 1".to_string(),
            ));
        }
        if self.decile_ladder.is_empty() {
            return Err(DiscretizerError::ConfigError(
                "decile_ladder must contain at least one split count".to_string(),
            ));
        }
        if let Some(&bad) = self.decile_ladder.iter().find(|&&n| n < 2) {
            return Err(DiscretizerError::ConfigError(format!(
                "decile_ladder split counts must be at least 2, got {}",
                bad
            )));
        }
        Ok(())
    }
}

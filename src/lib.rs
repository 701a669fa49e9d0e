//! LIME Discretize - reversible discretization for local explanations
//!
//! Continuous features are mapped to a handful of bins so that perturbation
//! based explainers can reason about "which interval a value falls in", and
//! bin indices are mapped back to realistic continuous values by sampling a
//! truncated normal fitted to each bin.
//!
//! # Modules
//!
//! - [`discretizer`] - Fitted discretizer, binning strategies, inverse sampling
//! - [`training`] - Decision tree used by the entropy strategy
//! - [`config`] - Tunable constants
//! - [`utils`] - NaN-aware summary statistics
//! - [`error`] - Error type shared by all modules

// Core error handling
pub mod error;
pub mod config;

// Discretization
pub mod discretizer;
pub mod training;

// Utilities
pub mod utils;

pub use error::{DiscretizerError, Result};

/// Re-export commonly used types
pub mod prelude {
    // Error handling
    pub use crate::error::{DiscretizerError, Result};

    // Configuration
    pub use crate::config::DiscretizerConfig;

    // Discretization
    pub use crate::discretizer::{
        BinStatistics, BinningStrategy, DataStats, Discretizer, DiscretizerBuilder, Strategy,
    };
}

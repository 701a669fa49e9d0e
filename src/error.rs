//! Error types for the discretizer

use thiserror::Error;

/// Result type alias for discretizer operations
pub type Result<T> = std::result::Result<T, DiscretizerError>;

/// Main error type for discretizer construction and use
#[derive(Error, Debug)]
pub enum DiscretizerError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Invalid shape: expected {expected}, got {actual}")]
    ShapeError { expected: String, actual: String },

    #[error("Invalid parameter: {name} = {value}, {reason}")]
    InvalidParameter {
        name: String,
        value: String,
        reason: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid bin {value} for feature {feature}: expected an index in 0..={max_bin}")]
    InvalidBin {
        feature: usize,
        value: f64,
        max_bin: usize,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(String),
}

impl From<serde_json::Error> for DiscretizerError {
    fn from(err: serde_json::Error) -> Self {
        DiscretizerError::SerializationError(err.to_string())
    }
}

impl From<ndarray::ShapeError> for DiscretizerError {
    fn from(err: ndarray::ShapeError) -> Self {
        DiscretizerError::ShapeError {
            expected: "valid shape".to_string(),
            actual: err.to_string(),
        }
    }
}

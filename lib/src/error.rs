//! Error types shared by every stage of the stress pipeline.

use std::path::{Path, PathBuf};

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, StressError>;

/// Error type for scaling, splitting, training, evaluation and persistence.
#[derive(Debug, thiserror::Error)]
pub enum StressError {
    /// Fit, split or evaluation called on zero rows.
    #[error("Empty dataset: {0}")]
    EmptyDataset(String),
    /// Transform requested before a scaler was fitted or loaded.
    #[error("Scaler used before it was fitted or loaded")]
    UninitializedScaler,
    /// Prediction requested before a model was trained or loaded.
    #[error("Model used before it was trained or loaded")]
    UninitializedModel,
    /// Input record has the wrong shape or unknown/missing fields.
    #[error("Schema mismatch: expected {expected}, got {got}")]
    SchemaMismatch { expected: String, got: String },
    /// A feature value lies outside its declared range.
    #[error("Feature {feature} = {value} is outside [{min}, {max}]")]
    FeatureOutOfRange {
        feature: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },
    /// Invalid hyperparameter or ratio.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// Save/load failure; nothing was partially applied.
    #[error("Persistence error at {path}: {reason}")]
    Persistence { path: PathBuf, reason: String },
    /// Malformed CSV input.
    #[error("CSV error: {0}")]
    Csv(String),
    /// Malformed configuration file.
    #[error("Config error: {0}")]
    Config(String),
}

impl StressError {
    pub(crate) fn schema(expected: impl Into<String>, got: impl Into<String>) -> Self {
        StressError::SchemaMismatch {
            expected: expected.into(),
            got: got.into(),
        }
    }

    pub(crate) fn persistence(path: &Path, reason: impl ToString) -> Self {
        StressError::Persistence {
            path: path.to_path_buf(),
            reason: reason.to_string(),
        }
    }
}

impl From<std::io::Error> for StressError {
    fn from(err: std::io::Error) -> Self {
        StressError::Persistence {
            path: PathBuf::new(),
            reason: err.to_string(),
        }
    }
}

impl From<bincode::Error> for StressError {
    fn from(err: bincode::Error) -> Self {
        StressError::Persistence {
            path: PathBuf::new(),
            reason: format!("serialization failed: {err}"),
        }
    }
}

impl From<csv::Error> for StressError {
    fn from(err: csv::Error) -> Self {
        StressError::Csv(err.to_string())
    }
}

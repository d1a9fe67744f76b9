//! TOML configuration for a training run.
//!
//! ```toml
//! [data]
//! path = "data/StressLevelDataset.csv"
//! label_column = "stress_level"
//!
//! [split]
//! train = 0.70
//! validation = 0.15
//! test = 0.15
//! seed = 42
//!
//! [boosting]
//! iterations = 1000
//! learning_rate = 0.03
//!
//! [training]
//! cv_folds = 5          # 0 skips cross-validation
//! use_validation = true
//! artifact_path = "stress_pipeline.bin"
//! ```
//!
//! Every section and key is optional.

use crate::dataset::{SplitRatios, DEFAULT_LABEL_COLUMN, DEFAULT_SPLIT_SEED};
use crate::error::{Result, StressError};
use crate::model::BoostingParams;
use crate::pipeline::TrainingPlan;
use crate::trainer::DEFAULT_CV_FOLDS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

pub const DEFAULT_DATA_PATH: &str = "data/StressLevelDataset.csv";
pub const DEFAULT_ARTIFACT_PATH: &str = "stress_pipeline.bin";

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StressConfig {
    pub data: DataConfig,
    pub split: SplitConfig,
    pub boosting: BoostingParams,
    pub training: TrainingConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DataConfig {
    pub path: PathBuf,
    pub label_column: String,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DATA_PATH),
            label_column: DEFAULT_LABEL_COLUMN.to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SplitConfig {
    pub train: f64,
    pub validation: f64,
    pub test: f64,
    pub seed: u64,
}

impl Default for SplitConfig {
    fn default() -> Self {
        let ratios = SplitRatios::default();
        Self {
            train: ratios.train,
            validation: ratios.validation,
            test: ratios.test,
            seed: DEFAULT_SPLIT_SEED,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TrainingConfig {
    pub cv_folds: usize,
    pub use_validation: bool,
    pub artifact_path: PathBuf,
}

impl Default for TrainingConfig {
    fn default() -> Self {
        Self {
            cv_folds: DEFAULT_CV_FOLDS,
            use_validation: true,
            artifact_path: PathBuf::from(DEFAULT_ARTIFACT_PATH),
        }
    }
}

impl StressConfig {
    /// Read and validate a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .map_err(|e| StressError::Config(format!("failed to read {}: {e}", path.display())))?;
        let config = Self::from_toml_str(&text)
            .map_err(|e| StressError::Config(format!("{}: {e}", path.display())))?;
        tracing::info!(path = %path.display(), "loaded config");
        Ok(config)
    }

    /// `path` if it exists, otherwise the defaults.
    pub fn load_or_default<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if path.exists() {
            Self::load(path)
        } else {
            tracing::debug!(path = %path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).map_err(|e| StressError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| StressError::Config(e.to_string()))
    }

    pub fn validate(&self) -> Result<()> {
        let config_err = |e: StressError| StressError::Config(e.to_string());
        self.split_ratios().validate().map_err(config_err)?;
        self.boosting.validate().map_err(config_err)?;
        if self.training.cv_folds == 1 {
            return Err(StressError::Config(
                "training.cv_folds must be 0 (disabled) or at least 2".to_string(),
            ));
        }
        if self.data.label_column.is_empty() {
            return Err(StressError::Config(
                "data.label_column must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    pub fn split_ratios(&self) -> SplitRatios {
        SplitRatios {
            train: self.split.train,
            validation: self.split.validation,
            test: self.split.test,
        }
    }

    pub fn training_plan(&self) -> TrainingPlan {
        TrainingPlan {
            split: self.split_ratios(),
            split_seed: self.split.seed,
            boosting: self.boosting.clone(),
            cv_folds: (self.training.cv_folds > 0).then_some(self.training.cv_folds),
            use_validation: self.training.use_validation,
        }
    }
}

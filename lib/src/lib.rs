//! # stressmeter
//!
//! Student stress estimation from a 20-question survey: standardize the
//! answers, score them with a gradient-boosted tree ensemble and map the
//! continuous score onto low, mid or high.
//!
//! ## Core Design Principles
//!
//! - **Training/Inference Separation**: unfitted components hold
//!   hyperparameters, fitted ones hold learned state only
//!   ([`Transformer`](preprocessing::Transformer) vs
//!   [`FittedTransformer`](preprocessing::FittedTransformer),
//!   [`TrainableModel`](model::TrainableModel) vs
//!   [`InferenceModel`](model::InferenceModel)).
//! - **One pipeline per training run**: the scaler and the model are saved,
//!   loaded and swapped together as a [`Pipeline`], identified by a content
//!   hash ([`RunId`]).
//! - **Reproducibility**: every random choice (split, row subsampling) is
//!   driven by an explicit seed.
//!
//! ## Quick Start
//!
//! ```rust
//! use stressmeter::dataset::synthetic_survey;
//! use stressmeter::model::BoostingParams;
//! use stressmeter::{FeatureVector, Pipeline, TrainingPlan};
//!
//! let dataset = synthetic_survey(200, 42);
//! let plan = TrainingPlan {
//!     boosting: BoostingParams { iterations: 50, ..Default::default() },
//!     cv_folds: None,
//!     ..Default::default()
//! };
//! let trained = Pipeline::train(&dataset, &plan).unwrap();
//!
//! let prediction = trained.pipeline.predict(&FeatureVector::zeros()).unwrap();
//! println!("{} ({:.3})", prediction.category, prediction.score);
//! ```
//!
//! ## Module Structure
//!
//! - `features` - the fixed 20-field vocabulary and answer mapping
//! - `dataset` - labeled rows, CSV loading, splitting and k-fold indices
//! - `preprocessing` - the standard scaler
//! - `model` - gradient-boosted oblivious trees
//! - `trainer` - early-stopped fitting and cross-validation
//! - `metrics` - regression and category metrics, feature importance
//! - `category` - score thresholds
//! - `pipeline` - the persisted scaler + model value
//! - `serving` - atomic pipeline replacement for a serving process
//! - `config` - TOML configuration of a training run

pub mod category;
pub mod config;

/// Labeled survey data, CSV loading and splitting.
pub mod dataset;

pub mod error;
pub mod features;
pub mod metrics;

/// Regression models with compile-time separation of training and inference.
pub mod model;

pub mod pipeline;

/// Data preprocessing transformers.
pub mod preprocessing;

/// Parameter persistence.
pub mod serialization;

pub mod serving;

/// Training orchestration.
pub mod trainer;

pub use category::{categorize, StressCategory};
pub use config::StressConfig;
pub use error::{Result, StressError};
pub use features::{AnswerMapper, Feature, FeatureVector, MissingAnswerPolicy};
pub use metrics::EvaluationReport;
pub use pipeline::{Pipeline, Prediction, RunId, TrainingPlan};
pub use serving::PipelineSlot;

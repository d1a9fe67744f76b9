//! Regression models with a strict split between training and inference.
//!
//! - [`TrainableModel`]: hyperparameters only; `fit` consumes data and returns
//!   the fitted type.
//! - [`InferenceModel`]: learned state only; predicts and serializes.
//!
//! A fitted model carries no optimizer state or training data, so it can be
//! shared read-only across threads once built. Any tree ensemble that
//! implements both traits can replace [`gbdt`] without touching the trainer,
//! evaluator or pipeline.

pub mod gbdt;

pub use gbdt::{
    BoostingParams, FittedGbdt, GbdtModelParams, GbdtRegressor, ObliviousTree, Split,
};

use crate::category::{categorize, StressCategory};
use crate::error::Result;
use crate::serialization::{self, SerializableParams};
use ndarray::{Array1, ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Held-out data used to decide when boosting stops.
#[derive(Clone, Copy, Debug)]
pub struct EvalSet<'a> {
    pub features: ArrayView2<'a, f64>,
    pub labels: ArrayView1<'a, f64>,
}

/// What happened during one `fit` call.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingReport {
    /// Boosting rounds actually executed.
    pub rounds_run: usize,
    /// Rounds kept in the fitted ensemble.
    pub rounds_kept: usize,
    /// Zero-based round with the best validation RMSE, if a validation set was given.
    pub best_round: Option<usize>,
    pub best_validation_rmse: Option<f64>,
    /// True when the patience window ran out before the round budget.
    pub stopped_early: bool,
    /// RMSE of the kept ensemble on the training rows.
    pub train_rmse: f64,
}

/// Unfitted model: learns from a feature matrix and continuous labels.
pub trait TrainableModel {
    type Fitted: InferenceModel;

    /// Fit on `(features, labels)`.
    ///
    /// With `validation`, training stops once the validation error stops
    /// improving; without it the full round budget runs.
    fn fit(
        &self,
        features: ArrayView2<'_, f64>,
        labels: ArrayView1<'_, f64>,
        validation: Option<EvalSet<'_>>,
    ) -> Result<(Self::Fitted, TrainingReport)>;
}

/// Fitted model used for scoring and persistence.
pub trait InferenceModel: Sized {
    type Params: SerializableParams;

    /// Continuous score for one row.
    fn predict(&self, row: ArrayView1<'_, f64>) -> Result<f64>;

    /// One score per row, in row order.
    fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Array1<f64>>;

    fn n_features_in(&self) -> usize;

    /// Relative contribution of each input column, as percentages summing
    /// to 100 (all zeros if the model never split).
    fn feature_importance(&self) -> Vec<f64>;

    fn extract_params(&self) -> Self::Params;

    fn from_params(params: Self::Params) -> Result<Self>;

    fn predict_category(&self, row: ArrayView1<'_, f64>) -> Result<StressCategory> {
        self.predict(row).map(categorize)
    }

    fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        serialization::save_params(&self.extract_params(), path)?;
        tracing::info!(path = %path.display(), "saved model");
        Ok(())
    }

    fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let params = serialization::load_params::<Self::Params>(path)?;
        let model = Self::from_params(params)?;
        tracing::info!(path = %path.display(), "loaded model");
        Ok(model)
    }
}

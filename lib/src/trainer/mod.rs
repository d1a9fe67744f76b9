//! Training orchestration: fit with optional early stopping and k-fold
//! cross-validation.

use crate::dataset::{KFold, LabeledDataset};
use crate::error::{Result, StressError};
use crate::metrics::Metrics;
use crate::model::{EvalSet, InferenceModel, TrainableModel, TrainingReport};
use serde::{Deserialize, Serialize};

pub const DEFAULT_CV_FOLDS: usize = 5;

/// Mean and spread of held-out RMSE across folds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CvScore {
    pub mean_rmse: f64,
    /// Population standard deviation of `fold_rmse`.
    pub std_rmse: f64,
    pub fold_rmse: Vec<f64>,
}

/// Runs a [`TrainableModel`] over datasets.
///
/// Once built via [`TrainerBuilder`] it is immutable and can fit any number
/// of models with the same settings.
#[derive(Clone, Debug)]
pub struct Trainer<M: TrainableModel> {
    model: M,
    cv_folds: usize,
    use_validation: bool,
}

/// Fluent builder for [`Trainer`].
///
/// Defaults:
/// - `cv_folds`: 5
/// - `use_validation`: true
#[derive(Clone, Debug)]
pub struct TrainerBuilder<M: TrainableModel> {
    model: M,
    cv_folds: usize,
    use_validation: bool,
}

impl<M: TrainableModel> TrainerBuilder<M> {
    pub fn new(model: M) -> Self {
        Self {
            model,
            cv_folds: DEFAULT_CV_FOLDS,
            use_validation: true,
        }
    }

    pub fn cv_folds(mut self, folds: usize) -> Self {
        self.cv_folds = folds;
        self
    }

    /// When `false`, `fit` ignores any validation set and runs the full
    /// round budget.
    pub fn use_validation(mut self, use_validation: bool) -> Self {
        self.use_validation = use_validation;
        self
    }

    pub fn build(self) -> Result<Trainer<M>> {
        // Fail on the builder rather than halfway through a CV run.
        KFold::new(self.cv_folds)?;
        Ok(Trainer {
            model: self.model,
            cv_folds: self.cv_folds,
            use_validation: self.use_validation,
        })
    }
}

impl<M: TrainableModel> Trainer<M> {
    pub fn builder(model: M) -> TrainerBuilder<M> {
        TrainerBuilder::new(model)
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn cv_folds(&self) -> usize {
        self.cv_folds
    }

    /// Fit on `train`, stopping early against `validation` when one is
    /// given, non-empty and validation is enabled.
    pub fn fit(
        &self,
        train: &LabeledDataset,
        validation: Option<&LabeledDataset>,
    ) -> Result<(M::Fitted, TrainingReport)> {
        if train.is_empty() {
            return Err(StressError::EmptyDataset(
                "training partition has no rows".to_string(),
            ));
        }
        let eval = match validation {
            Some(v) if self.use_validation && !v.is_empty() => Some(EvalSet {
                features: v.features(),
                labels: v.labels(),
            }),
            Some(_) if self.use_validation => {
                tracing::warn!("validation partition is empty, training without early stopping");
                None
            }
            _ => None,
        };
        self.model.fit(train.features(), train.labels(), eval)
    }

    /// k-fold cross-validation over contiguous, unshuffled folds.
    ///
    /// Each fold trains a fresh model on the remaining rows without early
    /// stopping and scores RMSE on the held-out rows.
    pub fn cross_validate(&self, dataset: &LabeledDataset) -> Result<CvScore> {
        if dataset.is_empty() {
            return Err(StressError::EmptyDataset(
                "cannot cross-validate on zero rows".to_string(),
            ));
        }
        let folds = KFold::new(self.cv_folds)?.splits(dataset.len())?;

        let mut fold_rmse = Vec::with_capacity(folds.len());
        for (fold, (train_idx, test_idx)) in folds.iter().enumerate() {
            let train = dataset.select(train_idx);
            let test = dataset.select(test_idx);
            let (fitted, _) = self.model.fit(train.features(), train.labels(), None)?;
            let predictions = fitted.predict_batch(test.features())?;
            let rmse = Metrics::rmse(&test.labels().to_vec(), &predictions.to_vec());
            tracing::debug!(fold, rows = test.len(), rmse, "cross-validation fold");
            fold_rmse.push(rmse);
        }

        let k = fold_rmse.len() as f64;
        let mean_rmse = fold_rmse.iter().sum::<f64>() / k;
        let std_rmse = (fold_rmse
            .iter()
            .map(|r| (r - mean_rmse).powi(2))
            .sum::<f64>()
            / k)
            .sqrt();
        tracing::info!(folds = fold_rmse.len(), mean_rmse, std_rmse, "cross-validation finished");

        Ok(CvScore {
            mean_rmse,
            std_rmse,
            fold_rmse,
        })
    }
}

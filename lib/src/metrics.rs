//! Regression and category metrics for the stress model.

use crate::category::categorize;
use crate::error::{Result, StressError};
use crate::features::{Feature, N_FEATURES};
use crate::model::InferenceModel;
use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stateless metric functions over paired truth/prediction slices.
///
/// Every function panics if the slices differ in length and returns 0.0 for
/// empty input; [`evaluate`] checks both before calling them.
pub struct Metrics;

impl Metrics {
    /// MSE = mean((y_true - y_pred)^2)
    pub fn mse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return 0.0;
        }
        let sum_sq: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        sum_sq / y_true.len() as f64
    }

    pub fn rmse(y_true: &[f64], y_pred: &[f64]) -> f64 {
        Self::mse(y_true, y_pred).sqrt()
    }

    /// MAE = mean(|y_true - y_pred|)
    pub fn mae(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return 0.0;
        }
        let sum_abs: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (t - p).abs())
            .sum();
        sum_abs / y_true.len() as f64
    }

    /// R² = 1 - SS_res / SS_tot
    ///
    /// With constant truth (SS_tot = 0) this is 1.0 for an exact fit and 0.0
    /// otherwise. Can be negative for a model worse than predicting the mean.
    pub fn r_squared(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return 0.0;
        }
        let mean_true = y_true.iter().sum::<f64>() / y_true.len() as f64;
        let ss_res: f64 = y_true
            .iter()
            .zip(y_pred)
            .map(|(&t, &p)| (t - p).powi(2))
            .sum();
        let ss_tot: f64 = y_true.iter().map(|&t| (t - mean_true).powi(2)).sum();

        if ss_tot == 0.0 {
            return if ss_res == 0.0 { 1.0 } else { 0.0 };
        }
        1.0 - ss_res / ss_tot
    }

    /// Percentage of rows whose predicted category equals the category of
    /// the true label.
    pub fn classification_accuracy(y_true: &[f64], y_pred: &[f64]) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return 0.0;
        }
        let hits = y_true
            .iter()
            .zip(y_pred)
            .filter(|(&t, &p)| categorize(t) == categorize(p))
            .count();
        hits as f64 * 100.0 / y_true.len() as f64
    }

    /// Percentage of rows with `|y_true - y_pred| <= tolerance`.
    pub fn accuracy_within(y_true: &[f64], y_pred: &[f64], tolerance: f64) -> f64 {
        assert_eq!(y_true.len(), y_pred.len(), "Arrays must have the same length");
        if y_true.is_empty() {
            return 0.0;
        }
        let hits = y_true
            .iter()
            .zip(y_pred)
            .filter(|(&t, &p)| (t - p).abs() <= tolerance)
            .count();
        hits as f64 * 100.0 / y_true.len() as f64
    }

    pub fn calculate_all(y_true: &[f64], y_pred: &[f64]) -> RegressionMetrics {
        RegressionMetrics {
            mse: Self::mse(y_true, y_pred),
            rmse: Self::rmse(y_true, y_pred),
            mae: Self::mae(y_true, y_pred),
            r_squared: Self::r_squared(y_true, y_pred),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RegressionMetrics {
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r_squared: f64,
}

/// Share of the model's total split gain attributed to one feature.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub feature: Feature,
    /// Percentage; all entries of a report sum to 100 unless every one is 0.
    pub importance: f64,
}

/// Held-out quality of a trained model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub n_samples: usize,
    pub mse: f64,
    pub rmse: f64,
    pub mae: f64,
    pub r2: f64,
    /// Percent of rows landing in the correct category.
    pub classification_accuracy: f64,
    /// Percent of rows within 0.5 of the true level.
    pub within_0_5: f64,
    /// Percent of rows within 0.3 of the true level.
    pub within_0_3: f64,
    /// Sorted by importance, highest first; ties keep feature order.
    pub feature_importance: Vec<FeatureImportance>,
}

impl EvaluationReport {
    /// The `n` most important features.
    pub fn top(&self, n: usize) -> &[FeatureImportance] {
        &self.feature_importance[..n.min(self.feature_importance.len())]
    }
}

impl fmt::Display for EvaluationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Test set ({} samples):", self.n_samples)?;
        writeln!(f, "  MSE:  {:.4}", self.mse)?;
        writeln!(f, "  RMSE: {:.4}", self.rmse)?;
        writeln!(f, "  MAE:  {:.4}", self.mae)?;
        writeln!(f, "  R2:   {:.4}", self.r2)?;
        writeln!(f, "Classification accuracy: {:.2}%", self.classification_accuracy)?;
        writeln!(f, "Within 0.5 levels: {:.2}%", self.within_0_5)?;
        write!(f, "Within 0.3 levels: {:.2}%", self.within_0_3)
    }
}

/// Rank the model's per-column importance against the feature vocabulary.
pub fn ranked_importance(raw: &[f64]) -> Result<Vec<FeatureImportance>> {
    if raw.len() != N_FEATURES {
        return Err(StressError::schema(
            format!("{N_FEATURES} importance values"),
            format!("{} values", raw.len()),
        ));
    }
    let mut ranked: Vec<FeatureImportance> = Feature::ALL
        .iter()
        .zip(raw)
        .map(|(&feature, &importance)| FeatureImportance {
            feature,
            importance,
        })
        .collect();
    // Stable sort keeps vocabulary order among equal scores.
    ranked.sort_by(|a, b| b.importance.total_cmp(&a.importance));
    Ok(ranked)
}

/// Score `model` on already-scaled `features` against `labels`.
pub fn evaluate<M: InferenceModel>(
    model: &M,
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, f64>,
) -> Result<EvaluationReport> {
    if labels.is_empty() {
        return Err(StressError::EmptyDataset(
            "cannot evaluate on zero rows".to_string(),
        ));
    }
    if features.nrows() != labels.len() {
        return Err(StressError::schema(
            format!("{} labels", features.nrows()),
            format!("{} labels", labels.len()),
        ));
    }

    let predictions = model.predict_batch(features)?.to_vec();
    let truth = labels.to_vec();
    let regression = Metrics::calculate_all(&truth, &predictions);

    let report = EvaluationReport {
        n_samples: truth.len(),
        mse: regression.mse,
        rmse: regression.rmse,
        mae: regression.mae,
        r2: regression.r_squared,
        classification_accuracy: Metrics::classification_accuracy(&truth, &predictions),
        within_0_5: Metrics::accuracy_within(&truth, &predictions, 0.5),
        within_0_3: Metrics::accuracy_within(&truth, &predictions, 0.3),
        feature_importance: ranked_importance(&model.feature_importance())?,
    };
    tracing::info!(
        n_samples = report.n_samples,
        rmse = report.rmse,
        r2 = report.r2,
        accuracy = report.classification_accuracy,
        "evaluation finished"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FittedGbdt, GbdtModelParams};
    use ndarray::{Array1, Array2};

    /// A tree-less model that scores every row at `base_score`.
    fn constant_model(base_score: f64) -> FittedGbdt {
        FittedGbdt::from_params(GbdtModelParams {
            base_score,
            n_features: N_FEATURES,
            trees: Vec::new(),
        })
        .unwrap()
    }

    #[test]
    fn test_mse_perfect() {
        let y = vec![1.0, 2.0, 3.0, 4.0];
        assert_eq!(Metrics::mse(&y, &y), 0.0);
    }

    #[test]
    fn test_mse_error() {
        let y_true = vec![1.0, 2.0, 3.0, 4.0];
        let y_pred = vec![2.0, 3.0, 4.0, 5.0];
        assert!((Metrics::mse(&y_true, &y_pred) - 1.0).abs() < 1e-12);
        assert!((Metrics::rmse(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_mae() {
        let y_true = vec![0.0, 0.0, 0.0, 0.0];
        let y_pred = vec![1.0, -1.0, 2.0, 0.0];
        assert!((Metrics::mae(&y_true, &y_pred) - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_r_squared_perfect() {
        let y = vec![0.0, 1.0, 2.0, 1.0];
        assert_eq!(Metrics::r_squared(&y, &y), 1.0);
    }

    #[test]
    fn test_r_squared_constant_truth() {
        let y_true = vec![2.0, 2.0, 2.0];
        assert_eq!(Metrics::r_squared(&y_true, &[2.0, 2.0, 2.0]), 1.0);
        assert_eq!(Metrics::r_squared(&y_true, &[2.0, 2.0, 2.5]), 0.0);
    }

    #[test]
    fn test_r_squared_worse_than_mean() {
        let y_true = vec![0.0, 2.0];
        let y_pred = vec![2.0, 0.0];
        assert!(Metrics::r_squared(&y_true, &y_pred) < 0.0);
    }

    #[test]
    fn test_classification_accuracy() {
        let y_true = vec![0.0, 1.0, 2.0, 2.0];
        let y_pred = vec![0.5, 1.2, 1.4, 1.0];
        // Low/Low, Mid/Mid, High/High, High/Mid
        assert_eq!(Metrics::classification_accuracy(&y_true, &y_pred), 75.0);
    }

    #[test]
    fn test_accuracy_within_is_inclusive() {
        let y_true = vec![1.0, 1.0, 1.0, 1.0];
        let y_pred = vec![1.5, 0.5, 1.25, 1.75];
        assert_eq!(Metrics::accuracy_within(&y_true, &y_pred, 0.5), 75.0);
        assert_eq!(Metrics::accuracy_within(&y_true, &y_pred, 0.3), 25.0);
    }

    #[test]
    fn test_empty_returns_zero() {
        assert_eq!(Metrics::mse(&[], &[]), 0.0);
        assert_eq!(Metrics::accuracy_within(&[], &[], 0.5), 0.0);
    }

    #[test]
    #[should_panic(expected = "same length")]
    fn test_length_mismatch_panics() {
        let _ = Metrics::mae(&[1.0], &[1.0, 2.0]);
    }

    #[test]
    fn test_ranked_importance_sorted() {
        let mut raw = vec![0.0; N_FEATURES];
        raw[Feature::Depression.index()] = 60.0;
        raw[Feature::AnxietyLevel.index()] = 40.0;
        let ranked = ranked_importance(&raw).unwrap();
        assert_eq!(ranked[0].feature, Feature::Depression);
        assert_eq!(ranked[1].feature, Feature::AnxietyLevel);
        assert_eq!(ranked[2].importance, 0.0);
        assert!(ranked_importance(&raw[..3]).is_err());
    }

    #[test]
    fn test_evaluate_constant_model() {
        let model = constant_model(1.0);
        let x = Array2::<f64>::zeros((4, N_FEATURES));
        let y = Array1::from(vec![0.0, 1.0, 1.0, 2.0]);
        let report = evaluate(&model, x.view(), y.view()).unwrap();
        assert_eq!(report.n_samples, 4);
        assert_eq!(report.mse, 0.5);
        assert_eq!(report.mae, 0.5);
        assert_eq!(report.classification_accuracy, 50.0);
        assert_eq!(report.within_0_5, 50.0);
        assert_eq!(report.feature_importance.len(), N_FEATURES);
    }

    #[test]
    fn test_evaluate_empty_input() {
        let model = constant_model(1.0);
        let x = Array2::<f64>::zeros((0, N_FEATURES));
        let y = Array1::<f64>::zeros(0);
        assert!(matches!(
            evaluate(&model, x.view(), y.view()),
            Err(StressError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_evaluate_label_count_mismatch() {
        let model = constant_model(1.0);
        let x = Array2::<f64>::zeros((3, N_FEATURES));
        let y = Array1::<f64>::zeros(2);
        assert!(matches!(
            evaluate(&model, x.view(), y.view()),
            Err(StressError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_evaluate_wrong_column_count() {
        let model = constant_model(1.0);
        let x = Array2::<f64>::zeros((3, N_FEATURES - 2));
        let y = Array1::<f64>::zeros(3);
        assert!(matches!(
            evaluate(&model, x.view(), y.view()),
            Err(StressError::SchemaMismatch { .. })
        ));
    }
}

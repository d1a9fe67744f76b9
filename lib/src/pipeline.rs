//! The trained stress pipeline: scaler, model and training-run id as one value.
//!
//! A [`Pipeline`] is immutable. It is produced by [`Pipeline::train`] or
//! [`Pipeline::load`] and can be shared read-only across threads. The scaler
//! and the model inside always come from the same training run: the run id
//! is a blake3 digest of both serialized components and is checked again on
//! every load.

use crate::category::StressCategory;
use crate::dataset::{LabeledDataset, SplitRatios, DEFAULT_SPLIT_SEED};
use crate::error::{Result, StressError};
use crate::features::{FeatureVector, N_FEATURES};
use crate::metrics::{self, EvaluationReport};
use crate::model::{
    BoostingParams, FittedGbdt, GbdtModelParams, GbdtRegressor, InferenceModel, TrainingReport,
};
use crate::preprocessing::{
    FittedStandardScaler, FittedTransformer, StandardScaler, StandardScalerParams, Transformer,
};
use crate::serialization::{self, SerializableParams};
use crate::trainer::{CvScore, Trainer, DEFAULT_CV_FOLDS};
use ndarray::{Array1, ArrayView2};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;

/// First bytes of every pipeline artifact.
pub const ARTIFACT_MAGIC: [u8; 8] = *b"STRSPIPE";
/// Bumped whenever the artifact layout changes.
pub const FORMAT_VERSION: u32 = 1;

/// Content address of one training run.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RunId([u8; 32]);

impl RunId {
    fn of(scaler_bytes: &[u8], model_bytes: &[u8]) -> Self {
        let mut hasher = blake3::Hasher::new();
        hasher.update(&(scaler_bytes.len() as u64).to_le_bytes());
        hasher.update(scaler_bytes);
        hasher.update(model_bytes);
        Self(*hasher.finalize().as_bytes())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }

    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First 12 hex digits, for log lines.
    pub fn short(&self) -> String {
        self.to_hex()[..12].to_string()
    }
}

impl fmt::Display for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for RunId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RunId({})", self.short())
    }
}

/// Score and category for one survey response.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub score: f64,
    pub category: StressCategory,
}

impl Prediction {
    fn from_score(score: f64) -> Self {
        Self {
            score,
            category: crate::category::categorize(score),
        }
    }
}

/// Everything that controls one training run.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingPlan {
    pub split: SplitRatios,
    pub split_seed: u64,
    pub boosting: BoostingParams,
    /// Folds for cross-validation on the training partition; `None` skips it.
    pub cv_folds: Option<usize>,
    /// Stop early against the validation partition.
    pub use_validation: bool,
}

impl Default for TrainingPlan {
    fn default() -> Self {
        Self {
            split: SplitRatios::default(),
            split_seed: DEFAULT_SPLIT_SEED,
            boosting: BoostingParams::default(),
            cv_folds: Some(DEFAULT_CV_FOLDS),
            use_validation: true,
        }
    }
}

impl TrainingPlan {
    /// The raw test rows [`Pipeline::train`] held out for this plan.
    ///
    /// The split permutation depends only on the row count and the seed, so
    /// reloading the same dataset reproduces the training-time test rows.
    pub fn test_partition(&self, dataset: &LabeledDataset) -> Result<LabeledDataset> {
        Ok(dataset.split(self.split, self.split_seed)?.test)
    }
}

/// What [`Pipeline::train`] learned about the run besides the pipeline itself.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingSummary {
    pub n_train: usize,
    pub n_validation: usize,
    pub n_test: usize,
    pub cv: Option<CvScore>,
    pub training: TrainingReport,
    /// `None` when the test partition is empty.
    pub test: Option<EvaluationReport>,
}

#[derive(Clone, Debug)]
pub struct TrainedPipeline {
    pub pipeline: Pipeline,
    pub summary: TrainingSummary,
}

/// On-disk body following [`ARTIFACT_MAGIC`].
#[derive(Serialize, Deserialize)]
struct PipelineParams {
    format_version: u32,
    run_id: RunId,
    scaler: Vec<u8>,
    model: Vec<u8>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Pipeline {
    scaler: FittedStandardScaler,
    model: FittedGbdt,
    run_id: RunId,
}

impl Pipeline {
    /// Pair a fitted scaler with a fitted model. Both must take 20 features.
    pub fn new(scaler: FittedStandardScaler, model: FittedGbdt) -> Result<Self> {
        for (what, n) in [
            ("scaler", scaler.n_features_in()),
            ("model", model.n_features_in()),
        ] {
            if n != N_FEATURES {
                return Err(StressError::schema(
                    format!("{what} with {N_FEATURES} features"),
                    format!("{n} features"),
                ));
            }
        }
        let (scaler_bytes, model_bytes) = component_bytes(&scaler, &model)?;
        let run_id = RunId::of(&scaler_bytes, &model_bytes);
        Ok(Self {
            scaler,
            model,
            run_id,
        })
    }

    /// Fit the scaler on every row, split, optionally cross-validate, train
    /// with early stopping and evaluate on the test partition.
    pub fn train(dataset: &LabeledDataset, plan: &TrainingPlan) -> Result<TrainedPipeline> {
        if dataset.is_empty() {
            return Err(StressError::EmptyDataset(
                "cannot train on a dataset with no rows".to_string(),
            ));
        }
        let scaler = StandardScaler::new().fit(dataset.features())?;
        let scaled = dataset.with_features(scaler.transform(dataset.features())?)?;
        let split = scaled.split(plan.split, plan.split_seed)?;

        let trainer = Trainer::builder(GbdtRegressor::with_params(plan.boosting.clone()))
            .cv_folds(plan.cv_folds.unwrap_or(DEFAULT_CV_FOLDS))
            .use_validation(plan.use_validation)
            .build()?;

        let cv = match plan.cv_folds {
            Some(_) => Some(trainer.cross_validate(&split.train)?),
            None => None,
        };
        let (model, training) = trainer.fit(&split.train, Some(&split.validation))?;
        let pipeline = Pipeline::new(scaler, model)?;

        let test = if split.test.is_empty() {
            None
        } else {
            Some(metrics::evaluate(
                &pipeline.model,
                split.test.features(),
                split.test.labels(),
            )?)
        };

        tracing::info!(
            run_id = %pipeline.run_id.short(),
            rounds = training.rounds_kept,
            test_rmse = ?test.as_ref().map(|t| t.rmse),
            "pipeline trained"
        );

        Ok(TrainedPipeline {
            pipeline,
            summary: TrainingSummary {
                n_train: split.train.len(),
                n_validation: split.validation.len(),
                n_test: split.test.len(),
                cv,
                training,
                test,
            },
        })
    }

    pub fn scaler(&self) -> &FittedStandardScaler {
        &self.scaler
    }

    pub fn model(&self) -> &FittedGbdt {
        &self.model
    }

    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// Standardize one raw response with the training-time fit.
    pub fn transform(&self, answers: &FeatureVector) -> Result<Array1<f64>> {
        self.scaler.transform_row(answers)
    }

    pub fn predict_score(&self, answers: &FeatureVector) -> Result<f64> {
        let scaled = self.transform(answers)?;
        self.model.predict(scaled.view())
    }

    pub fn predict(&self, answers: &FeatureVector) -> Result<Prediction> {
        self.predict_score(answers).map(Prediction::from_score)
    }

    /// Predict raw (unscaled) rows in `Feature::ALL` column order.
    pub fn predict_batch(&self, rows: ArrayView2<'_, f64>) -> Result<Vec<Prediction>> {
        let scaled = self.scaler.transform(rows)?;
        Ok(self
            .model
            .predict_batch(scaled.view())?
            .iter()
            .map(|&score| Prediction::from_score(score))
            .collect())
    }

    /// Evaluate on raw (unscaled) labeled rows.
    pub fn evaluate(&self, dataset: &LabeledDataset) -> Result<EvaluationReport> {
        if dataset.is_empty() {
            return Err(StressError::EmptyDataset(
                "cannot evaluate on zero rows".to_string(),
            ));
        }
        let scaled = self.scaler.transform(dataset.features())?;
        metrics::evaluate(&self.model, scaled.view(), dataset.labels())
    }

    /// Write the pipeline as a single artifact. The file is replaced
    /// atomically; a failed save leaves any previous artifact intact.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let (scaler, model) = component_bytes(&self.scaler, &self.model)?;
        let body = PipelineParams {
            format_version: FORMAT_VERSION,
            run_id: self.run_id,
            scaler,
            model,
        }
        .to_bytes()
        .map_err(|e| StressError::persistence(path, e))?;

        let mut bytes = Vec::with_capacity(ARTIFACT_MAGIC.len() + body.len());
        bytes.extend_from_slice(&ARTIFACT_MAGIC);
        bytes.extend_from_slice(&body);
        serialization::write_atomic(path, &bytes)?;
        tracing::info!(path = %path.display(), run_id = %self.run_id.short(), "saved pipeline");
        Ok(())
    }

    /// Read and verify an artifact written by [`Pipeline::save`].
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let bytes = serialization::read_bytes(path)?;
        let body = bytes
            .strip_prefix(&ARTIFACT_MAGIC[..])
            .ok_or_else(|| StressError::persistence(path, "not a stress pipeline artifact"))?;
        let params =
            PipelineParams::from_bytes(body).map_err(|e| StressError::persistence(path, e))?;
        if params.format_version != FORMAT_VERSION {
            return Err(StressError::persistence(
                path,
                format!(
                    "unsupported format version {} (expected {FORMAT_VERSION})",
                    params.format_version
                ),
            ));
        }

        let run_id = RunId::of(&params.scaler, &params.model);
        if run_id != params.run_id {
            return Err(StressError::persistence(
                path,
                format!(
                    "run id mismatch: artifact says {}, content hashes to {}",
                    params.run_id.short(),
                    run_id.short()
                ),
            ));
        }

        let scaler = StandardScalerParams::from_bytes(&params.scaler)
            .and_then(FittedStandardScaler::from_params)
            .map_err(|e| StressError::persistence(path, e))?;
        let model = GbdtModelParams::from_bytes(&params.model)
            .and_then(FittedGbdt::from_params)
            .map_err(|e| StressError::persistence(path, e))?;
        let pipeline =
            Pipeline::new(scaler, model).map_err(|e| StressError::persistence(path, e))?;

        tracing::info!(path = %path.display(), run_id = %pipeline.run_id.short(), "loaded pipeline");
        Ok(pipeline)
    }
}

fn component_bytes(
    scaler: &FittedStandardScaler,
    model: &FittedGbdt,
) -> Result<(Vec<u8>, Vec<u8>)> {
    Ok((
        scaler.extract_params().to_bytes()?,
        model.extract_params().to_bytes()?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::category::categorize;
    use ndarray::{Array1, Array2};

    fn dataset(n: usize) -> LabeledDataset {
        let x = Array2::from_shape_fn((n, N_FEATURES), |(i, j)| ((i * 7 + j * 3) % 6) as f64);
        let y = Array1::from_iter((0..n).map(|i| (((i * 7) % 6) / 2) as f64));
        LabeledDataset::new(x, y).unwrap()
    }

    fn quick_plan() -> TrainingPlan {
        TrainingPlan {
            boosting: BoostingParams {
                iterations: 40,
                depth: 3,
                learning_rate: 0.2,
                ..BoostingParams::default()
            },
            cv_folds: None,
            ..TrainingPlan::default()
        }
    }

    fn trained() -> Pipeline {
        Pipeline::train(&dataset(80), &quick_plan()).unwrap().pipeline
    }

    #[test]
    fn test_train_summary_sizes() {
        let trained = Pipeline::train(&dataset(100), &quick_plan()).unwrap();
        let s = &trained.summary;
        assert_eq!((s.n_train, s.n_validation, s.n_test), (70, 15, 15));
        assert!(s.cv.is_none());
        assert!(s.test.is_some());
        assert!(s.training.best_round.is_some());
    }

    #[test]
    fn test_train_with_cross_validation() {
        let plan = TrainingPlan {
            cv_folds: Some(3),
            ..quick_plan()
        };
        let trained = Pipeline::train(&dataset(60), &plan).unwrap();
        assert_eq!(trained.summary.cv.unwrap().fold_rmse.len(), 3);
    }

    #[test]
    fn test_train_empty_dataset() {
        let empty = dataset(4).select(&[]);
        assert!(matches!(
            Pipeline::train(&empty, &quick_plan()),
            Err(StressError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_predict_matches_manual_path() {
        let pipeline = trained();
        let answers = FeatureVector::new([2.0; N_FEATURES]);
        let scaled = pipeline.scaler().transform_row(&answers).unwrap();
        let score = pipeline.model().predict(scaled.view()).unwrap();
        let prediction = pipeline.predict(&answers).unwrap();
        assert_eq!(prediction.score.to_bits(), score.to_bits());
        assert_eq!(prediction.category, categorize(score));
    }

    #[test]
    fn test_predict_batch_matches_single() {
        let pipeline = trained();
        let rows = dataset(5).features().to_owned();
        let batch = pipeline.predict_batch(rows.view()).unwrap();
        for (row, prediction) in rows.rows().into_iter().zip(&batch) {
            let answers = FeatureVector::from_slice(row.as_slice().unwrap()).unwrap();
            assert_eq!(pipeline.predict(&answers).unwrap(), *prediction);
        }
    }

    #[test]
    fn test_run_id_tracks_content() {
        let a = trained();
        let b = trained();
        assert_eq!(a.run_id(), b.run_id());

        let other = Pipeline::train(
            &dataset(80),
            &TrainingPlan {
                split_seed: 7,
                ..quick_plan()
            },
        )
        .unwrap()
        .pipeline;
        assert_ne!(a.run_id(), other.run_id());
        assert_eq!(a.run_id().to_hex().len(), 64);
    }

    #[test]
    fn test_new_rejects_wrong_width() {
        let x = Array2::from_shape_fn((10, 3), |(i, j)| (i + j) as f64);
        let y = Array1::from_iter((0..10).map(|i| i as f64));
        let scaler = StandardScaler::new().fit(x.view()).unwrap();
        let (model, _) = crate::model::TrainableModel::fit(
            &GbdtRegressor::new().iterations(2),
            x.view(),
            y.view(),
            None,
        )
        .unwrap();
        assert!(matches!(
            Pipeline::new(scaler, model),
            Err(StressError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_save_load_round_trip() {
        let pipeline = trained();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.bin");
        pipeline.save(&path).unwrap();

        let loaded = Pipeline::load(&path).unwrap();
        assert_eq!(loaded, pipeline);
        let answers = FeatureVector::new([1.0; N_FEATURES]);
        assert_eq!(
            loaded.predict_score(&answers).unwrap().to_bits(),
            pipeline.predict_score(&answers).unwrap().to_bits()
        );
    }

    #[test]
    fn test_load_rejects_foreign_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("junk.bin");
        std::fs::write(&path, b"definitely not a pipeline").unwrap();
        assert!(matches!(
            Pipeline::load(&path),
            Err(StressError::Persistence { .. })
        ));
    }

    #[test]
    fn test_load_rejects_tampered_model() {
        let pipeline = trained();
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.bin");
        pipeline.save(&path).unwrap();

        let mut bytes = std::fs::read(&path).unwrap();
        let last = bytes.len() - 1;
        bytes[last] ^= 0x01;
        std::fs::write(&path, &bytes).unwrap();

        let err = Pipeline::load(&path).unwrap_err();
        assert!(err.to_string().contains("run id mismatch"), "{err}");
    }

    #[test]
    fn test_evaluate_on_reloaded_test_partition_matches_summary() {
        let data = dataset(120);
        let plan = quick_plan();
        let trained = Pipeline::train(&data, &plan).unwrap();
        let test = plan.test_partition(&data).unwrap();
        assert_eq!(test.len(), trained.summary.n_test);

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pipeline.bin");
        trained.pipeline.save(&path).unwrap();
        let loaded = Pipeline::load(&path).unwrap();

        let report = loaded.evaluate(&test).unwrap();
        assert_eq!(Some(report), trained.summary.test);
    }

    #[test]
    fn test_evaluate_empty_dataset() {
        let empty = dataset(4).select(&[]);
        assert!(matches!(
            trained().evaluate(&empty),
            Err(StressError::EmptyDataset(_))
        ));
    }

    #[test]
    fn test_evaluate_rows_of_wrong_width_never_reach_the_model() {
        let narrow = LabeledDataset::new(Array2::zeros((5, N_FEATURES - 1)), Array1::zeros(5));
        assert!(matches!(narrow, Err(StressError::SchemaMismatch { .. })));

        let pipeline = trained();
        let rows = Array2::<f64>::zeros((5, N_FEATURES + 1));
        assert!(matches!(
            pipeline.predict_batch(rows.view()),
            Err(StressError::SchemaMismatch { .. })
        ));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(Pipeline::load(dir.path().join("absent.bin")).is_err());
    }
}

//! End-to-end behaviour of the stress pipeline on survey-shaped data.

use ndarray::{Array1, Array2, Axis};
use std::collections::HashMap;
use std::path::Path;
use stressmeter::dataset::{synthetic_survey, LabeledDataset, DEFAULT_LABEL_COLUMN};
use stressmeter::features::N_FEATURES;
use stressmeter::metrics;
use stressmeter::model::{BoostingParams, InferenceModel};
use stressmeter::{
    AnswerMapper, Feature, FeatureVector, MissingAnswerPolicy, Pipeline, PipelineSlot,
    StressCategory, StressError, TrainingPlan,
};

fn plan(iterations: usize, cv_folds: Option<usize>) -> TrainingPlan {
    TrainingPlan {
        boosting: BoostingParams {
            iterations,
            learning_rate: 0.1,
            depth: 4,
            early_stopping_rounds: 20,
            ..BoostingParams::default()
        },
        cv_folds,
        ..TrainingPlan::default()
    }
}

fn write_csv(dataset: &LabeledDataset, path: &Path) {
    let mut writer = csv::Writer::from_path(path).unwrap();
    let mut header: Vec<&str> = Feature::ALL.iter().map(|f| f.name()).collect();
    header.push(DEFAULT_LABEL_COLUMN);
    writer.write_record(&header).unwrap();
    for (row, label) in dataset.features().rows().into_iter().zip(dataset.labels()) {
        let mut record: Vec<String> = row.iter().map(|v| v.to_string()).collect();
        record.push(label.to_string());
        writer.write_record(&record).unwrap();
    }
    writer.flush().unwrap();
}

#[test]
fn test_1100_row_survey_from_csv() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("StressLevelDataset.csv");
    write_csv(&synthetic_survey(1100, 42), &path);

    let dataset = LabeledDataset::from_csv(&path, DEFAULT_LABEL_COLUMN).unwrap();
    assert_eq!(dataset.len(), 1100);
    assert!(dataset.labels().iter().all(|&y| (0.0..=2.0).contains(&y)));

    let trained = Pipeline::train(&dataset, &plan(60, Some(5))).unwrap();
    let summary = &trained.summary;
    assert_eq!(summary.n_train, 770);
    assert_eq!(summary.n_validation, 165);
    assert_eq!(summary.n_test, 165);

    let cv = summary.cv.as_ref().unwrap();
    assert_eq!(cv.fold_rmse.len(), 5);
    assert!(cv.mean_rmse > 0.0);
    assert!(cv.std_rmse > 0.0, "folds scored identically: {:?}", cv.fold_rmse);

    let test = summary.test.as_ref().unwrap();
    assert_eq!(test.n_samples, 165);
    assert_eq!(test.feature_importance.len(), N_FEATURES);
    let total: f64 = test.feature_importance.iter().map(|f| f.importance).sum();
    assert!((total - 100.0).abs() < 1e-6);
    assert!(test.top(5).windows(2).all(|w| w[0].importance >= w[1].importance));
}

#[test]
fn test_training_is_deterministic() {
    let dataset = synthetic_survey(300, 5);
    let a = Pipeline::train(&dataset, &plan(40, None)).unwrap().pipeline;
    let b = Pipeline::train(&dataset, &plan(40, None)).unwrap().pipeline;
    assert_eq!(a.run_id(), b.run_id());

    for row in dataset.features().rows().into_iter().take(25) {
        let answers = FeatureVector::from_slice(&row.to_vec()).unwrap();
        assert_eq!(
            a.predict_score(&answers).unwrap().to_bits(),
            b.predict_score(&answers).unwrap().to_bits()
        );
    }
}

#[test]
fn test_all_zero_response_is_reproducible() {
    // A block of all-zero responses labeled low fixes what zeros must score.
    let survey = synthetic_survey(300, 11);
    let zeros_block = Array2::<f64>::zeros((100, N_FEATURES));
    let features = ndarray::concatenate(Axis(0), &[survey.features(), zeros_block.view()]).unwrap();
    let labels =
        ndarray::concatenate(Axis(0), &[survey.labels(), Array1::<f64>::zeros(100).view()]).unwrap();
    let dataset = LabeledDataset::new(features, labels).unwrap();

    let pipeline = Pipeline::train(&dataset, &plan(80, None)).unwrap().pipeline;
    let zeros = FeatureVector::zeros();
    let first = pipeline.predict(&zeros).unwrap();
    assert_eq!(first.category, StressCategory::Low, "score {}", first.score);

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.bin");
    pipeline.save(&path).unwrap();
    let reloaded = Pipeline::load(&path).unwrap();
    let retrained = Pipeline::train(&dataset, &plan(80, None)).unwrap().pipeline;

    for other in [&reloaded, &retrained] {
        let again = other.predict(&zeros).unwrap();
        assert_eq!(again.score.to_bits(), first.score.to_bits());
        assert_eq!(again.category, first.category);
    }
    assert_eq!(first.category, stressmeter::categorize(first.score));
}

#[test]
fn test_persistence_fidelity_over_many_inputs() {
    let dataset = synthetic_survey(250, 3);
    let pipeline = Pipeline::train(&dataset, &plan(30, None)).unwrap().pipeline;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("pipeline.bin");
    std::fs::create_dir_all(path.parent().unwrap()).unwrap();
    pipeline.save(&path).unwrap();
    let loaded = Pipeline::load(&path).unwrap();
    assert_eq!(loaded.run_id(), pipeline.run_id());

    let sample = synthetic_survey(100, 99);
    let original = pipeline.predict_batch(sample.features()).unwrap();
    let restored = loaded.predict_batch(sample.features()).unwrap();
    for (a, b) in original.iter().zip(&restored) {
        assert_eq!(a.score.to_bits(), b.score.to_bits());
    }

    // The model alone round-trips too.
    let model_path = dir.path().join("model.bin");
    pipeline.model().save_to_file(&model_path).unwrap();
    let model = stressmeter::model::FittedGbdt::load_from_file(&model_path).unwrap();
    assert_eq!(&model, pipeline.model());
}

#[test]
fn test_perfect_predictions_score_perfectly() {
    let dataset = synthetic_survey(200, 8);
    let pipeline = Pipeline::train(&dataset, &plan(30, None)).unwrap().pipeline;
    let sample = synthetic_survey(60, 21);
    let scaled = {
        use stressmeter::preprocessing::FittedTransformer;
        pipeline.scaler().transform(sample.features()).unwrap()
    };
    // Labels set to the model's own output.
    let labels: Array1<f64> = pipeline.model().predict_batch(scaled.view()).unwrap();

    let report = metrics::evaluate(pipeline.model(), scaled.view(), labels.view()).unwrap();
    assert_eq!(report.mse, 0.0);
    assert_eq!(report.rmse, 0.0);
    assert_eq!(report.mae, 0.0);
    assert_eq!(report.r2, 1.0);
    assert_eq!(report.classification_accuracy, 100.0);
    assert_eq!(report.within_0_5, 100.0);
    assert_eq!(report.within_0_3, 100.0);
}

#[test]
fn test_scaler_maps_training_mean_to_zero() {
    let dataset = synthetic_survey(150, 4);
    let pipeline = Pipeline::train(&dataset, &plan(10, None)).unwrap().pipeline;
    let mean = dataset.features().mean_axis(ndarray::Axis(0)).unwrap();
    let answers = FeatureVector::from_slice(&mean.to_vec()).unwrap();
    let scaled = pipeline.transform(&answers).unwrap();
    assert!(scaled.iter().all(|&v| v == 0.0), "{scaled:?}");
}

#[test]
fn test_tampered_run_id_is_rejected() {
    let pipeline = Pipeline::train(&synthetic_survey(120, 2), &plan(10, None))
        .unwrap()
        .pipeline;
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pipeline.bin");
    pipeline.save(&path).unwrap();

    // Layout: 8-byte magic, u32 format version, then the 32-byte run id.
    let mut bytes = std::fs::read(&path).unwrap();
    bytes[12] ^= 0xff;
    std::fs::write(&path, &bytes).unwrap();

    match Pipeline::load(&path) {
        Err(StressError::Persistence { reason, .. }) => {
            assert!(reason.contains("run id mismatch"), "{reason}")
        }
        other => panic!("expected a persistence error, got {other:?}"),
    }
}

#[test]
fn test_failed_reload_keeps_serving_pipeline() {
    let pipeline = Pipeline::train(&synthetic_survey(120, 6), &plan(10, None))
        .unwrap()
        .pipeline;
    let dir = tempfile::tempdir().unwrap();
    let good = dir.path().join("good.bin");
    pipeline.save(&good).unwrap();

    let truncated = dir.path().join("truncated.bin");
    let bytes = std::fs::read(&good).unwrap();
    std::fs::write(&truncated, &bytes[..bytes.len() / 2]).unwrap();

    let slot = PipelineSlot::empty();
    let id = slot.load_from(&good).unwrap();
    let before = slot.predict(&FeatureVector::zeros()).unwrap();

    assert!(matches!(
        slot.load_from(&truncated),
        Err(StressError::Persistence { .. })
    ));
    assert_eq!(slot.current().unwrap().run_id(), id);
    assert_eq!(slot.predict(&FeatureVector::zeros()).unwrap(), before);
}

#[test]
fn test_defaulted_answers_are_reported_and_change_nothing_silently() {
    let pipeline = Pipeline::train(&synthetic_survey(150, 12), &plan(20, None))
        .unwrap()
        .pipeline;

    // Only the first five questions answered.
    let answers: HashMap<String, f64> = Feature::ALL[..5]
        .iter()
        .map(|f| (f.question_id(), 3.0))
        .collect();

    let strict = AnswerMapper::new(MissingAnswerPolicy::Reject).map(&answers);
    assert!(matches!(strict, Err(StressError::SchemaMismatch { .. })));

    let mapped = AnswerMapper::new(MissingAnswerPolicy::DefaultToZero)
        .map(&answers)
        .unwrap();
    assert_eq!(mapped.defaulted, Feature::ALL[5..].to_vec());

    let mut explicit = FeatureVector::zeros();
    for feature in &Feature::ALL[..5] {
        explicit.set(*feature, 3.0);
    }
    assert_eq!(mapped.vector, explicit);
    assert_eq!(
        pipeline.predict(&mapped.vector).unwrap(),
        pipeline.predict(&explicit).unwrap()
    );
}

#[test]
fn test_out_of_range_answers_rejected_when_checked() {
    let mut answers: HashMap<String, f64> = Feature::ALL
        .iter()
        .map(|f| (f.question_id(), 1.0))
        .collect();
    answers.insert(Feature::Bullying.question_id(), 9.0);
    let result = AnswerMapper::new(MissingAnswerPolicy::Reject)
        .with_range_check(true)
        .map(&answers);
    assert!(matches!(
        result,
        Err(StressError::FeatureOutOfRange {
            feature: "bullying",
            ..
        })
    ));
}

#[test]
fn test_category_labels_match_thresholds() {
    assert_eq!(stressmeter::categorize(0.66999), StressCategory::Low);
    assert_eq!(stressmeter::categorize(0.67), StressCategory::Mid);
    assert_eq!(stressmeter::categorize(1.32999), StressCategory::Mid);
    assert_eq!(stressmeter::categorize(1.33), StressCategory::High);
}

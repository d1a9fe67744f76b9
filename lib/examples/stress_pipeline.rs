//! End-to-end stress pipeline on a synthetic survey.
//!
//! This example walks the full workflow:
//! - Generate a labeled survey dataset
//! - Fit the scaler, split 70/15/15 and cross-validate
//! - Train with early stopping and evaluate on the test split
//! - Save the pipeline, load it back and score a new response
//!
//! Run with: cargo run --example stress_pipeline

use std::collections::HashMap;
use std::error::Error;
use stressmeter::dataset::synthetic_survey;
use stressmeter::model::BoostingParams;
use stressmeter::{AnswerMapper, Feature, MissingAnswerPolicy, Pipeline, TrainingPlan};

fn main() -> Result<(), Box<dyn Error>> {
    println!("=== Student Stress Pipeline ===\n");

    // 1. Data
    let dataset = synthetic_survey(1100, 42);
    println!("Generated {} survey responses", dataset.len());

    // 2. Train
    let plan = TrainingPlan {
        boosting: BoostingParams {
            iterations: 300,
            learning_rate: 0.05,
            ..BoostingParams::default()
        },
        ..TrainingPlan::default()
    };
    let trained = Pipeline::train(&dataset, &plan)?;
    let summary = &trained.summary;
    println!(
        "Split: {} train / {} validation / {} test",
        summary.n_train, summary.n_validation, summary.n_test
    );
    if let Some(cv) = &summary.cv {
        println!(
            "Cross-validation RMSE: {:.4} (std {:.4})",
            cv.mean_rmse,
            cv.std_rmse
        );
    }
    println!(
        "Boosting: kept {} of {} rounds (best validation RMSE {:?})",
        summary.training.rounds_kept, summary.training.rounds_run, summary.training.best_validation_rmse
    );

    // 3. Evaluate
    if let Some(report) = &summary.test {
        println!("\n{report}");
        println!("\nTop 5 most important features:");
        for entry in report.top(5) {
            println!("  {:<30} {:>6.2}%", entry.feature.name(), entry.importance);
        }
    }

    // 4. Persist
    let dir = std::env::temp_dir().join("stressmeter-example");
    std::fs::create_dir_all(&dir)?;
    let path = dir.join("stress_pipeline.bin");
    trained.pipeline.save(&path)?;
    let pipeline = Pipeline::load(&path)?;
    println!("\nSaved and reloaded pipeline {}", pipeline.run_id().short());

    // 5. Score a questionnaire with two unanswered questions
    let mut answers: HashMap<String, f64> = Feature::ALL
        .iter()
        .map(|f| (f.question_id(), (f.range().max / 2.0).floor()))
        .collect();
    answers.remove("q7");
    answers.remove("q12");

    let mapped = AnswerMapper::new(MissingAnswerPolicy::DefaultToZero).map(&answers)?;
    if !mapped.defaulted.is_empty() {
        let names: Vec<&str> = mapped.defaulted.iter().map(|f| f.name()).collect();
        println!("Defaulted to 0: {}", names.join(", "));
    }
    let prediction = pipeline.predict(&mapped.vector)?;
    println!(
        "Predicted stress: {} (score {:.3}) - {}",
        prediction.category,
        prediction.score,
        prediction.category.description()
    );

    Ok(())
}

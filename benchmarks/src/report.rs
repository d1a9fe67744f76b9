//! Console and JSON rendering of a training run.

use anyhow::Context;
use std::fmt::Write as _;
use std::path::Path;
use stressmeter::pipeline::TrainingSummary;
use stressmeter::{EvaluationReport, Prediction, RunId};

/// Human-readable summary, listing the `top` most important features.
pub fn render_summary(summary: &TrainingSummary, top: usize) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Split: {} train / {} validation / {} test",
        summary.n_train, summary.n_validation, summary.n_test
    );
    if let Some(cv) = &summary.cv {
        let _ = writeln!(
            out,
            "Cross-validation RMSE: {:.4} (std {:.4}) over {} folds",
            cv.mean_rmse,
            cv.std_rmse,
            cv.fold_rmse.len()
        );
    }
    let training = &summary.training;
    let _ = write!(
        out,
        "Boosting: kept {} of {} rounds, train RMSE {:.4}",
        training.rounds_kept, training.rounds_run, training.train_rmse
    );
    if let Some(best) = training.best_validation_rmse {
        let _ = write!(out, ", best validation RMSE {best:.4}");
    }
    if training.stopped_early {
        out.push_str(" (stopped early)");
    }
    out.push('\n');

    match &summary.test {
        Some(report) => {
            out.push('\n');
            out.push_str(&render_evaluation(report, top));
        }
        None => out.push_str("\nNo test rows; evaluation skipped\n"),
    }
    out
}

/// Test metrics followed by the `top` most important features.
pub fn render_evaluation(report: &EvaluationReport, top: usize) -> String {
    let mut out = format!("{report}\n");
    let _ = writeln!(out, "\nTop {top} most important features:");
    for entry in report.top(top) {
        let _ = writeln!(out, "  {:<30} {:>6.2}%", entry.feature.name(), entry.importance);
    }
    out
}

pub fn render_prediction(label: &str, prediction: &Prediction) -> String {
    format!(
        "{label}: {} (score {:.3}) - {}",
        prediction.category,
        prediction.score,
        prediction.category.description()
    )
}

/// Write `{ "run_id": ..., "summary": ... }` as pretty JSON.
pub fn write_summary_json(path: &Path, run_id: RunId, summary: &TrainingSummary) -> anyhow::Result<()> {
    let record = serde_json::json!({
        "run_id": run_id.to_hex(),
        "summary": summary,
    });
    let text = serde_json::to_string_pretty(&record).context("failed to encode summary")?;
    std::fs::write(path, text).with_context(|| format!("failed to write {}", path.display()))?;
    Ok(())
}

//! CLI entry point for training and querying the stress pipeline.
//!
//! Subcommands:
//!   run      -- Load the saved pipeline, or train and save one, then score a response
//!   train    -- Train from the survey CSV (or synthetic data) and save the pipeline
//!   predict  -- Score one response with a saved pipeline

use anyhow::{bail, Context};
use benchmarks::{logging, report};
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Instant;
use stressmeter::dataset::{synthetic_survey, LabeledDataset};
use stressmeter::{AnswerMapper, Feature, MissingAnswerPolicy, Pipeline, StressConfig};

#[derive(Parser)]
#[command(name = "train-stress", about = "Student stress level pipeline")]
struct Cli {
    /// TOML config; defaults apply when the file is absent.
    #[arg(long, global = true, default_value = "stress.toml")]
    config: PathBuf,

    /// Pipeline artifact path, overriding the config.
    #[arg(long, global = true)]
    artifact: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(clap::Args)]
struct DataArgs {
    /// Survey CSV, overriding the config.
    #[arg(long)]
    data: Option<PathBuf>,

    /// Label column name, overriding the config.
    #[arg(long)]
    label_column: Option<String>,

    /// Train on N generated rows instead of reading a CSV.
    #[arg(long, value_name = "N")]
    synthetic: Option<usize>,

    /// Write the run summary as JSON.
    #[arg(long)]
    summary_json: Option<PathBuf>,
}

#[derive(clap::Args)]
struct AnswerArgs {
    /// Answer as `q7=3` or `anxiety_level=3`; repeatable.
    #[arg(long = "answer", value_parser = parse_answer)]
    answers: Vec<(String, f64)>,

    /// Fail instead of defaulting unanswered questions to 0.
    #[arg(long)]
    strict: bool,

    /// Reject answers outside the question's range.
    #[arg(long)]
    check_ranges: bool,
}

#[derive(Subcommand)]
enum Command {
    /// Load the saved pipeline if present, otherwise train one; then score a response.
    Run {
        #[command(flatten)]
        data: DataArgs,

        #[command(flatten)]
        answers: AnswerArgs,

        /// Train even when an artifact exists.
        #[arg(long)]
        retrain: bool,
    },

    /// Train and save a pipeline.
    Train {
        #[command(flatten)]
        data: DataArgs,
    },

    /// Score one response with a saved pipeline.
    Predict {
        #[command(flatten)]
        answers: AnswerArgs,
    },
}

fn parse_answer(raw: &str) -> Result<(String, f64), String> {
    let (key, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected KEY=VALUE, got `{raw}`"))?;
    let key = key.trim();
    let id = match Feature::from_name(key) {
        Some(feature) => feature.question_id(),
        None if Feature::ALL.iter().any(|f| f.question_id() == key) => key.to_string(),
        None => return Err(format!("unknown question `{key}`")),
    };
    let value = value
        .trim()
        .parse::<f64>()
        .map_err(|e| format!("bad value for {key}: {e}"))?;
    Ok((id, value))
}

fn main() {
    logging::init_logging("info");
    let cli = Cli::parse();

    let result = StressConfig::load_or_default(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))
        .and_then(|config| {
            let artifact = cli
                .artifact
                .clone()
                .unwrap_or_else(|| config.training.artifact_path.clone());
            match cli.command {
                Command::Run {
                    data,
                    answers,
                    retrain,
                } => {
                    let pipeline = if artifact.exists() && !retrain {
                        let pipeline = load(&artifact)?;
                        evaluate_loaded(&pipeline, &config, &data)?;
                        pipeline
                    } else {
                        train(&config, &data, &artifact)?
                    };
                    score(&pipeline, &answers)
                }
                Command::Train { data } => train(&config, &data, &artifact).map(|_| ()),
                Command::Predict { answers } => score(&load(&artifact)?, &answers),
            }
        });

    if let Err(e) = result {
        eprintln!("Error: {e:#}");
        std::process::exit(1);
    }
}

fn load(path: &Path) -> anyhow::Result<Pipeline> {
    let pipeline =
        Pipeline::load(path).with_context(|| format!("failed to load {}", path.display()))?;
    println!("Loaded pipeline {} from {}", pipeline.run_id().short(), path.display());
    Ok(pipeline)
}

fn load_dataset(config: &StressConfig, args: &DataArgs) -> anyhow::Result<LabeledDataset> {
    let dataset = match args.synthetic {
        Some(0) => bail!("--synthetic needs at least one row"),
        Some(n) => synthetic_survey(n, config.split.seed),
        None => {
            let path = args.data.as_ref().unwrap_or(&config.data.path);
            let label = args
                .label_column
                .as_deref()
                .unwrap_or(&config.data.label_column);
            LabeledDataset::from_csv(path, label)
                .with_context(|| format!("failed to read {}", path.display()))?
        }
    };
    Ok(dataset)
}

/// Score a loaded pipeline on the test rows its training run held out.
fn evaluate_loaded(
    pipeline: &Pipeline,
    config: &StressConfig,
    args: &DataArgs,
) -> anyhow::Result<()> {
    let dataset = load_dataset(config, args)?;
    let test = config
        .training_plan()
        .test_partition(&dataset)
        .context("failed to split dataset")?;
    if test.is_empty() {
        println!("No test rows; evaluation skipped");
        return Ok(());
    }
    let report = pipeline.evaluate(&test).context("evaluation failed")?;
    print!("{}", report::render_evaluation(&report, 5));
    Ok(())
}

fn train(config: &StressConfig, args: &DataArgs, artifact: &Path) -> anyhow::Result<Pipeline> {
    let dataset = load_dataset(config, args)?;
    println!("Training on {} responses", dataset.len());

    let started = Instant::now();
    let trained = Pipeline::train(&dataset, &config.training_plan()).context("training failed")?;
    tracing::info!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        run_id = %trained.pipeline.run_id().short(),
        "training run finished"
    );
    print!("{}", report::render_summary(&trained.summary, 5));

    if let Some(parent) = artifact.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("failed to create {}", parent.display()))?;
    }
    trained.pipeline.save(artifact)?;
    println!(
        "\nSaved pipeline {} to {}",
        trained.pipeline.run_id().short(),
        artifact.display()
    );

    if let Some(path) = &args.summary_json {
        report::write_summary_json(path, trained.pipeline.run_id(), &trained.summary)?;
    }
    Ok(trained.pipeline)
}

fn score(pipeline: &Pipeline, args: &AnswerArgs) -> anyhow::Result<()> {
    let answers: HashMap<String, f64> = args.answers.iter().cloned().collect();
    let policy = if args.strict {
        MissingAnswerPolicy::Reject
    } else {
        MissingAnswerPolicy::DefaultToZero
    };
    let mapped = AnswerMapper::new(policy)
        .with_range_check(args.check_ranges)
        .map(&answers)?;
    if !mapped.defaulted.is_empty() {
        let names: Vec<&str> = mapped.defaulted.iter().map(|f| f.name()).collect();
        println!("Unanswered, scored as 0: {}", names.join(", "));
    }

    let prediction = pipeline.predict(&mapped.vector)?;
    println!("{}", report::render_prediction("Predicted stress", &prediction));
    Ok(())
}

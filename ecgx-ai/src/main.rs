//! ecgx-ai - 12-lead ECG analysis command line
//!
//! Subcommands:
//! - `prepare`: load and normalize the dataset, split it, stream one epoch of
//!   batches and print the model summary
//! - `features`: per-lead waveform features for one WFDB record
//! - `risk`: clinical risk scores from a JSON attribute file
//! - `explain`: reasoning report for one record and a prediction file
//! - `feedback`: append a clinician verdict to the feedback log

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use ecgx_ai::dataset::{prefetch, BatchPlan};
use ecgx_ai::features::FeatureExtractor;
use ecgx_ai::feedback::{FeedbackEntry, FeedbackLog, UserFeedback};
use ecgx_ai::ingest::{wfdb, DatasetLoader, LoaderSettings};
use ecgx_ai::labels::Vocabulary;
use ecgx_ai::model::{ArchitectureConfig, ModelArchitectureBuilder};
use ecgx_ai::report::{Prediction, ReasoningReport, ReasoningReporter};
use ecgx_ai::risk::{ClinicalRiskFactors, RiskProfile, RiskScorer};
use ecgx_ai::signal::Normalizer;
use ecgx_ai::{CodeSet, Recording};
use ecgx_common::config::{
    write_toml_config, ConfigOverrides, LoaderConfig, Settings, TomlConfig,
};
use ecgx_common::logging::init_tracing;
use tracing::{info, warn};

/// Command-line arguments for ecgx-ai
#[derive(Parser, Debug)]
#[command(name = "ecgx-ai")]
#[command(about = "Multimodal 12-lead ECG analysis")]
#[command(version)]
struct Args {
    /// TOML configuration file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Dataset root containing the metadata table and RECORDS manifest
    #[arg(long, global = true)]
    dataset_dir: Option<PathBuf>,

    /// Directory for model summaries and the default feedback log
    #[arg(long, global = true)]
    model_dir: Option<PathBuf>,

    /// Sampling rate to load (100 or 500)
    #[arg(long, global = true)]
    sampling_rate: Option<u32>,

    #[arg(long, global = true)]
    seed: Option<u64>,

    #[arg(long, global = true)]
    batch_size: Option<usize>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load the dataset, stream one epoch and print the model summary
    Prepare {
        /// Also write the model graph (JSON) and the resolved configuration
        /// (TOML) into the model directory
        #[arg(long)]
        write_graph: bool,
    },
    /// Extract waveform features for every lead of a record
    Features {
        /// Record path without extension
        record: PathBuf,
    },
    /// Compute risk scores from a JSON file of clinical attributes
    Risk {
        attributes: PathBuf,
    },
    /// Build the reasoning report for a record
    Explain {
        /// Record path without extension
        record: PathBuf,
        /// JSON object mapping diagnostic code to probability
        #[arg(long)]
        prediction: PathBuf,
        /// JSON file of clinical attributes for the risk section
        #[arg(long)]
        attributes: Option<PathBuf>,
        /// Decision threshold for listed labels
        #[arg(long, default_value_t = 0.5)]
        threshold: f32,
    },
    /// Append clinician feedback to the feedback log
    Feedback {
        #[arg(long)]
        label: String,
        #[arg(long)]
        confidence: f64,
        /// yes, no or skip
        #[arg(long)]
        verdict: UserFeedback,
        /// Correct diagnosis when the verdict is no
        #[arg(long)]
        correct_label: Option<String>,
        /// Log file; defaults to feedback.csv in the model directory
        #[arg(long)]
        log: Option<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let file_config = TomlConfig::load_or_default(args.config.as_deref())
        .context("Failed to load configuration")?;
    let overrides = ConfigOverrides {
        dataset_dir: args.dataset_dir.clone(),
        model_dir: args.model_dir.clone(),
        log_dir: None,
        sampling_rate: args.sampling_rate,
        seed: args.seed,
        batch_size: args.batch_size,
    };
    let settings =
        Settings::resolve(&overrides, &file_config).context("Invalid configuration")?;
    init_tracing(&settings.logging, settings.log_file().as_deref())
        .context("Failed to initialize logging")?;

    info!("ecgx-ai {}", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Prepare { write_graph } => prepare(&settings, write_graph).await,
        Command::Features { record } => features(&settings, &record),
        Command::Risk { attributes } => risk(&attributes),
        Command::Explain {
            record,
            prediction,
            attributes,
            threshold,
        } => explain(&settings, &record, &prediction, attributes.as_deref(), threshold),
        Command::Feedback {
            label,
            confidence,
            verdict,
            correct_label,
            log,
        } => feedback(&settings, label, confidence, verdict, correct_label, log),
    }
}

async fn prepare(settings: &Settings, write_graph: bool) -> Result<()> {
    let loader_settings = LoaderSettings::from_settings(settings)?;
    let loader = DatasetLoader::new(loader_settings);
    let dataset = tokio::task::spawn_blocking(move || loader.load())
        .await
        .context("Dataset loader task failed")?
        .context("Failed to load dataset")?;

    let report = dataset.report();
    println!("Records: {} loaded of {}", report.loaded, report.total);
    for (kind, count) in &report.skipped {
        println!("  skipped ({}): {}", kind, count);
    }
    println!("Labels: {}", dataset.vocabulary().codes().join(", "));

    let loader_config = &settings.loader;
    let (train, validation) = dataset
        .split(loader_config.validation_fraction, loader_config.seed)
        .context("Failed to split dataset")?;
    println!("Split: {} train, {} validation", train.len(), validation.len());

    let (samples, leads) = train
        .waveform_shape()
        .context("Training split is empty")?;
    let graph = ModelArchitectureBuilder::new(ArchitectureConfig::default())
        .build([samples, leads], 2, train.vocabulary().len())
        .context("Failed to build model graph")?;

    let train = Arc::new(train);
    let plan = BatchPlan::for_epoch(train.len(), loader_config.batch_size, loader_config.seed, 0);
    let expected_batches = plan.len();
    let mut batches = prefetch(Arc::clone(&train), plan, loader_config.prefetch_batches);
    let mut streamed = 0;
    while let Some(batch) = batches.recv().await {
        streamed += batch.len();
    }
    info!(
        "Streamed {} records in {} batches",
        streamed, expected_batches
    );

    println!("{}", graph.summary());

    if write_graph {
        let dir = settings
            .model_dir
            .as_deref()
            .context("--write-graph needs a model directory (--model-dir or ECGX_MODEL_DIR)")?;
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
        let path = dir.join("model_graph.json");
        std::fs::write(&path, graph.to_json()?)
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Wrote model graph to {}", path.display());

        let snapshot = dir.join("run_config.toml");
        write_toml_config(&settings.to_toml_config(), &snapshot)
            .with_context(|| format!("Failed to write {}", snapshot.display()))?;
    }
    Ok(())
}

fn read_recording(record: &Path, sampling_rate: u32) -> Result<Recording> {
    let (header, samples) = wfdb::read_record(record)
        .with_context(|| format!("Failed to read record {}", record.display()))?;
    if (header.sampling_frequency - sampling_rate as f64).abs() > f64::EPSILON {
        warn!(
            "Record {} declares {} Hz, configured rate is {} Hz",
            record.display(),
            header.sampling_frequency,
            sampling_rate
        );
    }
    Ok(Recording::new(samples, sampling_rate)?)
}

fn features(settings: &Settings, record: &Path) -> Result<()> {
    let rate = settings.loader.sampling_rate;
    let recording = read_recording(record, rate)?;
    let extractor = FeatureExtractor::new(rate);

    let mut output = Vec::with_capacity(ecgx_ai::NUM_LEADS);
    for lead in extractor.extract_all_leads(&recording) {
        let value = match lead.features {
            Ok(features) => serde_json::to_value(features)?,
            Err(e) => {
                warn!("Lead {}: {}", lead.lead, e);
                serde_json::json!({ "error": e.to_string() })
            }
        };
        output.push(serde_json::json!({ "lead": lead.lead.to_string(), "features": value }));
    }
    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

fn load_factors(path: &Path) -> Result<ClinicalRiskFactors> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("Invalid attributes in {}", path.display()))
}

fn risk(attributes: &Path) -> Result<()> {
    let factors = load_factors(attributes)?;
    let profile = RiskScorer::new().profile(&factors)?;
    for entry in profile.entries() {
        println!("{}: {}", entry.name, entry.percent);
    }
    Ok(())
}

fn explain(
    settings: &Settings,
    record: &Path,
    prediction: &Path,
    attributes: Option<&Path>,
    threshold: f32,
) -> Result<()> {
    let raw = read_recording(record, settings.loader.sampling_rate)?;

    let text = std::fs::read_to_string(prediction)
        .with_context(|| format!("Failed to read {}", prediction.display()))?;
    let scores: BTreeMap<String, f32> = serde_json::from_str(&text)
        .with_context(|| format!("Invalid prediction file {}", prediction.display()))?;

    let risks = match attributes {
        Some(path) => RiskScorer::new().profile(&load_factors(path)?)?,
        None => RiskProfile::new(),
    };

    let report = build_report(&settings.loader, &raw, scores, risks, threshold)?;
    println!("{}", report);
    Ok(())
}

fn build_report(
    loader: &LoaderConfig,
    raw: &Recording,
    scores: BTreeMap<String, f32>,
    risks: RiskProfile,
    threshold: f32,
) -> Result<ReasoningReport> {
    // Lead energy shares are measured on raw amplitudes
    let recording = Normalizer::for_duration(loader.duration_seconds, loader.sampling_rate)?
        .fit_recording(raw)?;

    let codes: CodeSet = scores.keys().cloned().collect();
    let vocabulary = Vocabulary::fit([&codes]);
    let prediction = Prediction::new(scores.into_values().collect(), &vocabulary)?;

    Ok(ReasoningReporter::new()
        .with_threshold(threshold)?
        .report(&prediction, &vocabulary, &recording, risks)?)
}

fn feedback(
    settings: &Settings,
    label: String,
    confidence: f64,
    verdict: UserFeedback,
    correct_label: Option<String>,
    log: Option<PathBuf>,
) -> Result<()> {
    let path = match log {
        Some(path) => path,
        None => settings.require_feedback_log()?,
    };
    let mut entry = FeedbackEntry::new(label, confidence, verdict)?;
    if let Some(correct) = correct_label {
        entry = entry.with_correct_label(correct);
    }
    FeedbackLog::new(&path).append(&entry)?;
    info!("Feedback recorded in {}", path.display());
    Ok(())
}

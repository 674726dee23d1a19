//! `triage` binary: train and serve the importance and label-router heads.
//!
//! Four subcommands mirror the four pipelines. On success each prints a
//! single-line JSON result to stdout; diagnostics go to stderr. Exit
//! codes: 0 success (including a degenerate-label skip), 1 usage or input
//! error, 2 missing embedding model.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use serde::de::DeserializeOwned;
use serde_json::json;

use triage_ai::embedder::{DEFAULT_EMBEDDING_MODEL, EmbedderError, OnnxEmbedder};
use triage_ai::pipeline::{self, PipelineError, TrainOutcome};
use triage_core::artifact::Artifact;
use triage_core::sample::{ImportanceSample, RouterSample};

#[derive(Parser)]
#[command(name = "triage", version, about = "Embedding-backed triage heads")]
struct Cli {
    /// Directory holding one subdirectory per embedding model.
    #[arg(long, env = "TRIAGE_MODELS_DIR", default_value = "models", global = true)]
    models_dir: PathBuf,

    /// Embedding model used for training. Inference always uses the model
    /// recorded in the artifact.
    #[arg(
        long,
        env = "EMBEDDING_MODEL",
        default_value = DEFAULT_EMBEDDING_MODEL,
        global = true
    )]
    embedding_model: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Train the binary importance head from a JSON sample file.
    TrainImportance {
        /// JSON array of {"text", "important"} rows.
        data: PathBuf,
        /// Where to write the artifact.
        #[arg(default_value = "./important_model.json")]
        output: PathBuf,
    },
    /// Train the multi-class label-router head from a JSON sample file.
    TrainRouter {
        /// JSON array of {"text", "target_label"} rows.
        data: PathBuf,
        /// Where to write the artifact.
        #[arg(default_value = "./label_router_model.json")]
        output: PathBuf,
    },
    /// Score one text against an importance artifact.
    InferImportance {
        model: PathBuf,
        text: String,
    },
    /// Score one text against a router artifact.
    InferRouter {
        model: PathBuf,
        text: String,
    },
}

fn main() {
    tracing_subscriber::fmt::init();
    tracing::debug!("triage v{}", env!("CARGO_PKG_VERSION"));

    // clap exits 2 on usage errors by default; the contract here is 1,
    // with 0 reserved for --help/--version.
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            std::process::exit(code);
        }
    };

    if let Err(err) = run(cli) {
        eprintln!("error: {err:#}");
        std::process::exit(exit_code(&err));
    }
}

fn run(cli: Cli) -> anyhow::Result<()> {
    match cli.command {
        Command::TrainImportance { data, output } => {
            let samples: Vec<ImportanceSample> = load_samples(&data)?;
            let outcome = pipeline::train_importance(
                || load_embedder(&cli.models_dir, &cli.embedding_model),
                &samples,
            )?;
            report_training(outcome, &output)
        }
        Command::TrainRouter { data, output } => {
            let samples: Vec<RouterSample> = load_samples(&data)?;
            let outcome = pipeline::train_router(
                || load_embedder(&cli.models_dir, &cli.embedding_model),
                &samples,
            )?;
            report_training(outcome, &output)
        }
        Command::InferImportance { model, text } => {
            let artifact = load_artifact(&model)?;
            let mut embedder = load_embedder(&cli.models_dir, &artifact.embedding_model_id)?;
            let report = pipeline::infer_importance(&mut embedder, &artifact, &text)?;
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
        Command::InferRouter { model, text } => {
            let artifact = load_artifact(&model)?;
            let mut embedder = load_embedder(&cli.models_dir, &artifact.embedding_model_id)?;
            let report = pipeline::infer_router(&mut embedder, &artifact, &text)?;
            println!("{}", serde_json::to_string(&report)?);
            Ok(())
        }
    }
}

/// Print the training result and, for a fresh artifact, write it out.
///
/// A degenerate-label skip is a success: the JSON says so and no artifact
/// is written. Writes are plain write-once; atomic replace is the
/// caller's business.
fn report_training(outcome: TrainOutcome, output: &Path) -> anyhow::Result<()> {
    match outcome {
        TrainOutcome::Skipped {
            samples,
            labels,
            reason,
        } => {
            let mut result = json!({
                "samples": samples,
                "skipped": true,
                "reason": reason,
            });
            if let Some(labels) = labels {
                result["labels"] = json!(labels);
            }
            println!("{result}");
        }
        TrainOutcome::Trained {
            samples,
            labels,
            artifact,
        } => {
            let bytes = artifact.encode()?;
            fs::write(output, bytes)
                .with_context(|| format!("writing artifact to {}", output.display()))?;

            let mut result = json!({
                "samples": samples,
                "path": output.display().to_string(),
            });
            if let Some(labels) = labels {
                result["labels"] = json!(labels);
            }
            println!("{result}");
        }
    }
    Ok(())
}

fn load_samples<T: DeserializeOwned>(path: &Path) -> anyhow::Result<Vec<T>> {
    let bytes =
        fs::read(path).with_context(|| format!("reading dataset {}", path.display()))?;
    serde_json::from_slice(&bytes).with_context(|| format!("parsing dataset {}", path.display()))
}

fn load_artifact(path: &Path) -> anyhow::Result<Artifact> {
    let bytes =
        fs::read(path).with_context(|| format!("reading artifact {}", path.display()))?;
    Ok(Artifact::decode(&bytes)?)
}

fn load_embedder(models_dir: &Path, model_id: &str) -> Result<OnnxEmbedder, EmbedderError> {
    OnnxEmbedder::load(models_dir, model_id)
}

/// Map an error chain to the process exit code: 2 for a missing embedding
/// model, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> i32 {
    let missing_model = matches!(
        err.downcast_ref::<EmbedderError>(),
        Some(EmbedderError::ModelUnavailable { .. })
    ) || matches!(
        err.downcast_ref::<PipelineError>(),
        Some(PipelineError::Embedder(EmbedderError::ModelUnavailable { .. }))
    );

    if missing_model { 2 } else { 1 }
}

//! Command-line entry point
//!
//! Selects the feature transform, model family, and precision mode from
//! flags or a JSON config file, runs one experiment, and prints the
//! metrics report as JSON. On failure the originating stage and error are
//! printed and the process exits non-zero.

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use ensayo::config::{ExperimentConfig, ModelType, PrecisionMode, TransformKind};
use ensayo::experiment::ExperimentRunner;

#[derive(Parser, Debug)]
#[command(name = "ensayo", version, about = "ML experimentation harness over EEG recordings")]
struct Cli {
    /// Path to a zip archive or directory of recordings
    #[arg(long)]
    input: PathBuf,

    /// JSON config file; explicit flags below override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Feature transform: spectrogram | identity
    #[arg(long)]
    transform: Option<TransformKind>,

    /// Model family: gradient-boosting | neural-network
    #[arg(long)]
    model: Option<ModelType>,

    /// Precision mode: full | mixed | auto
    #[arg(long)]
    precision: Option<PrecisionMode>,

    /// Number of target classes
    #[arg(long)]
    n_classes: Option<usize>,

    /// Training epochs for the neural-network variant
    #[arg(long)]
    epochs: Option<usize>,

    /// Seed for the holdout split and weight initialization
    #[arg(long)]
    seed: Option<u64>,
}

impl Cli {
    fn into_config(self) -> ensayo::Result<(PathBuf, ExperimentConfig)> {
        let mut config = match &self.config {
            Some(path) => ExperimentConfig::from_json_file(path)?,
            None => ExperimentConfig::default(),
        };
        if let Some(transform) = self.transform {
            config.transform = transform;
        }
        if let Some(model) = self.model {
            config.model_type = model;
        }
        if let Some(precision) = self.precision {
            config.precision_mode = precision;
        }
        if let Some(n_classes) = self.n_classes {
            config.n_classes = n_classes;
        }
        if let Some(epochs) = self.epochs {
            config.neural.epochs = epochs;
        }
        if let Some(seed) = self.seed {
            config.seed = seed;
        }
        Ok((self.input, config))
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let (input, config) = match cli.into_config() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("ensayo: {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut runner = ExperimentRunner::new();
    match runner.run(&input, &config) {
        Ok(outcome) => {
            match serde_json::to_string_pretty(&outcome.report) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("ensayo: failed to serialize report: {err}");
                    return ExitCode::FAILURE;
                }
            }
            ExitCode::SUCCESS
        }
        Err(err) => {
            match err.stage() {
                Some(stage) => eprintln!("ensayo: run aborted at stage '{stage}': {err}"),
                None => eprintln!("ensayo: {err}"),
            }
            ExitCode::FAILURE
        }
    }
}

//! # Ensayo: Configuration-Driven ML Experimentation Harness
//!
//! Ensayo lets a practitioner swap between classical machine-learning
//! models (gradient-boosted trees) and deep-learning models
//! (mixed-precision neural networks) with configuration changes only, to
//! accelerate baseline construction and hypothesis testing over EEG
//! recordings.
//!
//! ## Pipeline
//!
//! ```text
//! Data Loader → Feature Transform → Model Adapter fit/predict → Metrics
//! ```
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use ensayo::config::{ExperimentConfig, ModelType};
//! use ensayo::experiment::ExperimentRunner;
//!
//! let config = ExperimentConfig {
//!     model_type: ModelType::GradientBoosting,
//!     ..ExperimentConfig::default()
//! };
//!
//! let mut runner = ExperimentRunner::new();
//! let outcome = runner.run("input/eeg.zip", &config)?;
//! println!("accuracy: {:?}", outcome.report.get("accuracy"));
//! # Ok::<(), ensayo::Error>(())
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod dataset;
pub mod error;
pub mod experiment;
pub mod metrics;
pub mod model;
pub mod transform;

pub use error::{Error, Result, Stage};

//! Experiment tracking and orchestration
//!
//! ```text
//! RunRecord (1) ──< MetricRecord (N) [per-epoch time series]
//! ```
//!
//! The [`runner::ExperimentRunner`] sequences the pipeline and appends one
//! [`RunRecord`] plus the training-loss time series to an in-memory
//! [`ExperimentStore`] per run.

mod run_record;
mod store;

pub mod runner;

pub use run_record::{MetricRecord, RunRecord, RunStatus};
pub use runner::{holdout_split, ExperimentRunner, RunOutcome};
pub use store::ExperimentStore;

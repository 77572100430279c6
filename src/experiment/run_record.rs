//! Run and metric records for experiment tracking

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::ExperimentConfig;

/// Status of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RunStatus {
    /// Created but not yet started
    Pending,
    /// Pipeline is executing
    Running,
    /// Completed with a metrics report
    Success,
    /// Aborted at some pipeline stage
    Failed,
}

/// One execution of the pipeline under a fixed configuration.
///
/// Tracks the lifecycle from start to completion along with the
/// configuration selectors that identify the hypothesis being tested.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunRecord {
    run_id: String,
    model_type: String,
    transform: String,
    status: RunStatus,
    started_at: Option<DateTime<Utc>>,
    ended_at: Option<DateTime<Utc>>,
    failed_stage: Option<String>,
}

impl RunRecord {
    /// Create a pending run record for the given configuration.
    #[must_use]
    pub fn new(run_id: impl Into<String>, config: &ExperimentConfig) -> Self {
        Self {
            run_id: run_id.into(),
            model_type: format!("{:?}", config.model_type),
            transform: format!("{:?}", config.transform),
            status: RunStatus::Pending,
            started_at: None,
            ended_at: None,
            failed_stage: None,
        }
    }

    /// Run identifier.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Current status.
    #[must_use]
    pub const fn status(&self) -> RunStatus {
        self.status
    }

    /// Start timestamp, if the run has started.
    #[must_use]
    pub const fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    /// End timestamp, if the run has finished.
    #[must_use]
    pub const fn ended_at(&self) -> Option<DateTime<Utc>> {
        self.ended_at
    }

    /// Stage name at which the run failed, if it did.
    #[must_use]
    pub fn failed_stage(&self) -> Option<&str> {
        self.failed_stage.as_deref()
    }

    /// Transition Pending → Running.
    pub fn start(&mut self) {
        self.status = RunStatus::Running;
        self.started_at = Some(Utc::now());
    }

    /// Transition Running → Success.
    pub fn complete(&mut self) {
        self.status = RunStatus::Success;
        self.ended_at = Some(Utc::now());
    }

    /// Transition Running → Failed, remembering the originating stage.
    pub fn fail(&mut self, stage: impl Into<String>) {
        self.status = RunStatus::Failed;
        self.failed_stage = Some(stage.into());
        self.ended_at = Some(Utc::now());
    }
}

/// One time-series metric data point for a run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MetricRecord {
    run_id: String,
    key: String,
    step: u64,
    value: f64,
    timestamp: DateTime<Utc>,
}

impl MetricRecord {
    /// Create a metric record stamped with the current time.
    #[must_use]
    pub fn new(run_id: impl Into<String>, key: impl Into<String>, step: u64, value: f64) -> Self {
        Self {
            run_id: run_id.into(),
            key: key.into(),
            step,
            value,
            timestamp: Utc::now(),
        }
    }

    /// Parent run ID.
    #[must_use]
    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    /// Metric key, e.g. "`train_loss`".
    #[must_use]
    pub fn key(&self) -> &str {
        &self.key
    }

    /// Epoch or step number.
    #[must_use]
    pub const fn step(&self) -> u64 {
        self.step
    }

    /// Metric value.
    #[must_use]
    pub const fn value(&self) -> f64 {
        self.value
    }
}

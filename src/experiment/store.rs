//! In-memory store for run and metric records
//!
//! Hash-map lookups by run ID, with the metric vector filterable into a
//! per-run time series ordered by step.

use std::collections::HashMap;

use super::{MetricRecord, RunRecord};

/// In-memory experiment-tracking store.
#[derive(Debug, Default)]
pub struct ExperimentStore {
    runs: HashMap<String, RunRecord>,
    metrics: Vec<MetricRecord>,
}

impl ExperimentStore {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the store holds no runs or metrics.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.runs.is_empty() && self.metrics.is_empty()
    }

    /// Number of recorded runs.
    #[must_use]
    pub fn run_count(&self) -> usize {
        self.runs.len()
    }

    /// Add or replace a run record.
    pub fn add_run(&mut self, run: RunRecord) {
        self.runs.insert(run.run_id().to_string(), run);
    }

    /// Look up a run by ID.
    #[must_use]
    pub fn get_run(&self, run_id: &str) -> Option<&RunRecord> {
        self.runs.get(run_id)
    }

    /// Append a metric data point.
    pub fn add_metric(&mut self, metric: MetricRecord) {
        self.metrics.push(metric);
    }

    /// Metrics for a run and key, sorted by step ascending.
    #[must_use]
    pub fn get_metrics_for_run(&self, run_id: &str, key: &str) -> Vec<MetricRecord> {
        let mut metrics: Vec<MetricRecord> = self
            .metrics
            .iter()
            .filter(|m| m.run_id() == run_id && m.key() == key)
            .cloned()
            .collect();
        metrics.sort_by_key(MetricRecord::step);
        metrics
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ExperimentConfig;
    use crate::experiment::RunStatus;

    #[test]
    fn test_store_starts_empty() {
        assert!(ExperimentStore::new().is_empty());
    }

    #[test]
    fn test_run_round_trip() {
        let mut store = ExperimentStore::new();
        let mut run = RunRecord::new("run-001", &ExperimentConfig::default());
        run.start();
        run.complete();
        store.add_run(run);

        assert_eq!(store.run_count(), 1);
        assert_eq!(
            store.get_run("run-001").unwrap().status(),
            RunStatus::Success
        );
        assert!(store.get_run("run-404").is_none());
    }

    #[test]
    fn test_metric_time_series_sorted_by_step() {
        let mut store = ExperimentStore::new();
        // Inserted out of order on purpose
        store.add_metric(MetricRecord::new("run-001", "train_loss", 2, 0.2));
        store.add_metric(MetricRecord::new("run-001", "train_loss", 0, 0.9));
        store.add_metric(MetricRecord::new("run-001", "train_loss", 1, 0.5));
        store.add_metric(MetricRecord::new("run-001", "accuracy", 0, 0.4));
        store.add_metric(MetricRecord::new("run-002", "train_loss", 0, 0.7));

        let series = store.get_metrics_for_run("run-001", "train_loss");
        assert_eq!(series.len(), 3);
        let steps: Vec<u64> = series.iter().map(MetricRecord::step).collect();
        assert_eq!(steps, vec![0, 1, 2]);
    }
}

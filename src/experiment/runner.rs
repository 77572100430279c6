//! Experiment runner
//!
//! Sequences load → transform → holdout split → fit → predict → evaluate.
//! Any component failure aborts the run and surfaces the originating error
//! with its stage name attached; there is no partial-result caching and no
//! retry of any stage.

use std::path::Path;

use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::info;

use crate::config::ExperimentConfig;
use crate::dataset::EegArchive;
use crate::error::{Stage, StageExt};
use crate::experiment::{ExperimentStore, MetricRecord, RunRecord};
use crate::metrics::{evaluate, MetricsReport};
use crate::model::{Estimator, FitSummary, ModelAdapter};
use crate::transform::{FeatureTensor, FeatureTransform, SpecAugment, TransformPipeline};
use crate::{Error, Result};

/// Result of a successful run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    /// Evaluation metrics on the held-out samples
    pub report: MetricsReport,
    /// Tracking record for the run
    pub run: RunRecord,
    /// Training summary from the fitted model
    pub fit: FitSummary,
}

/// Orchestrates experiment runs and tracks them in an in-memory store.
#[derive(Debug, Default)]
pub struct ExperimentRunner {
    store: ExperimentStore,
    next_run: usize,
}

impl ExperimentRunner {
    /// Create a runner with an empty tracking store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracking store with the records of all runs so far.
    #[must_use]
    pub const fn store(&self) -> &ExperimentStore {
        &self.store
    }

    /// Execute one experiment run.
    ///
    /// # Errors
    ///
    /// Returns the originating component error wrapped in
    /// [`Error::Stage`]; [`Error::Config`] for an invalid configuration.
    pub fn run<P: AsRef<Path>>(
        &mut self,
        data_source: P,
        config: &ExperimentConfig,
    ) -> Result<RunOutcome> {
        config.validate()?;

        self.next_run += 1;
        let run_id = format!("run-{:03}", self.next_run);
        let mut run = RunRecord::new(&run_id, config);
        run.start();
        info!(run_id, model = ?config.model_type, transform = ?config.transform, "run started");

        match self.execute(data_source.as_ref(), config) {
            Ok((report, fit)) => {
                for (step, &loss) in fit.loss_history.iter().enumerate() {
                    self.store
                        .add_metric(MetricRecord::new(&run_id, "train_loss", step as u64, loss));
                }
                for (name, value) in report.iter() {
                    self.store.add_metric(MetricRecord::new(
                        &run_id,
                        name,
                        fit.loss_history.len() as u64,
                        value,
                    ));
                }
                run.complete();
                self.store.add_run(run.clone());

                let summary: Vec<String> = report
                    .iter()
                    .map(|(name, value)| format!("{name}: {value:.4}"))
                    .collect();
                info!(run_id, "eval [{}]", summary.join("\t"));
                Ok(RunOutcome { report, run, fit })
            }
            Err(err) => {
                let stage = err
                    .stage()
                    .map_or_else(|| "config".to_string(), |s| s.to_string());
                run.fail(stage);
                self.store.add_run(run);
                Err(err)
            }
        }
    }

    /// The pipeline proper, with stage attribution on every fallible step.
    fn execute(
        &self,
        data_source: &Path,
        config: &ExperimentConfig,
    ) -> Result<(MetricsReport, FitSummary)> {
        let archive = EegArchive::open(data_source).at_stage(Stage::Load)?;
        let transform = TransformPipeline::from_config(config);

        // Each Sample is consumed by the transform as it is produced
        let mut features: Vec<FeatureTensor> = Vec::with_capacity(archive.len());
        let mut labels: Vec<u32> = Vec::with_capacity(archive.len());
        for sample in archive.samples() {
            let sample = sample.at_stage(Stage::Load)?;
            let tensor = transform.apply(&sample).at_stage(Stage::Transform)?;
            features.push(tensor);
            labels.push(sample.label);
        }
        info!(
            samples = features.len(),
            transform = transform.name(),
            "transform complete"
        );

        let (train_idx, eval_idx) =
            holdout_split(features.len(), config.holdout, config.seed).at_stage(Stage::Fit)?;
        let gather = |idx: &[usize]| -> (Vec<FeatureTensor>, Vec<u32>) {
            (
                idx.iter().map(|&i| features[i].clone()).collect(),
                idx.iter().map(|&i| labels[i]).collect(),
            )
        };
        let (mut train_x, train_y) = gather(&train_idx);
        let (eval_x, eval_y) = gather(&eval_idx);

        // Stripe dropout touches training features only; evaluation sees
        // the transform output unmodified
        if config.augment.is_active() {
            let mut augment = SpecAugment::new(config.augment.clone(), config.seed);
            for tensor in &mut train_x {
                augment.apply(tensor).at_stage(Stage::Transform)?;
            }
            info!(samples = train_x.len(), "applied stripe dropout");
        }

        let mut adapter = ModelAdapter::from_config(config).at_stage(Stage::Fit)?;
        let fit = adapter.fit(&train_x, &train_y).at_stage(Stage::Fit)?;
        let predictions = adapter.predict(&eval_x).at_stage(Stage::Predict)?;
        let report =
            evaluate(&predictions, &eval_y, config.n_classes).at_stage(Stage::Evaluate)?;

        Ok((report, fit))
    }
}

/// Deterministic seeded holdout split.
///
/// Returns `(train, eval)` index sets; the eval set holds
/// `max(1, round(n * holdout))` samples.
///
/// # Errors
///
/// Returns [`Error::Fit`] when fewer than two samples are available.
pub fn holdout_split(n: usize, holdout: f64, seed: u64) -> Result<(Vec<usize>, Vec<usize>)> {
    if n < 2 {
        return Err(Error::Fit(format!(
            "need at least 2 samples to split, got {n}"
        )));
    }

    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);

    let n_eval = ((n as f64 * holdout).round() as usize).clamp(1, n - 1);
    let eval = indices.split_off(n - n_eval);
    Ok((indices, eval))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_is_deterministic_for_seed() {
        let a = holdout_split(100, 0.2, 42).unwrap();
        let b = holdout_split(100, 0.2, 42).unwrap();
        assert_eq!(a, b);

        let c = holdout_split(100, 0.2, 43).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn test_split_partitions_all_indices() {
        let (train, eval) = holdout_split(50, 0.2, 0).unwrap();
        assert_eq!(train.len() + eval.len(), 50);
        assert_eq!(eval.len(), 10);

        let mut all: Vec<usize> = train.iter().chain(eval.iter()).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_split_always_leaves_training_samples() {
        let (train, eval) = holdout_split(2, 0.9, 0).unwrap();
        assert_eq!(train.len(), 1);
        assert_eq!(eval.len(), 1);
    }

    #[test]
    fn test_split_rejects_single_sample() {
        assert!(matches!(
            holdout_split(1, 0.2, 0).unwrap_err(),
            Error::Fit(_)
        ));
    }
}

//! Gradient-boosting model adapter
//!
//! Flattens feature tensors into tabular rows and delegates tree building
//! to the `gbdt` crate. Multi-class is handled one-vs-rest: one squared-
//! error ensemble per class, argmax over per-class scores at predict time.
//! No precision concept applies to this variant.

use std::time::Instant;

use gbdt::config::Config as GbdtConfig;
use gbdt::decision_tree::{Data, DataVec};
use gbdt::gradient_boost::GBDT;
use tracing::{debug, info};

use super::{check_fit_contract, Estimator, FitSummary};
use crate::config::BoostingParams;
use crate::transform::FeatureTensor;
use crate::{Error, Result};

/// One-vs-rest gradient-boosted tree ensemble.
pub struct BoostingModel {
    params: BoostingParams,
    n_classes: usize,
    ensembles: Vec<GBDT>,
    n_features: Option<usize>,
}

impl BoostingModel {
    /// Create an unfitted boosting model.
    #[must_use]
    pub fn new(params: BoostingParams, n_classes: usize) -> Self {
        Self {
            params,
            n_classes,
            ensembles: Vec::new(),
            n_features: None,
        }
    }

    fn gbdt_config(&self, n_features: usize) -> GbdtConfig {
        let mut config = GbdtConfig::new();
        config.set_feature_size(n_features);
        config.set_max_depth(self.params.max_depth);
        config.set_iterations(self.params.n_estimators);
        config.set_shrinkage(self.params.learning_rate as f32);
        config.set_data_sample_ratio(self.params.subsample);
        config.set_feature_sample_ratio(self.params.feature_fraction);
        config.set_loss("SquaredError");
        config.set_debug(false);
        config
    }

    /// Per-class scores for already-validated tabular rows.
    fn scores(&self, rows: &[FeatureTensor]) -> Vec<Vec<f32>> {
        let test_data: DataVec = rows
            .iter()
            .map(|f| Data::new_test_data(f.flatten().to_vec(), None))
            .collect();

        self.ensembles
            .iter()
            .map(|ensemble| ensemble.predict(&test_data))
            .collect()
    }
}

impl Estimator for BoostingModel {
    fn fit(&mut self, features: &[FeatureTensor], labels: &[u32]) -> Result<FitSummary> {
        let (n_samples, n_features) = check_fit_contract(features, labels, self.n_classes)?;
        let start = Instant::now();

        self.ensembles.clear();
        let mut class_losses = Vec::with_capacity(self.n_classes);
        for class in 0..self.n_classes {
            let mut train_data: DataVec = features
                .iter()
                .zip(labels.iter())
                .map(|(f, &label)| {
                    let target = if label as usize == class { 1.0 } else { 0.0 };
                    Data::new_training_data(f.flatten().to_vec(), 1.0, target, None)
                })
                .collect();

            let mut ensemble = GBDT::new(&self.gbdt_config(n_features));
            ensemble.fit(&mut train_data);

            // Training MSE against the one-vs-rest target, for the summary
            let scores = ensemble.predict(&train_data);
            let mse: f64 = scores
                .iter()
                .zip(train_data.iter())
                .map(|(&s, d)| f64::from(s - d.label).powi(2))
                .sum::<f64>()
                / n_samples as f64;
            debug!(class, mse, "fitted one-vs-rest ensemble");
            class_losses.push(mse);

            self.ensembles.push(ensemble);
        }

        self.n_features = Some(n_features);
        let train_seconds = start.elapsed().as_secs_f64();
        let mean_loss = class_losses.iter().sum::<f64>() / class_losses.len() as f64;
        info!(
            n_samples,
            n_features, train_seconds, "gradient-boosting fit complete"
        );

        Ok(FitSummary {
            loss_history: vec![mean_loss],
            train_seconds,
        })
    }

    fn predict(&self, features: &[FeatureTensor]) -> Result<Vec<u32>> {
        let n_features = self
            .n_features
            .ok_or_else(|| Error::Fit("predict called before fit".to_string()))?;
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(bad) = features.iter().find(|f| f.n_features() != n_features) {
            return Err(Error::Fit(format!(
                "feature width {} does not match trained width {n_features}",
                bad.n_features()
            )));
        }

        let per_class = self.scores(features);
        let predictions = (0..features.len())
            .map(|row| {
                let mut best = (0u32, f32::NEG_INFINITY);
                for (class, scores) in per_class.iter().enumerate() {
                    if scores[row] > best.1 {
                        best = (class as u32, scores[row]);
                    }
                }
                best.0
            })
            .collect();
        Ok(predictions)
    }

    fn name(&self) -> &'static str {
        "gradient-boosting"
    }
}

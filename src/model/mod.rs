//! Model adapters
//!
//! One uniform [`Estimator`] interface over two incompatible model
//! families. Variant selection is a pure function of the configuration —
//! switching families never requires caller-code changes beyond the config.

use serde::{Deserialize, Serialize};

use crate::config::{ExperimentConfig, ModelType};
use crate::transform::FeatureTensor;
use crate::{Error, Result};

pub mod boosting;
pub mod neural;
pub mod precision;

pub use boosting::BoostingModel;
pub use neural::NeuralModel;
pub use precision::{DeviceCapability, EffectivePrecision};

/// Summary of one fit, returned by [`Estimator::fit`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FitSummary {
    /// Mean training loss per epoch (one entry for single-pass estimators)
    pub loss_history: Vec<f64>,
    /// Wall-clock training time in seconds
    pub train_seconds: f64,
}

/// Capability set shared by both model families.
pub trait Estimator {
    /// Train on the given features and labels.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fit`] when features/labels disagree with this
    /// variant's shape contract.
    fn fit(&mut self, features: &[FeatureTensor], labels: &[u32]) -> Result<FitSummary>;

    /// Predict class labels for the given features.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Fit`] when called before `fit` or when feature
    /// shapes disagree with the trained model.
    fn predict(&self, features: &[FeatureTensor]) -> Result<Vec<u32>>;

    /// Variant name for logging and run records.
    fn name(&self) -> &'static str;
}

/// Model variant selected from configuration.
///
/// A tagged variant dispatching to one of two concrete implementations;
/// no runtime type inspection.
pub enum ModelAdapter {
    /// Tree ensemble over flat tabular features
    GradientBoosting(BoostingModel),
    /// Mixed-precision-capable neural network over tensor features
    NeuralNetwork(NeuralModel),
}

impl ModelAdapter {
    /// Select and construct the variant named by the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precision`] if the neural variant cannot obtain a
    /// usable device even after the full-precision fallback.
    pub fn from_config(config: &ExperimentConfig) -> Result<Self> {
        match config.model_type {
            ModelType::GradientBoosting => Ok(Self::GradientBoosting(BoostingModel::new(
                config.boosting.clone(),
                config.n_classes,
            ))),
            ModelType::NeuralNetwork => Ok(Self::NeuralNetwork(NeuralModel::new(config)?)),
        }
    }
}

impl Estimator for ModelAdapter {
    fn fit(&mut self, features: &[FeatureTensor], labels: &[u32]) -> Result<FitSummary> {
        match self {
            Self::GradientBoosting(m) => m.fit(features, labels),
            Self::NeuralNetwork(m) => m.fit(features, labels),
        }
    }

    fn predict(&self, features: &[FeatureTensor]) -> Result<Vec<u32>> {
        match self {
            Self::GradientBoosting(m) => m.predict(features),
            Self::NeuralNetwork(m) => m.predict(features),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::GradientBoosting(m) => m.name(),
            Self::NeuralNetwork(m) => m.name(),
        }
    }
}

/// Validate the shared fit contract.
///
/// Returns `(n_samples, n_features)` after checking non-emptiness, equal
/// feature/label counts, consistent feature shapes, and label range.
pub(crate) fn check_fit_contract(
    features: &[FeatureTensor],
    labels: &[u32],
    n_classes: usize,
) -> Result<(usize, usize)> {
    if features.is_empty() {
        return Err(Error::Fit("empty training set".to_string()));
    }
    if features.len() != labels.len() {
        return Err(Error::Fit(format!(
            "{} feature tensors for {} labels",
            features.len(),
            labels.len()
        )));
    }

    let shape = features[0].shape().to_vec();
    if features.iter().any(|f| f.shape() != shape.as_slice()) {
        return Err(Error::Fit(
            "inconsistent feature shapes across samples".to_string(),
        ));
    }

    if let Some(&bad) = labels.iter().find(|&&l| (l as usize) >= n_classes) {
        return Err(Error::Fit(format!(
            "label {bad} outside configured n_classes {n_classes}"
        )));
    }

    Ok((features.len(), features[0].n_features()))
}

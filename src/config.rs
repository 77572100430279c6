//! Experiment configuration
//!
//! One `ExperimentConfig` is supplied per run and is immutable for its
//! duration. Model family, precision mode, and feature transform are all
//! selected here — switching any of them must never require caller-code
//! changes beyond this struct.

use std::path::Path;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Model family selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ModelType {
    /// Tree-ensemble estimator over flat tabular features
    GradientBoosting,
    /// Tensor-based neural network, optionally mixed precision
    NeuralNetwork,
}

impl FromStr for ModelType {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "gradient-boosting" | "gbdt" => Ok(Self::GradientBoosting),
            "neural-network" | "nn" => Ok(Self::NeuralNetwork),
            other => Err(Error::Config(format!(
                "unknown model type '{other}' (expected gradient-boosting or neural-network)"
            ))),
        }
    }
}

/// Numeric precision requested for the neural-network variant.
///
/// The effective mode is resolved against hardware capability by
/// [`crate::model::DeviceCapability::resolve`]; `Mixed` degrades to `Full` on
/// hardware without reduced-precision support.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrecisionMode {
    /// f32 everywhere
    Full,
    /// f16 activations/gradients, f32 master weights, dynamic loss scaling
    Mixed,
    /// Probe the device: mixed on an accelerator, full on CPU
    Auto,
}

impl FromStr for PrecisionMode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "full" => Ok(Self::Full),
            "mixed" => Ok(Self::Mixed),
            "auto" => Ok(Self::Auto),
            other => Err(Error::Config(format!(
                "unknown precision mode '{other}' (expected full, mixed, or auto)"
            ))),
        }
    }
}

/// Feature transform selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum TransformKind {
    /// Per-channel STFT log-power spectrogram
    Spectrogram,
    /// Passthrough: raw channels stacked as-is
    Identity,
}

impl FromStr for TransformKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "spectrogram" => Ok(Self::Spectrogram),
            "identity" => Ok(Self::Identity),
            other => Err(Error::Config(format!(
                "unknown transform '{other}' (expected spectrogram or identity)"
            ))),
        }
    }
}

/// Gradient-boosting hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BoostingParams {
    /// Number of boosting iterations per class ensemble
    pub n_estimators: usize,
    /// Maximum tree depth
    pub max_depth: u32,
    /// Shrinkage applied to each tree's contribution
    pub learning_rate: f64,
    /// Row subsample ratio per iteration
    pub subsample: f64,
    /// Column subsample ratio per iteration
    pub feature_fraction: f64,
}

impl Default for BoostingParams {
    fn default() -> Self {
        Self {
            n_estimators: 200,
            max_depth: 5,
            learning_rate: 0.1,
            subsample: 0.8,
            feature_fraction: 0.8,
        }
    }
}

/// Neural-network hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NeuralParams {
    /// Hidden layer width
    pub hidden_size: usize,
    /// Number of training epochs
    pub epochs: usize,
    /// Minibatch size
    pub batch_size: usize,
    /// Optimizer learning rate
    pub learning_rate: f64,
    /// Stop after this many epochs without training-loss improvement;
    /// None trains for the full epoch budget
    pub patience: Option<usize>,
}

impl Default for NeuralParams {
    fn default() -> Self {
        Self {
            hidden_size: 128,
            epochs: 20,
            batch_size: 32,
            learning_rate: 1e-3,
            patience: None,
        }
    }
}

/// Training-time stripe-dropout (SpecAugment) parameters.
///
/// Both rates default to zero, which disables augmentation entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AugmentParams {
    /// Maximum fraction of frames one time stripe may cover
    pub time_drop_rate: f64,
    /// Maximum fraction of frequency bins one stripe may cover
    pub freq_drop_rate: f64,
    /// Stripes dropped per axis per sample
    pub stripes: usize,
}

impl Default for AugmentParams {
    fn default() -> Self {
        Self {
            time_drop_rate: 0.0,
            freq_drop_rate: 0.0,
            stripes: 1,
        }
    }
}

impl AugmentParams {
    /// Whether any stripe dropout is configured.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.stripes > 0 && (self.time_drop_rate > 0.0 || self.freq_drop_rate > 0.0)
    }
}

/// Spectrogram transform parameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramParams {
    /// STFT window length in samples
    pub window: usize,
    /// Hop between consecutive windows in samples
    pub hop: usize,
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self {
            window: 256,
            hop: 128,
        }
    }
}

/// Full configuration for one experiment run.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExperimentConfig {
    /// Selected model family
    pub model_type: ModelType,
    /// Requested numeric precision (neural-network only)
    pub precision_mode: PrecisionMode,
    /// Selected feature transform
    pub transform: TransformKind,
    /// Spectrogram parameters (ignored by the identity transform)
    pub spectrogram: SpectrogramParams,
    /// Training-time stripe dropout (spectrogram features only)
    pub augment: AugmentParams,
    /// Number of target classes
    pub n_classes: usize,
    /// Expected channel count; None accepts any consistent count
    pub n_channels: Option<usize>,
    /// Fraction of samples held out for evaluation
    pub holdout: f64,
    /// Seed for the holdout split and weight initialization
    pub seed: u64,
    /// Gradient-boosting hyperparameters
    pub boosting: BoostingParams,
    /// Neural-network hyperparameters
    pub neural: NeuralParams,
}

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            model_type: ModelType::GradientBoosting,
            precision_mode: PrecisionMode::Auto,
            transform: TransformKind::Spectrogram,
            spectrogram: SpectrogramParams::default(),
            augment: AugmentParams::default(),
            n_classes: 3,
            n_channels: None,
            holdout: 0.2,
            seed: 0,
            boosting: BoostingParams::default(),
            neural: NeuralParams::default(),
        }
    }
}

impl ExperimentConfig {
    /// Load a configuration from a JSON file.
    ///
    /// Missing fields take their defaults, so a partial config is valid.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file cannot be read or parsed.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref()).map_err(|e| {
            Error::Config(format!(
                "cannot read config file {}: {e}",
                path.as_ref().display()
            ))
        })?;
        let config: Self = serde_json::from_str(&text)
            .map_err(|e| Error::Config(format!("invalid config file: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] for out-of-range values.
    pub fn validate(&self) -> Result<()> {
        if self.n_classes < 2 {
            return Err(Error::Config(format!(
                "n_classes must be >= 2, got {}",
                self.n_classes
            )));
        }
        if !(0.0..1.0).contains(&self.holdout) || self.holdout <= 0.0 {
            return Err(Error::Config(format!(
                "holdout must be in (0, 1), got {}",
                self.holdout
            )));
        }
        if self.spectrogram.window == 0 || self.spectrogram.hop == 0 {
            return Err(Error::Config(
                "spectrogram window and hop must be non-zero".to_string(),
            ));
        }
        if self.spectrogram.hop > self.spectrogram.window {
            return Err(Error::Config(format!(
                "spectrogram hop ({}) must not exceed window ({})",
                self.spectrogram.hop, self.spectrogram.window
            )));
        }
        for (name, rate) in [
            ("time_drop_rate", self.augment.time_drop_rate),
            ("freq_drop_rate", self.augment.freq_drop_rate),
        ] {
            if !(0.0..1.0).contains(&rate) {
                return Err(Error::Config(format!(
                    "augment {name} must be in [0, 1), got {rate}"
                )));
            }
        }
        if self.augment.is_active() && self.transform != TransformKind::Spectrogram {
            return Err(Error::Config(
                "stripe dropout requires the spectrogram transform".to_string(),
            ));
        }
        Ok(())
    }
}

//! Feature transforms
//!
//! Converts raw [`Sample`]s into the [`FeatureTensor`] representation
//! consumed by either model family. Transforms are selected by
//! configuration and must be deterministic for a given sample and
//! configuration so repeated runs are comparable.

use serde::{Deserialize, Serialize};

use crate::config::{ExperimentConfig, TransformKind};
use crate::dataset::Sample;
use crate::{Error, Result};

mod augment;
mod spectrogram;

pub use augment::SpecAugment;
pub use spectrogram::Spectrogram;

/// Dense row-major feature tensor produced from one sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureTensor {
    data: Vec<f32>,
    shape: Vec<usize>,
}

impl FeatureTensor {
    /// Build a tensor, checking that the data length matches the shape.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] on a length/shape mismatch.
    pub fn new(data: Vec<f32>, shape: Vec<usize>) -> Result<Self> {
        let expected: usize = shape.iter().product();
        if data.len() != expected {
            return Err(Error::Transform(format!(
                "feature data length {} does not match shape {:?}",
                data.len(),
                shape
            )));
        }
        Ok(Self { data, shape })
    }

    /// Tensor shape, outermost dimension first.
    #[must_use]
    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    /// Flat tabular view of the tensor (row-major).
    #[must_use]
    pub fn flatten(&self) -> &[f32] {
        &self.data
    }

    /// Total number of scalar features.
    #[must_use]
    pub fn n_features(&self) -> usize {
        self.data.len()
    }
}

/// Capability shared by all feature transforms.
pub trait FeatureTransform {
    /// Convert one raw sample into its feature representation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] when the sample payload is malformed
    /// for this transform.
    fn apply(&self, sample: &Sample) -> Result<FeatureTensor>;

    /// Transform name for logging and reports.
    fn name(&self) -> &'static str;
}

/// Transform variant selected from configuration.
#[derive(Debug)]
pub enum TransformPipeline {
    /// Per-channel STFT log-power spectrogram
    Spectrogram(Spectrogram),
    /// Raw channels stacked as `[channels, samples]`
    Identity(Identity),
}

impl TransformPipeline {
    /// Select the transform variant named by the configuration.
    #[must_use]
    pub fn from_config(config: &ExperimentConfig) -> Self {
        match config.transform {
            TransformKind::Spectrogram => Self::Spectrogram(Spectrogram::new(
                config.spectrogram.window,
                config.spectrogram.hop,
                config.n_channels,
            )),
            TransformKind::Identity => Self::Identity(Identity::new(config.n_channels)),
        }
    }
}

impl FeatureTransform for TransformPipeline {
    fn apply(&self, sample: &Sample) -> Result<FeatureTensor> {
        match self {
            Self::Spectrogram(t) => t.apply(sample),
            Self::Identity(t) => t.apply(sample),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Spectrogram(t) => t.name(),
            Self::Identity(t) => t.name(),
        }
    }
}

/// Passthrough transform for tabular experiments.
#[derive(Debug)]
pub struct Identity {
    n_channels: Option<usize>,
}

impl Identity {
    /// Create an identity transform, optionally pinning the channel count.
    #[must_use]
    pub const fn new(n_channels: Option<usize>) -> Self {
        Self { n_channels }
    }
}

impl FeatureTransform for Identity {
    fn apply(&self, sample: &Sample) -> Result<FeatureTensor> {
        let (n_channels, channel_len) = check_channels(sample, self.n_channels)?;
        let mut data = Vec::with_capacity(n_channels * channel_len);
        for channel in &sample.channels {
            data.extend_from_slice(channel);
        }
        FeatureTensor::new(data, vec![n_channels, channel_len])
    }

    fn name(&self) -> &'static str {
        "identity"
    }
}

/// Validate channel layout shared by all transforms.
///
/// Returns `(n_channels, channel_len)` after checking the expected channel
/// count and that all channels have equal length.
pub(crate) fn check_channels(
    sample: &Sample,
    expected: Option<usize>,
) -> Result<(usize, usize)> {
    let n_channels = sample.n_channels();
    if n_channels == 0 {
        return Err(Error::Transform(format!(
            "sample {} has no channels",
            sample.id
        )));
    }
    if let Some(expected) = expected {
        if n_channels != expected {
            return Err(Error::Transform(format!(
                "sample {} has {n_channels} channels, expected {expected}",
                sample.id
            )));
        }
    }

    let channel_len = sample.channels[0].len();
    if sample.channels.iter().any(|ch| ch.len() != channel_len) {
        return Err(Error::Transform(format!(
            "sample {} has ragged channels",
            sample.id
        )));
    }
    if channel_len == 0 {
        return Err(Error::Transform(format!(
            "sample {} has empty channels",
            sample.id
        )));
    }

    Ok((n_channels, channel_len))
}

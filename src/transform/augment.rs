//! Training-time spectrogram augmentation
//!
//! Seeded SpecAugment stripe dropout: randomly placed stripes along the
//! time and frequency axes of a `[channels, freq_bins, frames]` tensor
//! are zeroed. The runner applies this to training features only, never
//! at evaluation, so transform output stays deterministic per sample.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use super::FeatureTensor;
use crate::config::AugmentParams;
use crate::{Error, Result};

/// Seeded stripe-dropout augmenter over spectrogram tensors.
#[derive(Debug)]
pub struct SpecAugment {
    params: AugmentParams,
    rng: StdRng,
}

impl SpecAugment {
    /// Create an augmenter; `seed` makes the stripe placement reproducible.
    #[must_use]
    pub fn new(params: AugmentParams, seed: u64) -> Self {
        Self {
            params,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Whether any stripe dropout is configured.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.params.is_active()
    }

    /// Zero out stripes in place.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transform`] when the tensor is not rank 3
    /// (`[channels, freq_bins, frames]`).
    pub fn apply(&mut self, tensor: &mut FeatureTensor) -> Result<()> {
        if !self.is_active() {
            return Ok(());
        }
        let shape = tensor.shape().to_vec();
        let [channels, freq_bins, frames] = shape.as_slice() else {
            return Err(Error::Transform(format!(
                "stripe dropout needs [channels, freq_bins, frames] features, got shape {shape:?}"
            )));
        };
        let (channels, freq_bins, frames) = (*channels, *freq_bins, *frames);

        for _ in 0..self.params.stripes {
            if let Some((bgn, width)) = self.stripe(frames, self.params.time_drop_rate) {
                for ch in 0..channels {
                    for bin in 0..freq_bins {
                        let base = ch * freq_bins * frames + bin * frames;
                        tensor.data[base + bgn..base + bgn + width].fill(0.0);
                    }
                }
            }
            if let Some((bgn, width)) = self.stripe(freq_bins, self.params.freq_drop_rate) {
                for ch in 0..channels {
                    for bin in bgn..bgn + width {
                        let base = ch * freq_bins * frames + bin * frames;
                        tensor.data[base..base + frames].fill(0.0);
                    }
                }
            }
        }
        Ok(())
    }

    /// Pick one `(begin, width)` stripe along an axis of `total` positions,
    /// with width drawn uniformly below `total * rate`.
    fn stripe(&mut self, total: usize, rate: f64) -> Option<(usize, usize)> {
        let cap = (total as f64 * rate) as usize;
        if cap == 0 {
            return None;
        }
        let width = self.rng.gen_range(0..cap);
        if width == 0 {
            return None;
        }
        let bgn = self.rng.gen_range(0..total - width);
        Some((bgn, width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(time: f64, freq: f64, stripes: usize) -> AugmentParams {
        AugmentParams {
            time_drop_rate: time,
            freq_drop_rate: freq,
            stripes,
        }
    }

    fn tensor(channels: usize, bins: usize, frames: usize) -> FeatureTensor {
        let data: Vec<f32> = (0..channels * bins * frames)
            .map(|i| 1.0 + i as f32 * 0.01)
            .collect();
        FeatureTensor::new(data, vec![channels, bins, frames]).unwrap()
    }

    #[test]
    fn test_inactive_params_leave_tensor_untouched() {
        let mut t = tensor(2, 16, 32);
        let original = t.clone();
        SpecAugment::new(params(0.0, 0.0, 1), 7).apply(&mut t).unwrap();
        assert_eq!(t, original);
        assert!(!SpecAugment::new(params(0.5, 0.5, 0), 7).is_active());
    }

    #[test]
    fn test_stripes_zero_values_and_keep_shape() {
        let mut t = tensor(2, 16, 32);
        let original = t.clone();
        SpecAugment::new(params(0.9, 0.9, 4), 7).apply(&mut t).unwrap();

        assert_eq!(t.shape(), original.shape());
        let zeroed = t.flatten().iter().filter(|&&v| v == 0.0).count();
        assert!(zeroed > 0, "expected some stripes to be dropped");
        assert!(zeroed < t.n_features(), "dropout must not erase the tensor");
        // Untouched entries keep their values
        assert!(t
            .flatten()
            .iter()
            .zip(original.flatten())
            .all(|(&a, &b)| a == 0.0 || a == b));
    }

    #[test]
    fn test_same_seed_gives_same_mask() {
        let mut a = tensor(1, 16, 32);
        let mut b = a.clone();
        SpecAugment::new(params(0.5, 0.5, 2), 11).apply(&mut a).unwrap();
        SpecAugment::new(params(0.5, 0.5, 2), 11).apply(&mut b).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rank_two_features_are_rejected() {
        let mut t = FeatureTensor::new(vec![1.0; 8], vec![2, 4]).unwrap();
        let err = SpecAugment::new(params(0.5, 0.0, 1), 0)
            .apply(&mut t)
            .unwrap_err();
        assert!(matches!(err, Error::Transform(_)));
    }
}

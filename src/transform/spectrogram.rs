//! STFT spectrogram transform
//!
//! Converts each channel of a time-domain recording into a log-power
//! time-frequency representation: Hann-windowed frames, forward FFT,
//! magnitude squared, natural log. Output shape is
//! `[channels, freq_bins, frames]` with `freq_bins = window / 2 + 1`.

use rustfft::{num_complex::Complex, FftPlanner};

use super::{check_channels, FeatureTensor, FeatureTransform};
use crate::dataset::Sample;
use crate::{Error, Result};

/// Floor added before the log so silent frames stay finite.
const POWER_FLOOR: f32 = 1e-10;

/// Per-channel STFT log-power spectrogram.
#[derive(Debug)]
pub struct Spectrogram {
    window: usize,
    hop: usize,
    n_channels: Option<usize>,
    hann: Vec<f32>,
}

impl Spectrogram {
    /// Create a spectrogram transform with the given window and hop sizes.
    #[must_use]
    pub fn new(window: usize, hop: usize, n_channels: Option<usize>) -> Self {
        Self {
            window,
            hop,
            n_channels,
            hann: hann_window(window),
        }
    }

    /// Number of frequency bins per frame.
    #[must_use]
    pub const fn freq_bins(&self) -> usize {
        self.window / 2 + 1
    }

    /// Number of frames produced for a channel of `len` samples.
    #[must_use]
    pub const fn frames(&self, len: usize) -> usize {
        if len < self.window {
            0
        } else {
            (len - self.window) / self.hop + 1
        }
    }
}

impl FeatureTransform for Spectrogram {
    fn apply(&self, sample: &Sample) -> Result<FeatureTensor> {
        let (n_channels, channel_len) = check_channels(sample, self.n_channels)?;

        let frames = self.frames(channel_len);
        if frames == 0 {
            return Err(Error::Transform(format!(
                "sample {} is too short for the spectrogram window ({} < {})",
                sample.id, channel_len, self.window
            )));
        }

        let freq_bins = self.freq_bins();
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(self.window);
        let mut buffer = vec![Complex::new(0.0f32, 0.0); self.window];
        let mut scratch = vec![Complex::new(0.0f32, 0.0); fft.get_inplace_scratch_len()];

        // Layout: channel-major, then frequency, then time
        let mut data = vec![0.0f32; n_channels * freq_bins * frames];
        for (ch_idx, channel) in sample.channels.iter().enumerate() {
            for frame in 0..frames {
                let start = frame * self.hop;
                for (i, (&s, &w)) in channel[start..start + self.window]
                    .iter()
                    .zip(self.hann.iter())
                    .enumerate()
                {
                    buffer[i] = Complex::new(s * w, 0.0);
                }
                fft.process_with_scratch(&mut buffer, &mut scratch);

                for (bin, value) in buffer.iter().take(freq_bins).enumerate() {
                    let power = value.norm_sqr() + POWER_FLOOR;
                    data[ch_idx * freq_bins * frames + bin * frames + frame] = power.ln();
                }
            }
        }

        FeatureTensor::new(data, vec![n_channels, freq_bins, frames])
    }

    fn name(&self) -> &'static str {
        "spectrogram"
    }
}

/// Hann window of the given length.
fn hann_window(len: usize) -> Vec<f32> {
    if len <= 1 {
        return vec![1.0; len];
    }
    (0..len)
        .map(|i| {
            let phase = 2.0 * std::f32::consts::PI * i as f32 / (len - 1) as f32;
            0.5 * (1.0 - phase.cos())
        })
        .collect()
}

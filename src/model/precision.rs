//! Precision capability detection
//!
//! An explicit probe produces the effective precision mode consumed by the
//! neural-network variant's constructor, instead of environment-dependent
//! branching scattered through training code. Mixed precision requested on
//! hardware without reduced-precision acceleration degrades to full
//! precision with a warning rather than aborting.

use candle_core::{DType, Device};
use tracing::{info, warn};

use crate::config::PrecisionMode;

/// Precision actually used by the neural-network variant after resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EffectivePrecision {
    /// f32 everywhere
    Full,
    /// f16 activations/gradients with f32 master weights and loss scaling
    Mixed,
}

impl EffectivePrecision {
    /// Dtype used for forward/backward computation.
    #[must_use]
    pub const fn compute_dtype(self) -> DType {
        match self {
            Self::Full => DType::F32,
            Self::Mixed => DType::F16,
        }
    }

    /// Name for logging and run records.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Mixed => "mixed",
        }
    }
}

/// Result of probing the compute device.
#[derive(Debug)]
pub struct DeviceCapability {
    /// Device the neural variant will compute on
    pub device: Device,
    /// Whether reduced-precision arithmetic is accelerated here
    pub supports_mixed: bool,
}

impl DeviceCapability {
    /// Probe for an accelerator, falling back to CPU.
    #[must_use]
    pub fn probe() -> Self {
        let device = Device::cuda_if_available(0).unwrap_or(Device::Cpu);
        let supports_mixed = device.is_cuda() || device.is_metal();
        info!(
            accelerator = supports_mixed,
            "probed compute device for neural variant"
        );
        Self {
            device,
            supports_mixed,
        }
    }

    /// Resolve a requested precision mode against this device.
    ///
    /// `Auto` picks mixed on an accelerator and full on CPU. A forced
    /// `Mixed` on hardware without support degrades to full precision with
    /// a warning instead of aborting (the CPU fallback behavior).
    #[must_use]
    pub fn resolve(&self, requested: PrecisionMode) -> EffectivePrecision {
        match requested {
            PrecisionMode::Full => EffectivePrecision::Full,
            PrecisionMode::Mixed => {
                if self.supports_mixed {
                    EffectivePrecision::Mixed
                } else {
                    warn!(
                        "mixed precision requested but not accelerated on this hardware; \
                         falling back to full precision"
                    );
                    EffectivePrecision::Full
                }
            }
            PrecisionMode::Auto => {
                if self.supports_mixed {
                    EffectivePrecision::Mixed
                } else {
                    EffectivePrecision::Full
                }
            }
        }
    }
}

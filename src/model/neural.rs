//! Neural-network model adapter
//!
//! A two-layer MLP over flattened feature tensors, trained with minibatch
//! SGD. Master weights are always f32; under mixed precision the forward
//! and backward passes run activations and gradients in f16, guarded by
//! dynamic loss scaling: the scale is halved and the step skipped when a
//! non-finite gradient appears, and doubled again after a stable interval.

use std::time::Instant;

use candle_core::{DType, Device, Tensor, Var, D};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info};

use super::precision::{DeviceCapability, EffectivePrecision};
use super::{check_fit_contract, Estimator, FitSummary};
use crate::config::{ExperimentConfig, NeuralParams};
use crate::transform::FeatureTensor;
use crate::{Error, Result};

/// Initial loss scale for mixed precision (matches common AMP defaults).
const INITIAL_LOSS_SCALE: f64 = 65536.0;
/// Successful steps between loss-scale growth attempts.
const GROWTH_INTERVAL: usize = 100;

/// Mixed-precision-capable MLP classifier.
pub struct NeuralModel {
    params: NeuralParams,
    n_classes: usize,
    seed: u64,
    device: Device,
    precision: EffectivePrecision,
    net: Option<Mlp>,
    // Per-feature standardization fitted on the training set
    norm: Option<(Tensor, Tensor)>,
    n_features: Option<usize>,
}

impl NeuralModel {
    /// Probe the device, resolve the precision mode, and build an
    /// unfitted model.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Precision`] only when no usable device exists at
    /// all; a mixed request on unsupported hardware degrades to full
    /// precision instead.
    pub fn new(config: &ExperimentConfig) -> Result<Self> {
        let capability = DeviceCapability::probe();
        let precision = capability.resolve(config.precision_mode);
        info!(precision = precision.as_str(), "neural variant configured");
        Ok(Self {
            params: config.neural.clone(),
            n_classes: config.n_classes,
            seed: config.seed,
            device: capability.device,
            precision,
            net: None,
            norm: None,
            n_features: None,
        })
    }

    /// Effective precision after capability resolution.
    #[must_use]
    pub const fn precision(&self) -> EffectivePrecision {
        self.precision
    }

    /// Stack flattened rows into one `[n, d]` tensor.
    fn stack(&self, features: &[FeatureTensor], d: usize) -> Result<Tensor> {
        let mut flat = Vec::with_capacity(features.len() * d);
        for f in features {
            flat.extend_from_slice(f.flatten());
        }
        Ok(Tensor::from_vec(flat, (features.len(), d), &self.device)?)
    }

    fn standardize(&self, x: &Tensor) -> Result<Tensor> {
        let (mean, std) = self
            .norm
            .as_ref()
            .ok_or_else(|| Error::Fit("predict called before fit".to_string()))?;
        Ok(x.broadcast_sub(mean)?.broadcast_div(std)?)
    }
}

impl Estimator for NeuralModel {
    fn fit(&mut self, features: &[FeatureTensor], labels: &[u32]) -> Result<FitSummary> {
        let (n, d) = check_fit_contract(features, labels, self.n_classes)?;
        let start = Instant::now();

        self.device.set_seed(self.seed)?;
        let net = Mlp::new(d, self.params.hidden_size, self.n_classes, &self.device)?;

        let x = self.stack(features, d)?;
        let y = Tensor::from_vec(labels.to_vec(), (n,), &self.device)?;

        let mean = x.mean(0)?;
        let std = x
            .broadcast_sub(&mean)?
            .sqr()?
            .mean(0)?
            .affine(1.0, 1e-6)?
            .sqrt()?;
        self.norm = Some((mean, std));
        let x = self.standardize(&x)?;

        let dtype = self.precision.compute_dtype();
        let mut scaler = LossScaler::new(self.precision);
        let lr = self.params.learning_rate;
        let mut loss_history = Vec::with_capacity(self.params.epochs);
        let mut indices: Vec<u32> = (0..n as u32).collect();
        let mut best_loss = f64::INFINITY;
        let mut stale_epochs = 0usize;

        for epoch in 0..self.params.epochs {
            let mut rng = StdRng::seed_from_u64(self.seed.wrapping_add(epoch as u64));
            indices.shuffle(&mut rng);

            let mut epoch_loss = 0.0f64;
            for chunk in indices.chunks(self.params.batch_size.max(1)) {
                let idx = Tensor::from_vec(chunk.to_vec(), (chunk.len(),), &self.device)?;
                let xb = x.index_select(&idx, 0)?;
                let yb = y.index_select(&idx, 0)?;

                let logits = net.forward(&xb, dtype)?;
                let loss = candle_nn::loss::cross_entropy(&logits, &yb)?;
                epoch_loss += f64::from(loss.to_scalar::<f32>()?) * chunk.len() as f64;

                let scaled = loss.affine(scaler.scale(), 0.0)?;
                let grads = scaled.backward()?;
                net.sgd_step(&grads, lr, &mut scaler)?;
            }
            let mean_loss = epoch_loss / n as f64;
            debug!(epoch, loss = mean_loss, scale = scaler.scale(), "epoch complete");
            loss_history.push(mean_loss);

            if let Some(patience) = self.params.patience {
                if mean_loss + 1e-12 < best_loss {
                    best_loss = mean_loss;
                    stale_epochs = 0;
                } else {
                    stale_epochs += 1;
                    if stale_epochs >= patience {
                        info!(epoch, best_loss, "stopping early, training loss stalled");
                        break;
                    }
                }
            }
        }

        self.net = Some(net);
        self.n_features = Some(d);
        let train_seconds = start.elapsed().as_secs_f64();
        info!(
            n_samples = n,
            n_features = d,
            epochs = self.params.epochs,
            precision = self.precision.as_str(),
            train_seconds,
            "neural-network fit complete"
        );

        Ok(FitSummary {
            loss_history,
            train_seconds,
        })
    }

    fn predict(&self, features: &[FeatureTensor]) -> Result<Vec<u32>> {
        let net = self
            .net
            .as_ref()
            .ok_or_else(|| Error::Fit("predict called before fit".to_string()))?;
        let d = self.n_features.unwrap_or(0);
        if features.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(bad) = features.iter().find(|f| f.n_features() != d) {
            return Err(Error::Fit(format!(
                "feature width {} does not match trained width {d}",
                bad.n_features()
            )));
        }

        let x = self.standardize(&self.stack(features, d)?)?;
        let logits = net.forward(&x, self.precision.compute_dtype())?;
        Ok(logits.argmax(D::Minus1)?.to_vec1::<u32>()?)
    }

    fn name(&self) -> &'static str {
        "neural-network"
    }
}

/// Two-layer perceptron with f32 master weights.
struct Mlp {
    w1: Var,
    b1: Var,
    w2: Var,
    b2: Var,
}

impl Mlp {
    fn new(n_features: usize, hidden: usize, n_classes: usize, device: &Device) -> Result<Self> {
        let bound1 = 1.0 / (n_features as f32).sqrt();
        let bound2 = 1.0 / (hidden as f32).sqrt();
        Ok(Self {
            w1: Var::rand(-bound1, bound1, (hidden, n_features), device)?,
            b1: Var::zeros(hidden, DType::F32, device)?,
            w2: Var::rand(-bound2, bound2, (n_classes, hidden), device)?,
            b2: Var::zeros(n_classes, DType::F32, device)?,
        })
    }

    /// Forward pass in `dtype`; logits are returned in f32 so the loss is
    /// always computed at full precision.
    fn forward(&self, x: &Tensor, dtype: DType) -> Result<Tensor> {
        let w1 = self.w1.as_tensor().to_dtype(dtype)?;
        let b1 = self.b1.as_tensor().to_dtype(dtype)?;
        let w2 = self.w2.as_tensor().to_dtype(dtype)?;
        let b2 = self.b2.as_tensor().to_dtype(dtype)?;

        let h = x
            .to_dtype(dtype)?
            .matmul(&w1.t()?)?
            .broadcast_add(&b1)?
            .relu()?;
        let logits = h.matmul(&w2.t()?)?.broadcast_add(&b2)?;
        Ok(logits.to_dtype(DType::F32)?)
    }

    /// Unscale gradients, skip the step on overflow, otherwise apply SGD
    /// to the f32 master weights.
    fn sgd_step(
        &self,
        grads: &candle_core::backprop::GradStore,
        lr: f64,
        scaler: &mut LossScaler,
    ) -> Result<()> {
        let vars = [&self.w1, &self.b1, &self.w2, &self.b2];
        let inv_scale = 1.0 / scaler.scale();

        let mut updates = Vec::with_capacity(vars.len());
        for var in vars {
            let Some(grad) = grads.get(var.as_tensor()) else {
                continue;
            };
            let grad = grad.affine(inv_scale, 0.0)?;
            let magnitude = grad.abs()?.sum_all()?.to_scalar::<f32>()?;
            if !magnitude.is_finite() {
                scaler.on_overflow();
                return Ok(());
            }
            updates.push((var, grad));
        }

        for (var, grad) in updates {
            let next = (var.as_tensor() - grad.affine(lr, 0.0)?)?;
            var.set(&next)?;
        }
        scaler.on_success();
        Ok(())
    }
}

/// Dynamic loss scaler for the mixed-precision path.
///
/// Inactive (scale pinned to 1) at full precision.
struct LossScaler {
    scale: f64,
    active: bool,
    stable_steps: usize,
}

impl LossScaler {
    fn new(precision: EffectivePrecision) -> Self {
        let active = precision == EffectivePrecision::Mixed;
        Self {
            scale: if active { INITIAL_LOSS_SCALE } else { 1.0 },
            active,
            stable_steps: 0,
        }
    }

    const fn scale(&self) -> f64 {
        self.scale
    }

    fn on_overflow(&mut self) {
        if self.active {
            self.scale = (self.scale * 0.5).max(1.0);
            self.stable_steps = 0;
            debug!(scale = self.scale, "loss scale reduced after overflow");
        }
    }

    fn on_success(&mut self) {
        if !self.active {
            return;
        }
        self.stable_steps += 1;
        if self.stable_steps >= GROWTH_INTERVAL {
            self.scale = (self.scale * 2.0).min(INITIAL_LOSS_SCALE * 4.0);
            self.stable_steps = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ModelType, PrecisionMode};

    fn config(n_classes: usize, epochs: usize) -> ExperimentConfig {
        ExperimentConfig {
            model_type: ModelType::NeuralNetwork,
            precision_mode: PrecisionMode::Full,
            n_classes,
            neural: NeuralParams {
                hidden_size: 16,
                epochs,
                batch_size: 8,
                learning_rate: 0.05,
                patience: None,
            },
            ..ExperimentConfig::default()
        }
    }

    fn clustered(n_per_class: usize) -> (Vec<FeatureTensor>, Vec<u32>) {
        let mut features = Vec::new();
        let mut labels = Vec::new();
        for i in 0..n_per_class {
            let jitter = (i % 7) as f32 * 0.05;
            features
                .push(FeatureTensor::new(vec![0.0 + jitter, 0.2 - jitter], vec![2]).unwrap());
            labels.push(0);
            features
                .push(FeatureTensor::new(vec![3.0 - jitter, 2.8 + jitter], vec![2]).unwrap());
            labels.push(1);
        }
        (features, labels)
    }

    #[test]
    fn test_fit_reduces_loss_on_separable_data() {
        let (features, labels) = clustered(16);
        let mut model = NeuralModel::new(&config(2, 30)).unwrap();
        let summary = model.fit(&features, &labels).unwrap();
        assert_eq!(summary.loss_history.len(), 30);
        assert!(
            summary.loss_history.last().unwrap() < summary.loss_history.first().unwrap(),
            "training loss should decrease"
        );
    }

    #[test]
    fn test_prediction_count_and_range() {
        let (features, labels) = clustered(12);
        let mut model = NeuralModel::new(&config(2, 20)).unwrap();
        model.fit(&features, &labels).unwrap();

        let predictions = model.predict(&features).unwrap();
        assert_eq!(predictions.len(), features.len());
        assert!(predictions.iter().all(|&p| p < 2));
    }

    #[test]
    fn test_patience_stops_stalled_training() {
        // Zero learning rate pins the loss, so training must stop after
        // the patience window instead of spending the full epoch budget.
        let mut cfg = config(2, 50);
        cfg.neural.learning_rate = 0.0;
        cfg.neural.patience = Some(2);

        let (features, labels) = clustered(8);
        let mut model = NeuralModel::new(&cfg).unwrap();
        let summary = model.fit(&features, &labels).unwrap();
        assert!(summary.loss_history.len() < 50);
        assert!(summary.loss_history.len() >= 3);
    }

    #[test]
    fn test_mixed_request_on_cpu_trains_at_full_precision() {
        // Fallback property: a mixed request must not abort on hardware
        // without reduced-precision support.
        let cfg = ExperimentConfig {
            precision_mode: PrecisionMode::Mixed,
            ..config(2, 5)
        };
        let (features, labels) = clustered(8);
        let mut model = NeuralModel::new(&cfg).unwrap();
        if !DeviceCapability::probe().supports_mixed {
            assert_eq!(model.precision(), EffectivePrecision::Full);
        }
        model.fit(&features, &labels).unwrap();
        assert_eq!(model.predict(&features).unwrap().len(), features.len());
    }

    #[test]
    fn test_predict_before_fit_is_fit_error() {
        let model = NeuralModel::new(&config(2, 1)).unwrap();
        let features = vec![FeatureTensor::new(vec![1.0, 2.0], vec![2]).unwrap()];
        assert!(matches!(
            model.predict(&features).unwrap_err(),
            Error::Fit(_)
        ));
    }

    #[test]
    fn test_loss_scaler_halves_and_recovers() {
        let mut scaler = LossScaler::new(EffectivePrecision::Mixed);
        let initial = scaler.scale();
        scaler.on_overflow();
        assert!((scaler.scale() - initial * 0.5).abs() < f64::EPSILON);

        for _ in 0..GROWTH_INTERVAL {
            scaler.on_success();
        }
        assert!((scaler.scale() - initial).abs() < f64::EPSILON);
    }

    #[test]
    fn test_loss_scaler_inactive_at_full_precision() {
        let mut scaler = LossScaler::new(EffectivePrecision::Full);
        scaler.on_overflow();
        assert!((scaler.scale() - 1.0).abs() < f64::EPSILON);
    }
}

//! Batch normalization layer implementation
//!
//! Normalizes activations across the batch dimension, then applies a learnable
//! scale (gamma) and shift (beta):
//!
//! 1. Compute batch statistics: mean μ and variance σ² across the batch
//! 2. Normalize: x_norm = (x - μ) / sqrt(σ² + ε)
//! 3. Scale and shift: y = γ * x_norm + β
//!
//! In `Mode::Train` the batch statistics are used and folded into running
//! statistics by exponential moving average. In `Mode::Eval` the running
//! statistics are used instead.
//!
//! # References
//!
//! Ioffe, S., & Szegedy, C. (2015). Batch Normalization: Accelerating Deep Network Training
//! by Reducing Internal Covariate Shift. ICML.

use crate::layers::{Layer, Mode, Param};

/// Batch normalization layer with learnable scale and shift parameters.
///
/// # Fields
///
/// * `size` - Number of input/output features
/// * `epsilon` - Small constant for numerical stability
/// * `momentum` - Momentum for updating running statistics
/// * `gamma` - Learnable scale parameter (initialized to 1.0)
/// * `beta` - Learnable shift parameter (initialized to 0.0)
/// * `running_mean` - Running average of means (initialized to 0.0)
/// * `running_var` - Running average of variances (initialized to 1.0)
///
/// # Example
///
/// ```
/// use conv_classifier::layers::{BatchNormLayer, Layer};
///
/// let layer = BatchNormLayer::new(512, 1e-3, 0.9);
/// assert_eq!(layer.output_size(), 512);
/// assert_eq!(layer.parameter_count(), 1024); // 512 gamma + 512 beta
/// ```
#[derive(Debug, Clone)]
pub struct BatchNormLayer {
    size: usize,
    epsilon: f32,
    momentum: f32,

    gamma: Param,
    beta: Param,

    running_mean: Vec<f32>,
    running_var: Vec<f32>,

    // Cached from the last training forward pass
    cached_normalized: Vec<f32>,
    cached_std: Vec<f32>,
    cached_mode: Mode,
}

impl BatchNormLayer {
    /// Creates a new batch normalization layer.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of input/output features
    /// * `epsilon` - Small constant for numerical stability (must be positive)
    /// * `momentum` - Momentum for the running statistics EMA, in [0.0, 1.0]
    pub fn new(size: usize, epsilon: f32, momentum: f32) -> Self {
        assert!(epsilon > 0.0, "epsilon must be positive");
        assert!(
            (0.0..=1.0).contains(&momentum),
            "momentum must be in range [0.0, 1.0]"
        );

        Self {
            size,
            epsilon,
            momentum,
            gamma: Param::filled(size, 1.0),
            beta: Param::filled(size, 0.0),
            running_mean: vec![0.0f32; size],
            running_var: vec![1.0f32; size],
            cached_normalized: Vec::new(),
            cached_std: Vec::new(),
            cached_mode: Mode::Eval,
        }
    }

    pub fn epsilon(&self) -> f32 {
        self.epsilon
    }

    pub fn momentum(&self) -> f32 {
        self.momentum
    }

    pub fn gamma(&self) -> &[f32] {
        &self.gamma.value
    }

    pub fn beta(&self) -> &[f32] {
        &self.beta.value
    }

    pub fn running_mean(&self) -> &[f32] {
        &self.running_mean
    }

    pub fn running_var(&self) -> &[f32] {
        &self.running_var
    }
}

impl Layer for BatchNormLayer {
    fn forward(&mut self, input: &[f32], output: &mut [f32], batch_size: usize, mode: Mode) {
        let total_size = batch_size * self.size;
        assert_eq!(
            input.len(),
            total_size,
            "input len mismatch: expected {}, got {}",
            total_size,
            input.len()
        );
        assert_eq!(
            output.len(),
            total_size,
            "output len mismatch: expected {}, got {}",
            total_size,
            output.len()
        );

        self.cached_mode = mode;
        let gamma = &self.gamma.value;
        let beta = &self.beta.value;

        match mode {
            Mode::Train => {
                let n = batch_size as f32;
                let mut batch_mean = vec![0.0f32; self.size];
                let mut batch_var = vec![0.0f32; self.size];

                for row in input.chunks_exact(self.size) {
                    for (m, &x) in batch_mean.iter_mut().zip(row) {
                        *m += x;
                    }
                }
                for mean in &mut batch_mean {
                    *mean /= n;
                }

                for row in input.chunks_exact(self.size) {
                    for j in 0..self.size {
                        let diff = row[j] - batch_mean[j];
                        batch_var[j] += diff * diff;
                    }
                }
                for var in &mut batch_var {
                    *var /= n;
                }

                let std: Vec<f32> = batch_var
                    .iter()
                    .map(|&v| (v + self.epsilon).sqrt())
                    .collect();

                let mut normalized = vec![0.0f32; total_size];
                for i in 0..batch_size {
                    for j in 0..self.size {
                        let idx = i * self.size + j;
                        normalized[idx] = (input[idx] - batch_mean[j]) / std[j];
                        output[idx] = gamma[j] * normalized[idx] + beta[j];
                    }
                }

                // running = momentum * running + (1 - momentum) * batch
                for j in 0..self.size {
                    self.running_mean[j] =
                        self.momentum * self.running_mean[j] + (1.0 - self.momentum) * batch_mean[j];
                    self.running_var[j] =
                        self.momentum * self.running_var[j] + (1.0 - self.momentum) * batch_var[j];
                }

                self.cached_normalized = normalized;
                self.cached_std = std;
            }
            Mode::Eval => {
                for i in 0..batch_size {
                    for j in 0..self.size {
                        let idx = i * self.size + j;
                        let normalized = (input[idx] - self.running_mean[j])
                            / (self.running_var[j] + self.epsilon).sqrt();
                        output[idx] = gamma[j] * normalized + beta[j];
                    }
                }
            }
        }
    }

    fn backward(
        &mut self,
        _input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        let total_size = batch_size * self.size;
        assert_eq!(grad_output.len(), total_size, "grad_output len mismatch");
        assert_eq!(grad_input.len(), total_size, "grad_input len mismatch");

        if self.cached_mode == Mode::Eval {
            // Running statistics are constants: the layer is an affine map
            for i in 0..batch_size {
                for j in 0..self.size {
                    let idx = i * self.size + j;
                    grad_input[idx] = grad_output[idx] * self.gamma.value[j]
                        / (self.running_var[j] + self.epsilon).sqrt();
                }
            }
            return;
        }

        assert_eq!(self.cached_normalized.len(), total_size, "backward called without matching forward");
        let normalized = &self.cached_normalized;
        let std = &self.cached_std;
        let n = batch_size as f32;

        // Per-feature sums of dL/dx_norm and dL/dx_norm * x_norm
        let mut sum_grad = vec![0.0f32; self.size];
        let mut sum_grad_norm = vec![0.0f32; self.size];
        for i in 0..batch_size {
            for j in 0..self.size {
                let idx = i * self.size + j;
                let g = grad_output[idx];
                self.gamma.grad[j] += g * normalized[idx];
                self.beta.grad[j] += g;

                let g_norm = g * self.gamma.value[j];
                sum_grad[j] += g_norm;
                sum_grad_norm[j] += g_norm * normalized[idx];
            }
        }

        // dx = (n * dx_norm - Σ dx_norm - x_norm * Σ(dx_norm * x_norm)) / (n * std)
        for i in 0..batch_size {
            for j in 0..self.size {
                let idx = i * self.size + j;
                let g_norm = grad_output[idx] * self.gamma.value[j];
                grad_input[idx] = (n * g_norm - sum_grad[j] - normalized[idx] * sum_grad_norm[j])
                    / (n * std[j]);
            }
        }
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }

    fn parameters(&self) -> Vec<&Param> {
        vec![&self.gamma, &self.beta]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.gamma, &mut self.beta]
    }

    fn state(&self) -> Vec<&[f32]> {
        vec![
            &self.gamma.value,
            &self.beta.value,
            &self.running_mean,
            &self.running_var,
        ]
    }

    fn state_mut(&mut self) -> Vec<&mut Vec<f32>> {
        vec![
            &mut self.gamma.value,
            &mut self.beta.value,
            &mut self.running_mean,
            &mut self.running_var,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_train_forward_normalizes_batch() {
        let mut layer = BatchNormLayer::new(2, 1e-5, 0.9);
        let input = vec![1.0, 10.0, 3.0, 20.0, 5.0, 30.0];
        let mut output = vec![0.0; 6];
        layer.forward(&input, &mut output, 3, Mode::Train);

        for j in 0..2 {
            let column: Vec<f32> = (0..3).map(|i| output[i * 2 + j]).collect();
            let mean: f32 = column.iter().sum::<f32>() / 3.0;
            let var: f32 = column.iter().map(|v| (v - mean).powi(2)).sum::<f32>() / 3.0;
            assert_relative_eq!(mean, 0.0, epsilon = 1e-5);
            assert_relative_eq!(var, 1.0, epsilon = 1e-3);
        }
    }

    #[test]
    fn test_running_statistics_update() {
        let mut layer = BatchNormLayer::new(1, 1e-5, 0.9);
        let input = vec![2.0, 4.0];
        let mut output = vec![0.0; 2];
        layer.forward(&input, &mut output, 2, Mode::Train);

        // mean 3, var 1
        assert_relative_eq!(layer.running_mean()[0], 0.3, epsilon = 1e-6);
        assert_relative_eq!(layer.running_var()[0], 1.0, epsilon = 1e-6);
    }

    #[test]
    fn test_eval_uses_running_statistics() {
        let mut layer = BatchNormLayer::new(1, 1e-5, 0.9);
        let input = vec![5.0];
        let mut output = vec![0.0];
        layer.forward(&input, &mut output, 1, Mode::Eval);

        // running mean 0, running var 1 at initialisation
        assert_relative_eq!(output[0], 5.0 / (1.0f32 + 1e-5).sqrt(), epsilon = 1e-6);
        assert_eq!(layer.running_mean()[0], 0.0);
    }

    #[test]
    fn test_state_includes_running_statistics() {
        let layer = BatchNormLayer::new(3, 1e-3, 0.9);
        assert_eq!(layer.state().len(), 4);
        assert_eq!(layer.parameters().len(), 2);
    }

    #[test]
    fn test_backward_gradient_sums_to_zero() {
        let mut layer = BatchNormLayer::new(1, 1e-5, 0.9);
        let input = vec![1.0, 2.0, 4.0, 7.0];
        let mut output = vec![0.0; 4];
        layer.forward(&input, &mut output, 4, Mode::Train);

        let grad_output = vec![0.3, -0.1, 0.8, 0.2];
        let mut grad_input = vec![0.0; 4];
        layer.backward(&input, &grad_output, &mut grad_input, 4);

        // Shifting every input by a constant leaves the output unchanged
        let total: f32 = grad_input.iter().sum();
        assert_relative_eq!(total, 0.0, epsilon = 1e-5);
        assert_relative_eq!(layer.beta.grad[0], 1.2, epsilon = 1e-6);
    }
}

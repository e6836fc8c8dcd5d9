//! Dense (fully connected) layer implementation
//!
//! This module provides a DenseLayer (also known as Linear or Fully Connected layer)
//! that performs the transformation: output = input × weights + biases

use crate::layers::{Layer, Mode, Param};
use crate::utils::SimpleRng;

/// Dense (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch_size × input_size),
/// W is the weight matrix (input_size × output_size),
/// and b is the bias vector (output_size).
///
/// # Example
///
/// ```
/// use conv_classifier::layers::{DenseLayer, Layer};
/// use conv_classifier::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(784, 512, &mut rng);
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 512);
/// ```
#[derive(Debug, Clone)]
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    /// Row-major (input_size × output_size)
    weights: Param,
    biases: Param,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled from the uniform distribution [-limit, limit]
    /// where limit = sqrt(6 / (input_size + output_size)). Biases start at zero.
    pub fn new(input_size: usize, output_size: usize, rng: &mut SimpleRng) -> Self {
        // Xavier initialization: limit = sqrt(6 / (fan_in + fan_out))
        let mut weights = vec![0.0f32; input_size * output_size];
        let limit = (6.0f32 / (input_size + output_size) as f32).sqrt();

        for value in &mut weights {
            *value = rng.gen_range_f32(-limit, limit);
        }

        Self {
            input_size,
            output_size,
            weights: Param::new(weights),
            biases: Param::filled(output_size, 0.0),
        }
    }

    pub fn weights(&self) -> &Param {
        &self.weights
    }

    pub fn biases(&self) -> &Param {
        &self.biases
    }
}

impl Layer for DenseLayer {
    fn forward(&mut self, input: &[f32], output: &mut [f32], batch_size: usize, _mode: Mode) {
        assert_eq!(input.len(), batch_size * self.input_size, "dense input len mismatch");
        assert_eq!(output.len(), batch_size * self.output_size, "dense output len mismatch");

        let weights = &self.weights.value;
        let biases = &self.biases.value;
        for b in 0..batch_size {
            let in_offset = b * self.input_size;
            let out_offset = b * self.output_size;

            for j in 0..self.output_size {
                let mut sum = biases[j];
                for i in 0..self.input_size {
                    sum += input[in_offset + i] * weights[i * self.output_size + j];
                }
                output[out_offset + j] = sum;
            }
        }
    }

    fn backward(
        &mut self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        assert_eq!(grad_output.len(), batch_size * self.output_size, "dense grad_output len mismatch");
        assert_eq!(grad_input.len(), batch_size * self.input_size, "dense grad_input len mismatch");

        let weights = &self.weights.value;
        let grad_w = &mut self.weights.grad;
        let grad_b = &mut self.biases.grad;

        // grad_input is overwritten, parameter gradients accumulate
        for v in grad_input.iter_mut() {
            *v = 0.0;
        }

        for b in 0..batch_size {
            let in_offset = b * self.input_size;
            let out_offset = b * self.output_size;

            for j in 0..self.output_size {
                let g = grad_output[out_offset + j];
                grad_b[j] += g;

                for i in 0..self.input_size {
                    grad_w[i * self.output_size + j] += input[in_offset + i] * g;
                    grad_input[in_offset + i] += g * weights[i * self.output_size + j];
                }
            }
        }
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }

    fn parameters(&self) -> Vec<&Param> {
        vec![&self.weights, &self.biases]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}

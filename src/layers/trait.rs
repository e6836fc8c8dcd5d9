//! Layer trait definition for the classifier's layers
//!
//! This module defines the core Layer trait that all layer types implement,
//! together with the `Mode` switch that selects train or eval behaviour.

use super::Param;

/// Whether a forward pass is part of training or evaluation.
///
/// Dropout is only active in `Train`; batch normalisation uses batch
/// statistics in `Train` and running statistics in `Eval`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Train,
    Eval,
}

impl Mode {
    pub fn is_train(self) -> bool {
        matches!(self, Mode::Train)
    }
}

/// Core trait for neural network layers.
///
/// All layer types (Dense, Conv2D, etc.) implement this trait to provide
/// a uniform interface for forward and backward propagation.
///
/// # Type Parameters
///
/// Layers work with f32 data stored as flat row-major buffers.
///
/// # Example
///
/// ```ignore
/// // Forward pass through a layer
/// let mut output = vec![0.0f32; batch_size * layer.output_size()];
/// layer.forward(&input, &mut output, batch_size, Mode::Train);
///
/// // Backward pass to accumulate gradients
/// let mut grad_input = vec![0.0f32; batch_size * layer.input_size()];
/// layer.backward(&input, &grad_output, &mut grad_input, batch_size);
/// ```
pub trait Layer {
    /// Forward propagation through the layer.
    ///
    /// Computes the layer output given input data and caches whatever the
    /// backward pass needs.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data flattened as a 1D array (batch_size × input_size)
    /// * `output` - Output buffer to store results (batch_size × output_size)
    /// * `batch_size` - Number of samples in the batch
    /// * `mode` - Train or eval behaviour
    ///
    /// # Panics
    ///
    /// Implementations may panic if input/output dimensions don't match expected sizes.
    fn forward(&mut self, input: &[f32], output: &mut [f32], batch_size: usize, mode: Mode);

    /// Backward propagation through the layer.
    ///
    /// Writes the gradient with respect to the inputs into `grad_input` and
    /// accumulates parameter gradients into the layer's `Param`s.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data from the matching forward pass (batch_size × input_size)
    /// * `grad_output` - Gradient of loss w.r.t. layer output (batch_size × output_size)
    /// * `grad_input` - Buffer to store gradient w.r.t. input (batch_size × input_size)
    /// * `batch_size` - Number of samples in the batch
    fn backward(
        &mut self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    );

    /// Get the input size of the layer (features per sample).
    fn input_size(&self) -> usize;

    /// Get the output size of the layer (features per sample).
    fn output_size(&self) -> usize;

    /// Trainable parameters, in a fixed order.
    fn parameters(&self) -> Vec<&Param> {
        Vec::new()
    }

    /// Mutable access to the trainable parameters, same order as `parameters`.
    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        Vec::new()
    }

    /// Every tensor a checkpoint must capture: the parameter values plus any
    /// non-trainable state.
    fn state(&self) -> Vec<&[f32]> {
        self.parameters()
            .into_iter()
            .map(|p| p.value.as_slice())
            .collect()
    }

    /// Mutable view of the tensors returned by `state`, same order.
    fn state_mut(&mut self) -> Vec<&mut Vec<f32>> {
        self.parameters_mut()
            .into_iter()
            .map(|p| &mut p.value)
            .collect()
    }

    /// Get the number of trainable parameters in the layer.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

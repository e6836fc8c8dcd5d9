//! Dropout layer implementation for regularization
//!
//! During `Mode::Train` each unit is zeroed with probability `drop_rate` and
//! survivors are scaled by `1 / (1 - drop_rate)` (inverted dropout). During
//! `Mode::Eval` inputs pass through unchanged.

use crate::layers::{Layer, Mode};
use crate::utils::SimpleRng;

/// Dropout layer for regularization.
///
/// # Fields
///
/// * `size` - Number of input/output features (dropout doesn't change dimensions)
/// * `drop_rate` - Probability of dropping each unit (0.0 = no dropout)
/// * `mask` - Per-element multiplier from the last forward pass, scale folded in
/// * `rng` - Generator for the dropout masks, forked from the model seed
///
/// # Example
///
/// ```
/// use conv_classifier::layers::{DropoutLayer, Layer, Mode};
/// use conv_classifier::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DropoutLayer::new(4, 0.5, &mut rng);
/// let mut output = vec![0.0f32; 4];
/// layer.forward(&[1.0; 4], &mut output, 1, Mode::Eval);
/// assert_eq!(output, vec![1.0; 4]);
/// ```
#[derive(Debug, Clone)]
pub struct DropoutLayer {
    size: usize,
    drop_rate: f32,
    mask: Vec<f32>,
    rng: SimpleRng,
}

impl DropoutLayer {
    /// Creates a new dropout layer.
    ///
    /// # Arguments
    ///
    /// * `size` - Number of input/output features
    /// * `drop_rate` - Probability of dropping each unit, in [0.0, 1.0)
    /// * `rng` - Parent generator; the layer draws from an independent fork
    pub fn new(size: usize, drop_rate: f32, rng: &mut SimpleRng) -> Self {
        assert!(
            (0.0..1.0).contains(&drop_rate),
            "drop_rate must be in range [0.0, 1.0)"
        );

        Self {
            size,
            drop_rate,
            mask: Vec::new(),
            rng: rng.fork(),
        }
    }

    pub fn drop_rate(&self) -> f32 {
        self.drop_rate
    }
}

impl Layer for DropoutLayer {
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

        self.mask.clear();
        if !mode.is_train() || self.drop_rate == 0.0 {
            self.mask.resize(total_size, 1.0);
            output.copy_from_slice(input);
            return;
        }

        let scale = 1.0 / (1.0 - self.drop_rate);
        self.mask.reserve(total_size);
        for (out, &x) in output.iter_mut().zip(input) {
            let keep = if self.rng.next_f32() >= self.drop_rate {
                scale
            } else {
                0.0
            };
            self.mask.push(keep);
            *out = x * keep;
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
        assert_eq!(self.mask.len(), total_size, "backward called without matching forward");

        for ((gi, &g), &m) in grad_input.iter_mut().zip(grad_output).zip(&self.mask) {
            *gi = g * m;
        }
    }

    fn input_size(&self) -> usize {
        self.size
    }

    fn output_size(&self) -> usize {
        self.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dropout_has_no_parameters() {
        let mut rng = SimpleRng::new(42);
        let layer = DropoutLayer::new(128, 0.5, &mut rng);
        assert_eq!(layer.parameter_count(), 0);
        assert!(layer.state().is_empty());
    }

    #[test]
    #[should_panic(expected = "drop_rate must be in range")]
    fn test_dropout_invalid_rate() {
        let mut rng = SimpleRng::new(42);
        DropoutLayer::new(10, 1.0, &mut rng);
    }

    #[test]
    fn test_train_mode_zeroes_or_scales() {
        let mut rng = SimpleRng::new(7);
        let mut layer = DropoutLayer::new(200, 0.5, &mut rng);
        let input = vec![1.0f32; 200];
        let mut output = vec![0.0f32; 200];
        layer.forward(&input, &mut output, 1, Mode::Train);

        assert!(output.iter().all(|&v| v == 0.0 || v == 2.0));
        assert!(output.iter().any(|&v| v == 0.0));
        assert!(output.iter().any(|&v| v == 2.0));
    }

    #[test]
    fn test_dropout_deterministic_for_seed() {
        let input = vec![1.0f32; 64];
        let run = || {
            let mut rng = SimpleRng::new(11);
            let mut layer = DropoutLayer::new(64, 0.3, &mut rng);
            let mut output = vec![0.0f32; 64];
            layer.forward(&input, &mut output, 1, Mode::Train);
            output
        };
        assert_eq!(run(), run());
    }

    #[test]
    fn test_backward_applies_mask() {
        let mut rng = SimpleRng::new(5);
        let mut layer = DropoutLayer::new(50, 0.4, &mut rng);
        let input = vec![1.0f32; 100];
        let mut output = vec![0.0f32; 100];
        layer.forward(&input, &mut output, 2, Mode::Train);

        let grad_output = vec![1.0f32; 100];
        let mut grad_input = vec![0.0f32; 100];
        layer.backward(&input, &grad_output, &mut grad_input, 2);

        // Same mask and scale as the forward pass
        assert_eq!(grad_input, output);
    }

    #[test]
    fn test_scaling_preserves_expected_value() {
        let mut rng = SimpleRng::new(42);
        let mut layer = DropoutLayer::new(1000, 0.5, &mut rng);
        let input = vec![1.0f32; 1000];
        let mut output = vec![0.0f32; 1000];
        layer.forward(&input, &mut output, 1, Mode::Train);

        let output_sum: f32 = output.iter().sum();
        assert!((output_sum - 1000.0).abs() < 100.0, "got {}", output_sum);
    }
}

//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that performs 2D convolution over
//! channel-major feature maps (channels × height × width per sample).

use crate::layers::{Layer, Mode, Param};
use crate::utils::SimpleRng;

/// 2D Convolutional layer with learnable filters.
///
/// Performs 2D convolution: slides filters over input to produce feature maps.
/// Supports zero-padding and configurable stride.
///
/// # Fields
///
/// * `in_channels` - Number of input channels
/// * `out_channels` - Number of output feature maps (number of filters)
/// * `kernel_size` - Size of the convolutional kernel (square)
/// * `padding` - Zero-padding applied to input (symmetric on all sides)
/// * `stride` - Stride for the convolution operation
/// * `weights` - Filters (out_channels × in_channels × kernel_size × kernel_size)
/// * `biases` - Bias for each output channel (out_channels)
///
/// # Example
///
/// ```
/// use conv_classifier::layers::Conv2DLayer;
/// use conv_classifier::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// // 1 input channel, 8 output channels, 3x3 kernel, "same" padding
/// let layer = Conv2DLayer::same(1, 8, 3, 28, 28, &mut rng);
/// assert_eq!(layer.output_height(), 28);
/// ```
#[derive(Debug, Clone)]
pub struct Conv2DLayer {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    padding: isize,
    stride: usize,
    input_height: usize,
    input_width: usize,
    weights: Param,
    biases: Param,
}

impl Conv2DLayer {
    /// Create a new Conv2DLayer with Xavier initialization.
    ///
    /// For convolutions: fan_in = in_channels × kernel_size², fan_out = out_channels × kernel_size².
    /// Biases are initialized to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: isize,
        stride: usize,
        input_height: usize,
        input_width: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        let fan_in = (in_channels * kernel_size * kernel_size) as f32;
        let fan_out = (out_channels * kernel_size * kernel_size) as f32;
        let limit = (6.0f32 / (fan_in + fan_out)).sqrt();

        let weight_count = out_channels * in_channels * kernel_size * kernel_size;
        let mut weights = vec![0.0f32; weight_count];

        for value in &mut weights {
            *value = rng.gen_range_f32(-limit, limit);
        }

        Self {
            in_channels,
            out_channels,
            kernel_size,
            padding,
            stride,
            input_height,
            input_width,
            weights: Param::new(weights),
            biases: Param::filled(out_channels, 0.0),
        }
    }

    /// Stride-1 convolution with "same" padding `(kernel_size - 1) / 2`.
    ///
    /// Odd kernels preserve the spatial size; even kernels shrink it by one.
    pub fn same(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        input_height: usize,
        input_width: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        let padding = ((kernel_size - 1) / 2) as isize;
        Self::new(
            in_channels,
            out_channels,
            kernel_size,
            padding,
            1,
            input_height,
            input_width,
            rng,
        )
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    /// Get the output height after convolution.
    ///
    /// Calculated as: (input_height + 2*padding - kernel_size) / stride + 1
    pub fn output_height(&self) -> usize {
        ((self.input_height as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    /// Get the output width after convolution.
    ///
    /// Calculated as: (input_width + 2*padding - kernel_size) / stride + 1
    pub fn output_width(&self) -> usize {
        ((self.input_width as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    pub fn weights(&self) -> &Param {
        &self.weights
    }

    /// Input coordinate for an output position and kernel offset, or `None`
    /// when it falls into the zero padding.
    fn input_coord(&self, out_pos: usize, k: usize, extent: usize) -> Option<usize> {
        let pos = out_pos as isize * self.stride as isize + k as isize - self.padding;
        if pos >= 0 && pos < extent as isize {
            Some(pos as usize)
        } else {
            None
        }
    }
}

impl Layer for Conv2DLayer {
    fn forward(&mut self, input: &[f32], output: &mut [f32], batch_size: usize, _mode: Mode) {
        assert_eq!(input.len(), batch_size * self.input_size(), "conv input len mismatch");
        assert_eq!(output.len(), batch_size * self.output_size(), "conv output len mismatch");

        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;
        let weights = &self.weights.value;

        for b in 0..batch_size {
            let in_base = b * (self.in_channels * in_spatial);
            let out_base_b = b * (self.out_channels * out_spatial);

            for oc in 0..self.out_channels {
                let bias = self.biases.value[oc];
                let out_base = out_base_b + oc * out_spatial;

                for oy in 0..out_h {
                    for ox in 0..out_w {
                        let mut sum = bias;

                        for ic in 0..self.in_channels {
                            let w_base = (oc * self.in_channels + ic) * k * k;
                            let in_base_c = in_base + ic * in_spatial;

                            for ky in 0..k {
                                let Some(iy) = self.input_coord(oy, ky, self.input_height) else {
                                    continue;
                                };
                                for kx in 0..k {
                                    if let Some(ix) = self.input_coord(ox, kx, self.input_width) {
                                        let in_idx = in_base_c + iy * self.input_width + ix;
                                        sum += input[in_idx] * weights[w_base + ky * k + kx];
                                    }
                                }
                            }
                        }

                        output[out_base + oy * out_w + ox] = sum;
                    }
                }
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
        assert_eq!(grad_output.len(), batch_size * self.output_size(), "conv grad_output len mismatch");
        assert_eq!(grad_input.len(), batch_size * self.input_size(), "conv grad_input len mismatch");

        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;

        for v in grad_input.iter_mut() {
            *v = 0.0;
        }

        let mut grad_w = std::mem::take(&mut self.weights.grad);
        let mut grad_b = std::mem::take(&mut self.biases.grad);

        for b in 0..batch_size {
            let in_base = b * (self.in_channels * in_spatial);
            let g_base_b = b * (self.out_channels * out_spatial);

            for oc in 0..self.out_channels {
                let g_base = g_base_b + oc * out_spatial;

                for oy in 0..out_h {
                    for ox in 0..out_w {
                        grad_b[oc] += grad_output[g_base + oy * out_w + ox];
                    }
                }

                for ic in 0..self.in_channels {
                    let w_base = (oc * self.in_channels + ic) * k * k;
                    let in_base_c = in_base + ic * in_spatial;

                    for oy in 0..out_h {
                        for ox in 0..out_w {
                            let g = grad_output[g_base + oy * out_w + ox];
                            if g == 0.0 {
                                continue;
                            }

                            for ky in 0..k {
                                let Some(iy) = self.input_coord(oy, ky, self.input_height) else {
                                    continue;
                                };
                                for kx in 0..k {
                                    if let Some(ix) = self.input_coord(ox, kx, self.input_width) {
                                        let in_idx = in_base_c + iy * self.input_width + ix;
                                        let w_idx = w_base + ky * k + kx;
                                        grad_w[w_idx] += g * input[in_idx];
                                        grad_input[in_idx] += g * self.weights.value[w_idx];
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }

        self.weights.grad = grad_w;
        self.biases.grad = grad_b;
    }

    fn input_size(&self) -> usize {
        self.in_channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.out_channels * self.output_height() * self.output_width()
    }

    fn parameters(&self) -> Vec<&Param> {
        vec![&self.weights, &self.biases]
    }

    fn parameters_mut(&mut self) -> Vec<&mut Param> {
        vec![&mut self.weights, &mut self.biases]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv2d_parameter_count() {
        let mut rng = SimpleRng::new(42);
        let layer = Conv2DLayer::new(1, 8, 3, 1, 1, 28, 28, &mut rng);

        // weights: 8 * 1 * 3 * 3 = 72, biases: 8
        assert_eq!(layer.parameter_count(), 80);
    }

    #[test]
    fn test_conv2d_output_dimensions_no_padding() {
        let mut rng = SimpleRng::new(42);
        let layer = Conv2DLayer::new(1, 8, 3, 0, 1, 28, 28, &mut rng);

        assert_eq!(layer.output_height(), 26);
        assert_eq!(layer.output_width(), 26);
    }

    #[test]
    fn test_same_padding_keeps_odd_kernel_size() {
        let mut rng = SimpleRng::new(42);
        let layer = Conv2DLayer::same(3, 4, 5, 9, 7, &mut rng);

        assert_eq!(layer.output_height(), 9);
        assert_eq!(layer.output_width(), 7);
        assert_eq!(layer.output_size(), 4 * 9 * 7);
    }

    #[test]
    fn test_forward_identity_kernel() {
        let mut rng = SimpleRng::new(42);
        let mut layer = Conv2DLayer::same(1, 1, 3, 3, 3, &mut rng);
        // Centre tap only: the convolution copies its input
        layer.weights.value = vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0];

        let input: Vec<f32> = (0..9).map(|v| v as f32).collect();
        let mut output = vec![0.0; 9];
        layer.forward(&input, &mut output, 1, Mode::Eval);

        assert_eq!(output, input);
    }

    #[test]
    fn test_backward_bias_gradient_sums_spatial_positions() {
        let mut rng = SimpleRng::new(3);
        let mut layer = Conv2DLayer::same(1, 2, 3, 2, 2, &mut rng);

        let input = vec![1.0; 4];
        let grad_output = vec![1.0; 8];
        let mut grad_input = vec![0.0; 4];
        layer.backward(&input, &grad_output, &mut grad_input, 1);

        assert_eq!(layer.biases.grad, vec![4.0, 4.0]);
    }
}

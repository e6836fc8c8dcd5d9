//! Max-pooling layer
//!
//! Non-overlapping `pool × pool` windows with stride `pool` and "same"
//! output size: `ceil(input / pool)`. Windows on the bottom/right edge are
//! clipped to the input instead of padded.

use crate::layers::{Layer, Mode};

/// Max-pooling over channel-major feature maps.
///
/// The forward pass records the argmax of every window so the backward pass
/// can route each gradient to the input position that produced the maximum.
///
/// # Example
///
/// ```
/// use conv_classifier::layers::{Layer, MaxPoolLayer};
///
/// let layer = MaxPoolLayer::new(8, 7, 7, 2);
/// assert_eq!(layer.output_height(), 4);
/// assert_eq!(layer.output_size(), 8 * 4 * 4);
/// ```
#[derive(Debug, Clone)]
pub struct MaxPoolLayer {
    channels: usize,
    input_height: usize,
    input_width: usize,
    pool: usize,
    /// Flat input index of the maximum for each output element
    argmax: Vec<usize>,
}

impl MaxPoolLayer {
    pub fn new(channels: usize, input_height: usize, input_width: usize, pool: usize) -> Self {
        assert!(pool > 0, "pool size must be positive");
        Self {
            channels,
            input_height,
            input_width,
            pool,
            argmax: Vec::new(),
        }
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn output_height(&self) -> usize {
        self.input_height.div_ceil(self.pool)
    }

    pub fn output_width(&self) -> usize {
        self.input_width.div_ceil(self.pool)
    }
}

impl Layer for MaxPoolLayer {
    fn forward(&mut self, input: &[f32], output: &mut [f32], batch_size: usize, _mode: Mode) {
        assert_eq!(input.len(), batch_size * self.input_size(), "pool input len mismatch");
        assert_eq!(output.len(), batch_size * self.output_size(), "pool output len mismatch");

        let out_h = self.output_height();
        let out_w = self.output_width();
        let in_spatial = self.input_height * self.input_width;
        let out_spatial = out_h * out_w;

        self.argmax.clear();
        self.argmax.resize(output.len(), 0);

        for b in 0..batch_size {
            for c in 0..self.channels {
                let in_base = (b * self.channels + c) * in_spatial;
                let out_base = (b * self.channels + c) * out_spatial;

                for py in 0..out_h {
                    for px in 0..out_w {
                        let y_end = ((py + 1) * self.pool).min(self.input_height);
                        let x_end = ((px + 1) * self.pool).min(self.input_width);

                        // Track argmax to route gradients during backprop.
                        let mut best = f32::NEG_INFINITY;
                        let mut best_idx = in_base + py * self.pool * self.input_width + px * self.pool;

                        for iy in py * self.pool..y_end {
                            for ix in px * self.pool..x_end {
                                let idx = in_base + iy * self.input_width + ix;
                                if input[idx] > best {
                                    best = input[idx];
                                    best_idx = idx;
                                }
                            }
                        }

                        let out_i = out_base + py * out_w + px;
                        output[out_i] = best;
                        self.argmax[out_i] = best_idx;
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
        assert_eq!(grad_output.len(), batch_size * self.output_size(), "pool grad_output len mismatch");
        assert_eq!(grad_input.len(), batch_size * self.input_size(), "pool grad_input len mismatch");
        assert_eq!(self.argmax.len(), grad_output.len(), "backward called without matching forward");

        for v in grad_input.iter_mut() {
            *v = 0.0;
        }
        for (&g, &idx) in grad_output.iter().zip(&self.argmax) {
            grad_input[idx] += g;
        }
    }

    fn input_size(&self) -> usize {
        self.channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.channels * self.output_height() * self.output_width()
    }
}

/// A trainable tensor together with its accumulated gradient.
///
/// Both buffers always have the same length. Gradients accumulate across
/// `backward` calls until the optimizer consumes and clears them.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub value: Vec<f32>,
    pub grad: Vec<f32>,
}

impl Param {
    /// Wrap initial values with a zeroed gradient.
    pub fn new(value: Vec<f32>) -> Self {
        let grad = vec![0.0f32; value.len()];
        Self { value, grad }
    }

    /// A parameter filled with `fill`.
    pub fn filled(len: usize, fill: f32) -> Self {
        Self::new(vec![fill; len])
    }

    pub fn len(&self) -> usize {
        self.value.len()
    }

    pub fn is_empty(&self) -> bool {
        self.value.is_empty()
    }

    /// Reset the accumulated gradient to zero.
    pub fn zero_grad(&mut self) {
        for g in self.grad.iter_mut() {
            *g = 0.0;
        }
    }

    /// Sum of squared values.
    pub fn squared_norm(&self) -> f32 {
        self.value.iter().map(|v| v * v).sum()
    }
}

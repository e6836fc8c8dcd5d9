//! Adam (Adaptive Moment Estimation) optimizer implementation
//!
//! This module provides the Adam optimizer, which combines momentum and
//! adaptive learning rates with bias correction for improved convergence.

use crate::layers::Param;
use crate::optimizers::Optimizer;

/// Adam (Adaptive Moment Estimation) optimizer.
///
/// The update rule is:
///
/// ```text
/// m_t = β1 * m_{t-1} + (1 - β1) * gradient
/// v_t = β2 * v_{t-1} + (1 - β2) * gradient²
/// m_hat = m_t / (1 - β1^t)
/// v_hat = v_t / (1 - β2^t)
/// parameter = parameter - α * m_hat / (√v_hat + ε)
/// ```
///
/// `t` advances once per [`Optimizer::step`], shared by all parameters.
///
/// # Fields
///
/// * `learning_rate` - The step size for parameter updates (α)
/// * `beta1` - Exponential decay rate for first moment estimates (typically 0.9)
/// * `beta2` - Exponential decay rate for second moment estimates (typically 0.999)
/// * `epsilon` - Small constant for numerical stability (typically 1e-8)
/// * `m` - First moment estimates, one buffer per parameter
/// * `v` - Second moment estimates, one buffer per parameter
/// * `t` - Time step counter for bias correction
///
/// # Reference
///
/// Kingma, D. P., & Ba, J. (2014). Adam: A method for stochastic optimization.
/// arXiv preprint arXiv:1412.6980.
#[derive(Debug, Clone)]
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    m: Vec<Vec<f32>>,
    v: Vec<Vec<f32>>,
    t: usize,
}

impl Adam {
    /// Creates a new Adam optimizer with the specified hyperparameters.
    ///
    /// # Examples
    ///
    /// ```
    /// use conv_classifier::optimizers::{Adam, Optimizer};
    ///
    /// let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
    /// assert_eq!(optimizer.learning_rate(), 0.001);
    /// ```
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }

    pub fn steps(&self) -> usize {
        self.t
    }
}

impl Optimizer for Adam {
    fn step(&mut self, params: &mut [&mut Param]) {
        // Initialize moment vectors on first use
        if self.m.is_empty() {
            self.m = params.iter().map(|p| vec![0.0; p.len()]).collect();
            self.v = params.iter().map(|p| vec![0.0; p.len()]).collect();
        }
        assert_eq!(self.m.len(), params.len(), "parameter list changed between steps");

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for ((param, m), v) in params.iter_mut().zip(&mut self.m).zip(&mut self.v) {
            assert_eq!(m.len(), param.len(), "parameter resized between steps");
            let Param { value, grad } = &mut **param;

            for i in 0..value.len() {
                let g = grad[i];
                m[i] = self.beta1 * m[i] + (1.0 - self.beta1) * g;
                v[i] = self.beta2 * v[i] + (1.0 - self.beta2) * g * g;

                let m_hat = m[i] / bias_correction1;
                let v_hat = v[i] / bias_correction2;
                value[i] -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
            }
            param.zero_grad();
        }
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}

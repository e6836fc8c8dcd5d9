//! Optimizer abstractions for parameter updates
//!
//! Optimizers consume the gradients accumulated in each [`Param`] and update
//! its values in place. The classifier trains with Adam.
//!
//! # Example
//!
//! ```
//! use conv_classifier::layers::Param;
//! use conv_classifier::optimizers::{Adam, Optimizer};
//!
//! let mut optimizer = Adam::new(0.001, 0.9, 0.999, 1e-8);
//! let mut weights = Param::new(vec![1.0, 2.0]);
//! weights.grad = vec![0.5, -0.5];
//!
//! optimizer.step(&mut [&mut weights]);
//! assert!(weights.value[0] < 1.0);
//! assert_eq!(weights.grad, vec![0.0, 0.0]);
//! ```

pub mod adam;

pub use adam::Adam;

use crate::layers::Param;

/// Core trait for optimizers.
///
/// # State Management
///
/// Stateful optimizers (like Adam) keep one slot of internal state per
/// parameter, matched by position. Callers must pass the parameters in the
/// same order on every step.
pub trait Optimizer {
    /// Apply one update to every parameter and clear its gradient.
    ///
    /// # Panics
    ///
    /// Implementations may panic if the parameter list changes shape between steps.
    fn step(&mut self, params: &mut [&mut Param]);

    /// Clear momentum and any other accumulated state.
    fn reset(&mut self);

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);
}

//! Shared utilities for the layers and the model
//!
//! Random number generation and the activation helpers used between layers.

pub mod activations;
pub mod rng;

pub use activations::{argmax_rows, relu_backward_inplace, relu_inplace, softmax_rows};
pub use rng::SimpleRng;

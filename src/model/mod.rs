//! The convolutional classifier
//!
//! - `convnet`: the fixed layer topology with forward/backward passes
//! - `loss`: softmax cross-entropy and its gradient
//! - `classifier`: network + L2-regularised loss + Adam, driven by the trainer

pub mod classifier;
pub mod convnet;
pub mod loss;

pub use classifier::ConvClassifier;
pub use convnet::ConvNet;
pub use loss::{cross_entropy_delta, softmax_cross_entropy, SoftmaxCrossEntropy};

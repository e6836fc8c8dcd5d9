//! Layer abstractions for the classifier
//!
//! This module provides the Layer trait and the layer types the model is
//! assembled from: dense, 2D convolution, max-pooling, batch normalisation
//! and dropout.

mod param;
mod r#trait;
pub mod batchnorm;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod maxpool;

pub use batchnorm::BatchNormLayer;
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use maxpool::MaxPoolLayer;
pub use param::Param;
pub use r#trait::{Layer, Mode};

//! Layer abstractions for neural networks
//!
//! This module provides the Layer trait and the layer types the programs
//! are built from.

mod r#trait;
pub mod activation;
pub mod conv2d;
pub mod dense;
pub mod dropout;
pub mod pooling;
pub mod upsample;

pub use activation::ActivationLayer;
pub use conv2d::Conv2DLayer;
pub use dense::DenseLayer;
pub use dropout::DropoutLayer;
pub use pooling::{GlobalAvgPoolLayer, MaxPool2DLayer};
pub use r#trait::Layer;
pub use upsample::UpSampling2DLayer;

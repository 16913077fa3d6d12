//! Vision Tutorials Library
//!
//! A small CPU layer library and the pieces shared by the tutorial programs
//! (CIFAR-10 classifier, MNIST autoencoder, style transfer, object detection
//! and video feature extraction).
//!
//! # Modules
//!
//! - `layers`: Layer trait and implementations (Dense, Conv2D, pooling, etc.)
//! - `architecture`: JSON model descriptions and the bundled topologies
//! - `model`: `Sequential` model, weight files
//! - `losses`, `optimizers`, `training`: fitting models to data
//! - `datasets`: MNIST, CIFAR-10 and extracted video frames
//! - `imaging`: image loading, preprocessing and PNG output
//! - `style_transfer`: style/content losses and the loss/gradient evaluator
//! - `detection`: frozen-graph object detection
//! - `features`: per-frame feature sequences
//! - `config`: per-program configuration
//! - `utils`: RNG, activation functions, numeric text output

pub mod architecture;
pub mod config;
pub mod datasets;
pub mod detection;
pub mod error;
pub mod features;
pub mod imaging;
pub mod layers;
pub mod losses;
pub mod model;
pub mod optimizers;
pub mod style_transfer;
pub mod training;
pub mod utils;

pub use error::{Result, VisionError};
pub use model::Sequential;

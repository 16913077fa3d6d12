//! Shared helpers: random numbers, activation functions, numeric text output.

pub mod activations;
pub mod rng;
pub mod text;

pub use activations::{argmax_rows, relu_inplace, sigmoid_inplace, softmax_rows, Activation};
pub use rng::SimpleRng;

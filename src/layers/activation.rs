//! Standalone activation layer.

use crate::layers::Layer;
use crate::utils::Activation;

/// Applies an [`Activation`] to each sample, keeping its shape.
///
/// Softmax normalises over the whole sample. Backward is computed from the
/// layer input, so no activations are cached.
pub struct ActivationLayer {
    activation: Activation,
    shape: (usize, usize, usize),
}

impl ActivationLayer {
    pub fn new(activation: Activation, shape: (usize, usize, usize)) -> Self {
        Self { activation, shape }
    }

    /// Activation over a flat vector of `size` features.
    pub fn flat(activation: Activation, size: usize) -> Self {
        Self::new(activation, (size, 1, 1))
    }

    pub fn activation(&self) -> Activation {
        self.activation
    }
}

impl Layer for ActivationLayer {
    fn kind(&self) -> &'static str {
        "activation"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size(), "activation input size");
        self.activation.forward(input, output, self.input_size());
    }

    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        _batch_size: usize,
    ) {
        self.activation
            .backward(input, grad_output, grad_input, self.input_size());
    }

    fn input_size(&self) -> usize {
        self.shape.0 * self.shape.1 * self.shape.2
    }

    fn output_size(&self) -> usize {
        self.input_size()
    }

    fn output_shape(&self) -> (usize, usize, usize) {
        self.shape
    }
}

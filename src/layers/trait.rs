//! Layer trait definition for neural network layers
//!
//! This module defines the core Layer trait that all layer types implement.
//! Buffers are flat `f32` slices in NCHW order, batch-major.

use crate::error::{Result, VisionError};
use crate::optimizers::Optimizer;

/// Core trait for neural network layers.
///
/// # Example
///
/// ```ignore
/// let mut output = vec![0.0f32; batch_size * layer.output_size()];
/// layer.forward(&input, &mut output, batch_size);
///
/// let mut grad_input = vec![0.0f32; batch_size * layer.input_size()];
/// layer.backward(&input, &grad_output, &mut grad_input, batch_size);
/// ```
pub trait Layer {
    /// Short type name used in summaries and persisted architectures.
    fn kind(&self) -> &'static str;

    /// Forward propagation through the layer.
    ///
    /// # Arguments
    ///
    /// * `input` - Input data (batch_size × input_size)
    /// * `output` - Output buffer (batch_size × output_size)
    /// * `batch_size` - Number of samples in the batch
    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize);

    /// Backward propagation through the layer.
    ///
    /// Overwrites `grad_input` with the gradient with respect to the layer
    /// input and adds the parameter gradients to the layer's accumulators.
    /// `input` must be the same data used in the corresponding forward pass.
    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    );

    /// Apply accumulated gradients, one optimizer per parameter tensor (in
    /// the order of [`Layer::parameters`]), then clear the accumulators.
    fn update_with_optimizers(&mut self, _optimizers: &mut [Box<dyn Optimizer>]) {}

    /// Discard accumulated gradients.
    fn clear_gradients(&self) {}

    /// Switch between training and inference behaviour.
    fn set_training(&mut self, _training: bool) {}

    /// Trainable tensors, weights before biases.
    fn parameters(&self) -> Vec<&[f32]> {
        Vec::new()
    }

    /// Replace the trainable tensors; counts and lengths must match.
    fn load_parameters(&mut self, tensors: &[Vec<f32>]) -> Result<()> {
        if tensors.is_empty() {
            Ok(())
        } else {
            Err(VisionError::WeightMismatch(format!(
                "{} layer has no parameters, got {} tensors",
                self.kind(),
                tensors.len()
            )))
        }
    }

    /// Number of input features per sample.
    fn input_size(&self) -> usize;

    /// Number of output features per sample.
    fn output_size(&self) -> usize;

    /// Output shape per sample as (channels, height, width). Flat layers
    /// report `(output_size, 1, 1)`.
    fn output_shape(&self) -> (usize, usize, usize) {
        (self.output_size(), 1, 1)
    }

    /// Total count of trainable values.
    fn parameter_count(&self) -> usize {
        self.parameters().iter().map(|p| p.len()).sum()
    }
}

/// Copy `tensors` into `targets`, checking tensor count and lengths.
pub(crate) fn copy_tensors(kind: &str, targets: &mut [&mut Vec<f32>], tensors: &[Vec<f32>]) -> Result<()> {
    if targets.len() != tensors.len() {
        return Err(VisionError::WeightMismatch(format!(
            "{} layer expects {} tensors, got {}",
            kind,
            targets.len(),
            tensors.len()
        )));
    }
    for (i, (target, source)) in targets.iter_mut().zip(tensors).enumerate() {
        if target.len() != source.len() {
            return Err(VisionError::WeightMismatch(format!(
                "{} layer tensor {} expects {} values, got {}",
                kind,
                i,
                target.len(),
                source.len()
            )));
        }
        target.copy_from_slice(source);
    }
    Ok(())
}

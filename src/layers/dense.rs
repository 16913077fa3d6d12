//! Dense (fully connected) layer implementation
//!
//! Performs the transformation: output = input × weights + biases

use crate::error::Result;
use crate::layers::r#trait::copy_tensors;
use crate::layers::Layer;
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;
use std::cell::RefCell;

/// Dense (fully connected) layer with weights and biases.
///
/// Performs the linear transformation: y = xW + b
/// where x is the input (batch_size × input_size),
/// W is the weight matrix (input_size × output_size, row-major),
/// and b is the bias vector (output_size).
///
/// # Example
///
/// ```
/// use vision_tutorials::layers::{DenseLayer, Layer};
/// use vision_tutorials::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let layer = DenseLayer::new(784, 512, &mut rng);
/// assert_eq!(layer.input_size(), 784);
/// assert_eq!(layer.output_size(), 512);
/// ```
pub struct DenseLayer {
    input_size: usize,
    output_size: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    grad_weights: RefCell<Vec<f32>>,
    grad_biases: RefCell<Vec<f32>>,
}

impl DenseLayer {
    /// Create a new DenseLayer with Xavier initialization.
    ///
    /// Weights are sampled from U[-limit, limit] with
    /// limit = sqrt(6 / (input_size + output_size)); biases start at zero.
    pub fn new(input_size: usize, output_size: usize, rng: &mut SimpleRng) -> Self {
        let mut weights = vec![0.0f32; input_size * output_size];
        let limit = (6.0f32 / (input_size + output_size) as f32).sqrt();

        for value in &mut weights {
            *value = rng.gen_range_f32(-limit, limit);
        }

        Self::from_parts(input_size, output_size, weights, vec![0.0f32; output_size])
    }

    /// Create a layer from explicit weights (row-major, input_size × output_size)
    /// and biases.
    ///
    /// # Panics
    ///
    /// Panics if the buffer lengths do not match the sizes.
    pub fn from_parts(input_size: usize, output_size: usize, weights: Vec<f32>, biases: Vec<f32>) -> Self {
        assert_eq!(weights.len(), input_size * output_size, "dense weight count");
        assert_eq!(biases.len(), output_size, "dense bias count");
        Self {
            input_size,
            output_size,
            weights,
            biases,
            grad_weights: RefCell::new(vec![0.0f32; input_size * output_size]),
            grad_biases: RefCell::new(vec![0.0f32; output_size]),
        }
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    pub fn biases(&self) -> &[f32] {
        &self.biases
    }

    /// Snapshot of the accumulated weight gradient.
    pub fn grad_weights(&self) -> Vec<f32> {
        self.grad_weights.borrow().clone()
    }

    /// Snapshot of the accumulated bias gradient.
    pub fn grad_biases(&self) -> Vec<f32> {
        self.grad_biases.borrow().clone()
    }
}

impl Layer for DenseLayer {
    fn kind(&self) -> &'static str {
        "dense"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size, "dense input size");
        assert_eq!(output.len(), batch_size * self.output_size, "dense output size");

        for b in 0..batch_size {
            let x = &input[b * self.input_size..(b + 1) * self.input_size];
            let y = &mut output[b * self.output_size..(b + 1) * self.output_size];
            y.copy_from_slice(&self.biases);

            for (i, &xi) in x.iter().enumerate() {
                if xi == 0.0 {
                    continue;
                }
                let row = &self.weights[i * self.output_size..(i + 1) * self.output_size];
                for (yj, &w) in y.iter_mut().zip(row) {
                    *yj += xi * w;
                }
            }
        }
    }

    fn backward(
        &self,
        input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        let mut grad_w = self.grad_weights.borrow_mut();
        let mut grad_b = self.grad_biases.borrow_mut();

        for b in 0..batch_size {
            let x = &input[b * self.input_size..(b + 1) * self.input_size];
            let g = &grad_output[b * self.output_size..(b + 1) * self.output_size];
            let gx = &mut grad_input[b * self.input_size..(b + 1) * self.input_size];

            for (gb, &gj) in grad_b.iter_mut().zip(g) {
                *gb += gj;
            }

            for i in 0..self.input_size {
                let row = i * self.output_size;
                let mut acc = 0.0f32;
                for (j, &gj) in g.iter().enumerate() {
                    grad_w[row + j] += x[i] * gj;
                    acc += gj * self.weights[row + j];
                }
                gx[i] = acc;
            }
        }
    }

    fn update_with_optimizers(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        assert_eq!(optimizers.len(), 2, "dense layer takes two optimizers");
        let mut grad_w = self.grad_weights.borrow_mut();
        let mut grad_b = self.grad_biases.borrow_mut();

        optimizers[0].update(&mut self.weights, &grad_w);
        optimizers[1].update(&mut self.biases, &grad_b);

        grad_w.iter_mut().for_each(|g| *g = 0.0);
        grad_b.iter_mut().for_each(|g| *g = 0.0);
    }

    fn clear_gradients(&self) {
        self.grad_weights.borrow_mut().iter_mut().for_each(|g| *g = 0.0);
        self.grad_biases.borrow_mut().iter_mut().for_each(|g| *g = 0.0);
    }

    fn parameters(&self) -> Vec<&[f32]> {
        vec![self.weights.as_slice(), self.biases.as_slice()]
    }

    fn load_parameters(&mut self, tensors: &[Vec<f32>]) -> Result<()> {
        copy_tensors("dense", &mut [&mut self.weights, &mut self.biases], tensors)
    }

    fn input_size(&self) -> usize {
        self.input_size
    }

    fn output_size(&self) -> usize {
        self.output_size
    }
}

//! Dropout layer implementation for regularization
//!
//! During training a fraction of units is zeroed and the rest are scaled by
//! 1/(1-drop_rate) (inverted dropout), so inference is a plain copy.

use crate::layers::Layer;
use crate::utils::rng::SimpleRng;
use std::cell::RefCell;

/// Dropout layer for regularization.
///
/// The layer starts in inference mode; the training loop switches it on.
/// The mask drawn by the last training-mode forward pass is reused by the
/// following backward pass.
///
/// # Example
///
/// ```
/// use vision_tutorials::layers::{DropoutLayer, Layer};
/// use vision_tutorials::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// let mut layer = DropoutLayer::new((512, 1, 1), 0.5, &mut rng);
/// layer.set_training(true);
/// assert_eq!(layer.output_size(), 512);
/// ```
pub struct DropoutLayer {
    shape: (usize, usize, usize),
    drop_rate: f32,
    training: bool,
    mask: RefCell<Vec<f32>>,
    rng: RefCell<SimpleRng>,
}

impl DropoutLayer {
    /// # Panics
    ///
    /// Panics unless `drop_rate` lies in `[0.0, 1.0)`.
    pub fn new(shape: (usize, usize, usize), drop_rate: f32, rng: &mut SimpleRng) -> Self {
        assert!(
            (0.0..1.0).contains(&drop_rate),
            "drop_rate must be in range [0.0, 1.0)"
        );

        Self {
            shape,
            drop_rate,
            training: false,
            mask: RefCell::new(Vec::new()),
            rng: RefCell::new(rng.fork()),
        }
    }

    pub fn is_training(&self) -> bool {
        self.training
    }

    pub fn drop_rate(&self) -> f32 {
        self.drop_rate
    }

    fn size(&self) -> usize {
        self.shape.0 * self.shape.1 * self.shape.2
    }
}

impl Layer for DropoutLayer {
    fn kind(&self) -> &'static str {
        "dropout"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        let total_size = batch_size * self.size();
        assert_eq!(input.len(), total_size, "dropout input size");
        assert_eq!(output.len(), total_size, "dropout output size");

        if !self.training {
            output.copy_from_slice(input);
            return;
        }

        let scale = 1.0 / (1.0 - self.drop_rate);
        let mut mask = self.mask.borrow_mut();
        let mut rng = self.rng.borrow_mut();
        mask.resize(total_size, 0.0);

        for ((m, out), &x) in mask.iter_mut().zip(output.iter_mut()).zip(input) {
            if rng.next_f32() >= self.drop_rate {
                *m = scale;
                *out = x * scale;
            } else {
                *m = 0.0;
                *out = 0.0;
            }
        }
    }

    fn backward(
        &self,
        _input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        batch_size: usize,
    ) {
        let total_size = batch_size * self.size();
        assert_eq!(grad_output.len(), total_size, "dropout grad_output size");

        if !self.training {
            grad_input.copy_from_slice(grad_output);
            return;
        }

        let mask = self.mask.borrow();
        for ((gi, &go), &m) in grad_input.iter_mut().zip(grad_output).zip(mask.iter()) {
            *gi = go * m;
        }
    }

    fn set_training(&mut self, training: bool) {
        self.training = training;
    }

    fn input_size(&self) -> usize {
        self.size()
    }

    fn output_size(&self) -> usize {
        self.size()
    }

    fn output_shape(&self) -> (usize, usize, usize) {
        self.shape
    }
}

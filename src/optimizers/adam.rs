//! Adam (adaptive moment estimation).
//!
//! ```text
//! m_t = β1 * m_{t-1} + (1 - β1) * g
//! v_t = β2 * v_{t-1} + (1 - β2) * g²
//! w   = w - α * m_hat / (√v_hat + ε)
//! ```
//!
//! with bias-corrected `m_hat = m_t / (1 - β1^t)` and `v_hat = v_t / (1 - β2^t)`.

use crate::optimizers::Optimizer;

/// Adam optimizer state for one parameter tensor.
pub struct Adam {
    learning_rate: f32,
    beta1: f32,
    beta2: f32,
    epsilon: f32,
    /// First moment estimates
    m: Vec<f32>,
    /// Second moment estimates
    v: Vec<f32>,
    /// Step counter for bias correction
    t: usize,
}

impl Adam {
    /// # Examples
    ///
    /// ```
    /// use vision_tutorials::optimizers::{Adam, Optimizer};
    ///
    /// let optimizer = Adam::new(0.001, 0.9, 0.999, 1e-7);
    /// assert_eq!(optimizer.learning_rate(), 0.001);
    /// ```
    pub fn new(learning_rate: f32, beta1: f32, beta2: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            beta1,
            beta2,
            epsilon,
            m: Vec::new(),
            v: Vec::new(),
            t: 0,
        }
    }
}

impl Optimizer for Adam {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        if self.m.len() != parameters.len() {
            self.m.resize(parameters.len(), 0.0);
            self.v.resize(parameters.len(), 0.0);
        }

        self.t += 1;
        let bias_correction1 = 1.0 - self.beta1.powi(self.t as i32);
        let bias_correction2 = 1.0 - self.beta2.powi(self.t as i32);

        for ((param, &grad), (m, v)) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.m.iter_mut().zip(self.v.iter_mut()))
        {
            *m = self.beta1 * *m + (1.0 - self.beta1) * grad;
            *v = self.beta2 * *v + (1.0 - self.beta2) * grad * grad;

            let m_hat = *m / bias_correction1;
            let v_hat = *v / bias_correction2;
            *param -= self.learning_rate * m_hat / (v_hat.sqrt() + self.epsilon);
        }
    }

    fn reset(&mut self) {
        self.m.clear();
        self.v.clear();
        self.t = 0;
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}

//! Adadelta: per-parameter step sizes from running averages of squared
//! gradients and squared updates.
//!
//! ```text
//! E[g²]  = ρ E[g²]  + (1 - ρ) g²
//! Δ      = g · √(E[Δ²] + ε) / √(E[g²] + ε)
//! w      = w - lr · Δ
//! E[Δ²]  = ρ E[Δ²]  + (1 - ρ) Δ²
//! ```

use crate::optimizers::Optimizer;

/// Adadelta optimizer state for one parameter tensor.
pub struct Adadelta {
    learning_rate: f32,
    rho: f32,
    epsilon: f32,
    avg_sq_grad: Vec<f32>,
    avg_sq_delta: Vec<f32>,
}

impl Adadelta {
    pub fn new(learning_rate: f32, rho: f32, epsilon: f32) -> Self {
        Self {
            learning_rate,
            rho,
            epsilon,
            avg_sq_grad: Vec::new(),
            avg_sq_delta: Vec::new(),
        }
    }
}

impl Optimizer for Adadelta {
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]) {
        assert_eq!(
            parameters.len(),
            gradients.len(),
            "Parameters and gradients must have the same length"
        );

        if self.avg_sq_grad.len() != parameters.len() {
            self.avg_sq_grad.resize(parameters.len(), 0.0);
            self.avg_sq_delta.resize(parameters.len(), 0.0);
        }

        for ((param, &grad), (eg, ed)) in parameters
            .iter_mut()
            .zip(gradients)
            .zip(self.avg_sq_grad.iter_mut().zip(self.avg_sq_delta.iter_mut()))
        {
            *eg = self.rho * *eg + (1.0 - self.rho) * grad * grad;
            let delta = grad * (*ed + self.epsilon).sqrt() / (*eg + self.epsilon).sqrt();
            *param -= self.learning_rate * delta;
            *ed = self.rho * *ed + (1.0 - self.rho) * delta * delta;
        }
    }

    fn reset(&mut self) {
        self.avg_sq_grad.clear();
        self.avg_sq_delta.clear();
    }

    fn learning_rate(&self) -> f32 {
        self.learning_rate
    }

    fn set_learning_rate(&mut self, lr: f32) {
        self.learning_rate = lr;
    }
}

//! Parameter update rules.
//!
//! First-order optimizers (`Sgd`, `Adam`, `Adadelta`) implement [`Optimizer`]
//! and are used by the training loop, one instance per parameter tensor so
//! that stateful rules keep separate moment estimates. The quasi-Newton
//! minimiser in [`lbfgs`] works on a whole flattened vector through the
//! two-call [`lbfgs::Objective`] interface instead.

pub mod adadelta;
pub mod adam;
pub mod lbfgs;
pub mod sgd;

pub use adadelta::Adadelta;
pub use adam::Adam;
pub use sgd::Sgd;

use serde::{Deserialize, Serialize};

/// Update rule applied to one parameter tensor.
pub trait Optimizer {
    /// Update `parameters` in place from `gradients`.
    ///
    /// # Panics
    ///
    /// Implementations panic if the two slices differ in length.
    fn update(&mut self, parameters: &mut [f32], gradients: &[f32]);

    /// Forget accumulated state.
    fn reset(&mut self);

    fn learning_rate(&self) -> f32;

    fn set_learning_rate(&mut self, lr: f32);
}

/// Optimizer choice as written in program configs.
///
/// ```json
/// { "kind": "adam", "learning_rate": 0.001 }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum OptimizerKind {
    Sgd {
        learning_rate: f32,
    },
    Adam {
        #[serde(default = "defaults::adam_lr")]
        learning_rate: f32,
        #[serde(default = "defaults::beta1")]
        beta1: f32,
        #[serde(default = "defaults::beta2")]
        beta2: f32,
        #[serde(default = "defaults::epsilon")]
        epsilon: f32,
    },
    Adadelta {
        #[serde(default = "defaults::adadelta_lr")]
        learning_rate: f32,
        #[serde(default = "defaults::rho")]
        rho: f32,
        #[serde(default = "defaults::epsilon")]
        epsilon: f32,
    },
}

mod defaults {
    pub fn adam_lr() -> f32 {
        0.001
    }
    pub fn beta1() -> f32 {
        0.9
    }
    pub fn beta2() -> f32 {
        0.999
    }
    pub fn epsilon() -> f32 {
        1e-7
    }
    pub fn adadelta_lr() -> f32 {
        1.0
    }
    pub fn rho() -> f32 {
        0.95
    }
}

impl OptimizerKind {
    /// Adam with its usual defaults.
    pub fn adam() -> Self {
        OptimizerKind::Adam {
            learning_rate: defaults::adam_lr(),
            beta1: defaults::beta1(),
            beta2: defaults::beta2(),
            epsilon: defaults::epsilon(),
        }
    }

    /// Adadelta with its usual defaults.
    pub fn adadelta() -> Self {
        OptimizerKind::Adadelta {
            learning_rate: defaults::adadelta_lr(),
            rho: defaults::rho(),
            epsilon: defaults::epsilon(),
        }
    }

    /// Create a fresh optimizer instance.
    pub fn build(&self) -> Box<dyn Optimizer> {
        match *self {
            OptimizerKind::Sgd { learning_rate } => Box::new(Sgd::new(learning_rate)),
            OptimizerKind::Adam {
                learning_rate,
                beta1,
                beta2,
                epsilon,
            } => Box::new(Adam::new(learning_rate, beta1, beta2, epsilon)),
            OptimizerKind::Adadelta {
                learning_rate,
                rho,
                epsilon,
            } => Box::new(Adadelta::new(learning_rate, rho, epsilon)),
        }
    }

    /// Create `count` independent instances.
    pub fn build_many(&self, count: usize) -> Vec<Box<dyn Optimizer>> {
        (0..count).map(|_| self.build()).collect()
    }
}

//! Neural style transfer: optimise an image so its deep features match a
//! content image while its feature correlations match a style image.

pub mod evaluator;
pub mod loss;

pub use evaluator::{Evaluator, EvaluatorError};
pub use loss::{StyleLossSettings, StyleTransferLoss};

use crate::error::VisionError;
use crate::optimizers::lbfgs::Lbfgs;
use crate::utils::SimpleRng;
use std::time::Instant;

/// Uniform noise in `[0, 255) - 128`, the usual starting image.
pub fn initial_noise(len: usize, rng: &mut SimpleRng) -> Vec<f64> {
    (0..len).map(|_| rng.gen_range_f64(0.0, 255.0) - 128.0).collect()
}

/// Run `iterations` rounds of L-BFGS (at most `max_evaluations` loss
/// evaluations each) from `x0`. Returns the final image and loss.
pub fn generate(
    loss: &StyleTransferLoss,
    x0: Vec<f64>,
    iterations: usize,
    max_evaluations: usize,
) -> Result<(Vec<f64>, f64), EvaluatorError<VisionError>> {
    let mut evaluator = Evaluator::new(|x: &[f64]| loss.evaluate(x));
    let lbfgs = Lbfgs::with_max_evaluations(max_evaluations);

    let mut x = x0;
    let mut value = f64::NAN;
    for i in 0..iterations {
        log::info!("Start of iteration {}", i);
        let start = Instant::now();
        let minimum = lbfgs.minimize(&mut evaluator, x)?;
        x = minimum.x;
        value = minimum.value;
        log::info!("Current loss value: {:.6e}", value);
        log::info!(
            "Iteration {} completed in {:.1}s ({} evaluations, {:?})",
            i,
            start.elapsed().as_secs_f64(),
            minimum.evaluations,
            minimum.termination
        );
    }
    Ok((x, value))
}

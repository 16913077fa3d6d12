//! Single-slot cache between a joint loss/gradient computation and an
//! optimizer that asks for the two separately.

use crate::optimizers::lbfgs::Objective;
use thiserror::Error;

/// Misuse of the evaluator's alternating call order, or a failure of the
/// wrapped computation.
#[derive(Debug, Error)]
pub enum EvaluatorError<E> {
    #[error("loss requested while the previous gradient is still cached")]
    LossAlreadyCached,

    #[error("gradient requested without a preceding loss")]
    NoCachedGradient,

    #[error(transparent)]
    Compute(E),
}

/// Splits `compute(x) -> (loss, gradient)` into [`Evaluator::loss`] and
/// [`Evaluator::grads`].
///
/// `loss` runs the computation and keeps the gradient; `grads` hands it out
/// and empties the slot. Calls must alternate, starting with `loss`. A call
/// out of order returns an error and leaves the slot as it was.
pub struct Evaluator<F> {
    compute: F,
    cached: Option<Vec<f64>>,
}

impl<F, E> Evaluator<F>
where
    F: FnMut(&[f64]) -> Result<(f64, Vec<f64>), E>,
{
    pub fn new(compute: F) -> Self {
        Self {
            compute,
            cached: None,
        }
    }

    /// Whether a gradient is waiting to be collected.
    pub fn is_holding(&self) -> bool {
        self.cached.is_some()
    }

    pub fn loss(&mut self, x: &[f64]) -> Result<f64, EvaluatorError<E>> {
        if self.cached.is_some() {
            return Err(EvaluatorError::LossAlreadyCached);
        }
        let (loss, grads) = (self.compute)(x).map_err(EvaluatorError::Compute)?;
        self.cached = Some(grads);
        Ok(loss)
    }

    /// The gradient computed by the last `loss` call. `_x` is not used: the
    /// gradient always belongs to the point passed to `loss`.
    pub fn grads(&mut self, _x: &[f64]) -> Result<Vec<f64>, EvaluatorError<E>> {
        self.cached.take().ok_or(EvaluatorError::NoCachedGradient)
    }
}

impl<F, E> Objective for Evaluator<F>
where
    F: FnMut(&[f64]) -> Result<(f64, Vec<f64>), E>,
{
    type Error = EvaluatorError<E>;

    fn value(&mut self, x: &[f64]) -> Result<f64, Self::Error> {
        self.loss(x)
    }

    fn gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, Self::Error> {
        self.grads(x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    fn fixed() -> Evaluator<impl FnMut(&[f64]) -> Result<(f64, Vec<f64>), Infallible>> {
        Evaluator::new(|x: &[f64]| Ok((x.iter().sum(), x.iter().map(|v| 2.0 * v).collect())))
    }

    #[test]
    fn test_alternation() {
        let mut eval = fixed();
        assert!(!eval.is_holding());
        assert_eq!(eval.loss(&[1.0, 2.0]).unwrap(), 3.0);
        assert!(eval.is_holding());
        assert_eq!(eval.grads(&[1.0, 2.0]).unwrap(), vec![2.0, 4.0]);
        assert!(!eval.is_holding());
    }

    #[test]
    fn test_rejected_call_keeps_cache() {
        let mut eval = fixed();
        eval.loss(&[1.0]).unwrap();
        assert!(matches!(eval.loss(&[5.0]), Err(EvaluatorError::LossAlreadyCached)));
        // The first gradient is still the one handed out.
        assert_eq!(eval.grads(&[5.0]).unwrap(), vec![2.0]);
    }

    #[test]
    fn test_compute_error_leaves_slot_empty() {
        let mut eval = Evaluator::new(|_: &[f64]| Err::<(f64, Vec<f64>), _>("boom"));
        assert!(matches!(eval.loss(&[0.0]), Err(EvaluatorError::Compute("boom"))));
        assert!(!eval.is_holding());
    }
}

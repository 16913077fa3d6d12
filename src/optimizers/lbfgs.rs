//! Limited-memory BFGS minimiser over `f64` vectors.
//!
//! The objective is queried through two separate calls per trial point,
//! [`Objective::value`] immediately followed by [`Objective::gradient`] on the
//! same `x`. Callers whose computation yields both at once can put a
//! single-slot cache in front of it (see `style_transfer::Evaluator`).
//!
//! Directions come from the standard two-loop recursion over the last
//! `memory` correction pairs; steps are chosen by a backtracking line search
//! with the Armijo sufficient-decrease test.

use std::collections::VecDeque;

/// Function minimised by [`Lbfgs`].
pub trait Objective {
    type Error;

    /// Objective value at `x`.
    fn value(&mut self, x: &[f64]) -> Result<f64, Self::Error>;

    /// Gradient at the `x` most recently passed to [`Objective::value`].
    fn gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, Self::Error>;
}

/// Why the minimiser stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    /// Largest gradient component fell below the tolerance.
    Converged,
    /// Relative decrease of the objective became negligible.
    Stalled,
    /// Evaluation budget spent.
    MaxEvaluations,
    /// Iteration budget spent.
    MaxIterations,
    /// No step length produced sufficient decrease.
    LineSearchFailed,
}

/// Best point found and run statistics.
#[derive(Debug, Clone)]
pub struct Minimum {
    pub x: Vec<f64>,
    pub value: f64,
    pub evaluations: usize,
    pub iterations: usize,
    pub termination: Termination,
}

/// L-BFGS settings. Defaults follow the common Fortran implementation:
/// 10 corrections, 15000 evaluations, `pgtol = 1e-5`, `factr = 1e7`.
#[derive(Debug, Clone)]
pub struct Lbfgs {
    pub memory: usize,
    pub max_evaluations: usize,
    pub max_iterations: usize,
    pub gradient_tolerance: f64,
    pub factr: f64,
}

impl Default for Lbfgs {
    fn default() -> Self {
        Self {
            memory: 10,
            max_evaluations: 15_000,
            max_iterations: 15_000,
            gradient_tolerance: 1e-5,
            factr: 1e7,
        }
    }
}

const ARMIJO_C1: f64 = 1e-4;
const MIN_STEP: f64 = 1e-20;
const CURVATURE_EPS: f64 = 1e-10;

struct Correction {
    s: Vec<f64>,
    y: Vec<f64>,
    rho: f64,
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

fn max_abs(v: &[f64]) -> f64 {
    v.iter().fold(0.0f64, |m, x| m.max(x.abs()))
}

impl Lbfgs {
    /// Settings with an evaluation budget, other values default.
    pub fn with_max_evaluations(max_evaluations: usize) -> Self {
        Self {
            max_evaluations,
            ..Self::default()
        }
    }

    /// Minimise `objective` starting from `x0`.
    ///
    /// Errors returned by the objective abort the run and are passed through.
    pub fn minimize<O: Objective>(&self, objective: &mut O, x0: Vec<f64>) -> Result<Minimum, O::Error> {
        let mut evaluations = 0usize;
        let mut x = x0;
        let mut f = objective.value(&x)?;
        let mut g = objective.gradient(&x)?;
        evaluations += 1;

        let finish = |x: Vec<f64>, value: f64, evaluations: usize, iterations: usize, termination| {
            Ok(Minimum {
                x,
                value,
                evaluations,
                iterations,
                termination,
            })
        };

        if max_abs(&g) <= self.gradient_tolerance {
            return finish(x, f, evaluations, 0, Termination::Converged);
        }

        let mut history: VecDeque<Correction> = VecDeque::with_capacity(self.memory);
        let mut iterations = 0usize;

        loop {
            if iterations >= self.max_iterations {
                return finish(x, f, evaluations, iterations, Termination::MaxIterations);
            }
            if evaluations >= self.max_evaluations {
                return finish(x, f, evaluations, iterations, Termination::MaxEvaluations);
            }

            let mut direction = self.direction(&history, &g);
            let mut slope = dot(&g, &direction);
            if slope >= 0.0 {
                // Not a descent direction: restart from steepest descent.
                history.clear();
                direction = g.iter().map(|v| -v).collect();
                slope = -dot(&g, &g);
            }

            let mut step = if history.is_empty() {
                (1.0 / dot(&direction, &direction).sqrt()).min(1.0)
            } else {
                1.0
            };

            let (x_new, f_new, g_new) = loop {
                if evaluations >= self.max_evaluations {
                    return finish(x, f, evaluations, iterations, Termination::MaxEvaluations);
                }
                let candidate: Vec<f64> = x
                    .iter()
                    .zip(&direction)
                    .map(|(xi, di)| xi + step * di)
                    .collect();
                let f_candidate = objective.value(&candidate)?;
                let g_candidate = objective.gradient(&candidate)?;
                evaluations += 1;

                if f_candidate.is_finite() && f_candidate <= f + ARMIJO_C1 * step * slope {
                    break (candidate, f_candidate, g_candidate);
                }
                step *= 0.5;
                if step < MIN_STEP {
                    return finish(x, f, evaluations, iterations, Termination::LineSearchFailed);
                }
            };

            let s: Vec<f64> = x_new.iter().zip(&x).map(|(a, b)| a - b).collect();
            let y: Vec<f64> = g_new.iter().zip(&g).map(|(a, b)| a - b).collect();
            let sy = dot(&s, &y);
            if sy > CURVATURE_EPS {
                if history.len() == self.memory {
                    history.pop_front();
                }
                history.push_back(Correction { s, y, rho: 1.0 / sy });
            }

            let f_prev = f;
            x = x_new;
            f = f_new;
            g = g_new;
            iterations += 1;
            log::debug!("lbfgs iteration {} value {:.6e} evals {}", iterations, f, evaluations);

            if max_abs(&g) <= self.gradient_tolerance {
                return finish(x, f, evaluations, iterations, Termination::Converged);
            }
            let scale = f_prev.abs().max(f.abs()).max(1.0);
            if (f_prev - f) / scale <= self.factr * f64::EPSILON {
                return finish(x, f, evaluations, iterations, Termination::Stalled);
            }
        }
    }

    /// Two-loop recursion: returns `-H g`.
    fn direction(&self, history: &VecDeque<Correction>, g: &[f64]) -> Vec<f64> {
        let mut q = g.to_vec();
        let mut alphas = Vec::with_capacity(history.len());

        for c in history.iter().rev() {
            let alpha = c.rho * dot(&c.s, &q);
            for (qi, yi) in q.iter_mut().zip(&c.y) {
                *qi -= alpha * yi;
            }
            alphas.push(alpha);
        }

        if let Some(last) = history.back() {
            let gamma = dot(&last.s, &last.y) / dot(&last.y, &last.y);
            for qi in q.iter_mut() {
                *qi *= gamma;
            }
        }

        for (c, alpha) in history.iter().zip(alphas.iter().rev()) {
            let beta = c.rho * dot(&c.y, &q);
            for (qi, si) in q.iter_mut().zip(&c.s) {
                *qi += si * (alpha - beta);
            }
        }

        q.iter().map(|v| -v).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// f(x) = Σ (i+1) (x_i - 1)²
    struct Quadratic {
        calls: usize,
    }

    impl Objective for Quadratic {
        type Error = ();

        fn value(&mut self, x: &[f64]) -> Result<f64, ()> {
            self.calls += 1;
            Ok(x.iter()
                .enumerate()
                .map(|(i, v)| (i as f64 + 1.0) * (v - 1.0).powi(2))
                .sum())
        }

        fn gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, ()> {
            Ok(x.iter()
                .enumerate()
                .map(|(i, v)| 2.0 * (i as f64 + 1.0) * (v - 1.0))
                .collect())
        }
    }

    struct Rosenbrock;

    impl Objective for Rosenbrock {
        type Error = ();

        fn value(&mut self, x: &[f64]) -> Result<f64, ()> {
            Ok((1.0 - x[0]).powi(2) + 100.0 * (x[1] - x[0] * x[0]).powi(2))
        }

        fn gradient(&mut self, x: &[f64]) -> Result<Vec<f64>, ()> {
            Ok(vec![
                -2.0 * (1.0 - x[0]) - 400.0 * x[0] * (x[1] - x[0] * x[0]),
                200.0 * (x[1] - x[0] * x[0]),
            ])
        }
    }

    #[test]
    fn test_minimizes_quadratic() {
        let mut objective = Quadratic { calls: 0 };
        let result = Lbfgs::default()
            .minimize(&mut objective, vec![5.0, -3.0, 0.0, 10.0])
            .unwrap();

        for v in &result.x {
            assert_relative_eq!(*v, 1.0, epsilon = 1e-4);
        }
        assert!(result.value < 1e-8);
        assert_eq!(objective.calls, result.evaluations);
    }

    #[test]
    fn test_minimizes_rosenbrock() {
        let result = Lbfgs::default()
            .minimize(&mut Rosenbrock, vec![-1.2, 1.0])
            .unwrap();

        assert_relative_eq!(result.x[0], 1.0, epsilon = 1e-3);
        assert_relative_eq!(result.x[1], 1.0, epsilon = 1e-3);
    }

    #[test]
    fn test_respects_evaluation_budget() {
        let mut objective = Quadratic { calls: 0 };
        let result = Lbfgs::with_max_evaluations(3)
            .minimize(&mut objective, vec![50.0; 8])
            .unwrap();

        assert!(result.evaluations <= 3);
        assert_eq!(objective.calls, result.evaluations);
        assert_eq!(result.termination, Termination::MaxEvaluations);
        // The returned point is never worse than the start.
        assert!(result.value <= objective.value(&[50.0; 8]).unwrap());
    }

    #[test]
    fn test_already_optimal_start() {
        let mut objective = Quadratic { calls: 0 };
        let result = Lbfgs::default()
            .minimize(&mut objective, vec![1.0, 1.0])
            .unwrap();
        assert_eq!(result.termination, Termination::Converged);
        assert_eq!(result.evaluations, 1);
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_objective_error_is_propagated() {
        struct Failing;
        impl Objective for Failing {
            type Error = &'static str;
            fn value(&mut self, _x: &[f64]) -> Result<f64, &'static str> {
                Err("boom")
            }
            fn gradient(&mut self, _x: &[f64]) -> Result<Vec<f64>, &'static str> {
                Ok(vec![])
            }
        }

        let err = Lbfgs::default().minimize(&mut Failing, vec![0.0]).unwrap_err();
        assert_eq!(err, "boom");
    }
}

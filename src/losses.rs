//! Training losses on model outputs.
//!
//! Both losses take probabilities (the output of a softmax or sigmoid
//! activation layer) and return the mean per-sample loss together with the
//! gradient w.r.t. those probabilities, already divided by the batch size.
//! The activation layer's backward pass turns that into the logit gradient.

/// Probabilities are clamped to `[EPSILON, 1 - EPSILON]` before taking logs.
pub const EPSILON: f32 = 1e-7;

/// Loss selector used by the training loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Loss {
    CategoricalCrossentropy,
    BinaryCrossentropy,
}

impl Loss {
    /// Mean loss over the batch and gradient w.r.t. `predictions`.
    ///
    /// `cols` is the per-sample width used by categorical cross-entropy.
    pub fn evaluate(&self, predictions: &[f32], targets: &[f32], cols: usize) -> (f32, Vec<f32>) {
        match self {
            Loss::CategoricalCrossentropy => categorical_crossentropy(predictions, targets, cols),
            Loss::BinaryCrossentropy => binary_crossentropy(predictions, targets, cols),
        }
    }
}

fn clamp(p: f32) -> f32 {
    p.clamp(EPSILON, 1.0 - EPSILON)
}

/// `-Σ t·log(p)` per row, averaged over rows.
pub fn categorical_crossentropy(predictions: &[f32], targets: &[f32], cols: usize) -> (f32, Vec<f32>) {
    assert_eq!(predictions.len(), targets.len(), "prediction/target length");
    let rows = if cols == 0 { 0 } else { predictions.len() / cols };
    if rows == 0 {
        return (0.0, vec![0.0; predictions.len()]);
    }
    let scale = 1.0 / rows as f32;

    let mut loss = 0.0f32;
    let mut grad = vec![0.0f32; predictions.len()];
    for ((&p, &t), g) in predictions.iter().zip(targets).zip(grad.iter_mut()) {
        let p = clamp(p);
        loss -= t * p.ln();
        *g = -t / p * scale;
    }
    (loss * scale, grad)
}

/// Element-wise `-(t·log(p) + (1-t)·log(1-p))`, averaged over every element
/// of a sample and then over the batch.
pub fn binary_crossentropy(predictions: &[f32], targets: &[f32], cols: usize) -> (f32, Vec<f32>) {
    assert_eq!(predictions.len(), targets.len(), "prediction/target length");
    let n = predictions.len();
    if n == 0 || cols == 0 {
        return (0.0, vec![0.0; n]);
    }
    let scale = 1.0 / n as f32;

    let mut loss = 0.0f32;
    let mut grad = vec![0.0f32; n];
    for ((&p, &t), g) in predictions.iter().zip(targets).zip(grad.iter_mut()) {
        let p = clamp(p);
        loss -= t * p.ln() + (1.0 - t) * (1.0 - p).ln();
        *g = (p - t) / (p * (1.0 - p)) * scale;
    }
    (loss * scale, grad)
}

//! Activation functions on flat `f32` buffers.
//!
//! Each function has a forward form and a backward form that maps the
//! gradient w.r.t. the activation output back to its input. Backward forms
//! only need the pre-activation input, so activation layers stay stateless.

/// Activation applied element-wise (or row-wise for softmax).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Linear,
    Relu,
    Sigmoid,
    Softmax,
}

impl Activation {
    /// Parse the names used in architecture files.
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "linear" => Some(Activation::Linear),
            "relu" => Some(Activation::Relu),
            "sigmoid" => Some(Activation::Sigmoid),
            "softmax" => Some(Activation::Softmax),
            _ => None,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Activation::Linear => "linear",
            Activation::Relu => "relu",
            Activation::Sigmoid => "sigmoid",
            Activation::Softmax => "softmax",
        }
    }

    /// Apply the activation. `cols` is the row width used by softmax.
    pub fn forward(&self, input: &[f32], output: &mut [f32], cols: usize) {
        output.copy_from_slice(input);
        match self {
            Activation::Linear => {}
            Activation::Relu => relu_inplace(output),
            Activation::Sigmoid => sigmoid_inplace(output),
            Activation::Softmax => {
                let rows = if cols == 0 { 0 } else { output.len() / cols };
                softmax_rows(output, rows, cols);
            }
        }
    }

    /// Gradient w.r.t. the pre-activation `input`.
    pub fn backward(&self, input: &[f32], grad_output: &[f32], grad_input: &mut [f32], cols: usize) {
        match self {
            Activation::Linear => grad_input.copy_from_slice(grad_output),
            Activation::Relu => {
                for ((gi, &go), &x) in grad_input.iter_mut().zip(grad_output).zip(input) {
                    *gi = if x > 0.0 { go } else { 0.0 };
                }
            }
            Activation::Sigmoid => {
                for ((gi, &go), &x) in grad_input.iter_mut().zip(grad_output).zip(input) {
                    let s = sigmoid_f32(x);
                    *gi = go * s * (1.0 - s);
                }
            }
            Activation::Softmax => {
                if cols == 0 {
                    return;
                }
                let mut probs = input.to_vec();
                softmax_rows(&mut probs, input.len() / cols, cols);
                // J^T g for each row: p_i * (g_i - sum_j p_j g_j)
                for ((p_row, g_row), gi_row) in probs
                    .chunks_exact(cols)
                    .zip(grad_output.chunks_exact(cols))
                    .zip(grad_input.chunks_exact_mut(cols))
                {
                    let dot: f32 = p_row.iter().zip(g_row).map(|(p, g)| p * g).sum();
                    for ((gi, &p), &g) in gi_row.iter_mut().zip(p_row).zip(g_row) {
                        *gi = p * (g - dot);
                    }
                }
            }
        }
    }
}

fn sigmoid_f32(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

/// ReLU applied in-place.
pub fn relu_inplace(data: &mut [f32]) {
    for value in data.iter_mut() {
        if *value < 0.0 {
            *value = 0.0;
        }
    }
}

/// Logistic sigmoid applied in-place.
pub fn sigmoid_inplace(data: &mut [f32]) {
    for value in data.iter_mut() {
        *value = sigmoid_f32(*value);
    }
}

/// Row-wise softmax with max subtraction for stability.
pub fn softmax_rows(outputs: &mut [f32], rows: usize, cols: usize) {
    if cols == 0 {
        return;
    }
    assert_eq!(outputs.len(), rows * cols, "outputs length mismatch in softmax_rows");

    for row in outputs.chunks_exact_mut(cols).take(rows) {
        let max_value = row.iter().copied().fold(f32::NEG_INFINITY, f32::max);

        let mut sum = 0.0f32;
        for value in row.iter_mut() {
            *value = (*value - max_value).exp();
            sum += *value;
        }

        let inv_sum = 1.0f32 / sum;
        for value in row.iter_mut() {
            *value *= inv_sum;
        }
    }
}

/// Index of the largest value in each row.
pub fn argmax_rows(values: &[f32], cols: usize) -> Vec<usize> {
    values
        .chunks_exact(cols)
        .map(|row| {
            let mut best = 0usize;
            for (j, &v) in row.iter().enumerate().skip(1) {
                if v > row[best] {
                    best = j;
                }
            }
            best
        })
        .collect()
}

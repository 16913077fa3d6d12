//! Pooling layers: 2D max pooling and global average pooling.

use crate::layers::Layer;

/// Non-overlapping max pooling (stride equals the pool size).
///
/// With `ceil_mode` the output covers partial windows at the right and bottom
/// edges (Keras `padding="same"` for stride = pool); otherwise trailing rows
/// and columns that do not fill a window are dropped (`"valid"`).
///
/// Backward recomputes the argmax of each window from the input, so the layer
/// carries no state between passes.
pub struct MaxPool2DLayer {
    channels: usize,
    input_height: usize,
    input_width: usize,
    pool_size: usize,
    ceil_mode: bool,
}

impl MaxPool2DLayer {
    pub fn new(channels: usize, input_height: usize, input_width: usize, pool_size: usize, ceil_mode: bool) -> Self {
        assert!(pool_size > 0, "pool_size must be positive");
        Self {
            channels,
            input_height,
            input_width,
            pool_size,
            ceil_mode,
        }
    }

    fn pooled(&self, len: usize) -> usize {
        if self.ceil_mode {
            len.div_ceil(self.pool_size)
        } else {
            len / self.pool_size
        }
    }

    pub fn output_height(&self) -> usize {
        self.pooled(self.input_height)
    }

    pub fn output_width(&self) -> usize {
        self.pooled(self.input_width)
    }

    /// Index (within the channel plane) of the largest value in window (py, px).
    /// The first maximum wins on ties.
    fn argmax(&self, plane: &[f32], py: usize, px: usize) -> usize {
        let y0 = py * self.pool_size;
        let x0 = px * self.pool_size;
        let y1 = (y0 + self.pool_size).min(self.input_height);
        let x1 = (x0 + self.pool_size).min(self.input_width);

        let mut best = f32::NEG_INFINITY;
        let mut best_idx = y0 * self.input_width + x0;
        for y in y0..y1 {
            for x in x0..x1 {
                let idx = y * self.input_width + x;
                if plane[idx] > best {
                    best = plane[idx];
                    best_idx = idx;
                }
            }
        }
        best_idx
    }
}

impl Layer for MaxPool2DLayer {
    fn kind(&self) -> &'static str {
        "maxpool2d"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size(), "maxpool2d input size");
        let in_spatial = self.input_height * self.input_width;
        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;

        for plane_idx in 0..batch_size * self.channels {
            let plane = &input[plane_idx * in_spatial..(plane_idx + 1) * in_spatial];
            let out = &mut output[plane_idx * out_spatial..(plane_idx + 1) * out_spatial];
            for py in 0..out_h {
                for px in 0..out_w {
                    out[py * out_w + px] = plane[self.argmax(plane, py, px)];
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
        let in_spatial = self.input_height * self.input_width;
        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;

        grad_input.fill(0.0);
        for plane_idx in 0..batch_size * self.channels {
            let plane = &input[plane_idx * in_spatial..(plane_idx + 1) * in_spatial];
            let g = &grad_output[plane_idx * out_spatial..(plane_idx + 1) * out_spatial];
            let gx = &mut grad_input[plane_idx * in_spatial..(plane_idx + 1) * in_spatial];
            for py in 0..out_h {
                for px in 0..out_w {
                    gx[self.argmax(plane, py, px)] += g[py * out_w + px];
                }
            }
        }
    }

    fn input_size(&self) -> usize {
        self.channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.channels * self.output_height() * self.output_width()
    }

    fn output_shape(&self) -> (usize, usize, usize) {
        (self.channels, self.output_height(), self.output_width())
    }
}

/// Mean over each channel plane: (C, H, W) -> (C).
pub struct GlobalAvgPoolLayer {
    channels: usize,
    spatial: usize,
}

impl GlobalAvgPoolLayer {
    pub fn new(channels: usize, input_height: usize, input_width: usize) -> Self {
        Self {
            channels,
            spatial: input_height * input_width,
        }
    }
}

impl Layer for GlobalAvgPoolLayer {
    fn kind(&self) -> &'static str {
        "global_avg_pool"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size(), "global_avg_pool input size");
        let scale = 1.0 / self.spatial as f32;
        for (out, plane) in output.iter_mut().zip(input.chunks(self.spatial)) {
            *out = plane.iter().sum::<f32>() * scale;
        }
    }

    fn backward(
        &self,
        _input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        _batch_size: usize,
    ) {
        let scale = 1.0 / self.spatial as f32;
        for (&g, plane) in grad_output.iter().zip(grad_input.chunks_mut(self.spatial)) {
            plane.fill(g * scale);
        }
    }

    fn input_size(&self) -> usize {
        self.channels * self.spatial
    }

    fn output_size(&self) -> usize {
        self.channels
    }
}

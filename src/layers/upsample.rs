//! Nearest-neighbour upsampling.

use crate::layers::Layer;

/// Repeats every pixel `size × size` times: (C, H, W) -> (C, H·size, W·size).
pub struct UpSampling2DLayer {
    channels: usize,
    input_height: usize,
    input_width: usize,
    size: usize,
}

impl UpSampling2DLayer {
    pub fn new(channels: usize, input_height: usize, input_width: usize, size: usize) -> Self {
        assert!(size > 0, "upsampling size must be positive");
        Self {
            channels,
            input_height,
            input_width,
            size,
        }
    }
}

impl Layer for UpSampling2DLayer {
    fn kind(&self) -> &'static str {
        "upsampling2d"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size(), "upsampling2d input size");
        let in_spatial = self.input_height * self.input_width;
        let out_w = self.input_width * self.size;
        let out_spatial = in_spatial * self.size * self.size;

        for (plane, out) in input.chunks(in_spatial).zip(output.chunks_mut(out_spatial)) {
            for (oy, out_row) in out.chunks_mut(out_w).enumerate() {
                let in_row = &plane[(oy / self.size) * self.input_width..][..self.input_width];
                for (ox, v) in out_row.iter_mut().enumerate() {
                    *v = in_row[ox / self.size];
                }
            }
        }
    }

    fn backward(
        &self,
        _input: &[f32],
        grad_output: &[f32],
        grad_input: &mut [f32],
        _batch_size: usize,
    ) {
        let in_spatial = self.input_height * self.input_width;
        let out_w = self.input_width * self.size;
        let out_spatial = in_spatial * self.size * self.size;

        grad_input.fill(0.0);
        for (g, gx) in grad_output.chunks(out_spatial).zip(grad_input.chunks_mut(in_spatial)) {
            for (oy, g_row) in g.chunks(out_w).enumerate() {
                let row = (oy / self.size) * self.input_width;
                for (ox, &v) in g_row.iter().enumerate() {
                    gx[row + ox / self.size] += v;
                }
            }
        }
    }

    fn input_size(&self) -> usize {
        self.channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.input_size() * self.size * self.size
    }

    fn output_shape(&self) -> (usize, usize, usize) {
        (
            self.channels,
            self.input_height * self.size,
            self.input_width * self.size,
        )
    }
}

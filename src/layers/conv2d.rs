//! 2D Convolutional layer implementation
//!
//! This module provides a Conv2DLayer that performs 2D convolution with zero
//! padding and configurable stride over NCHW buffers.

use crate::error::Result;
use crate::layers::r#trait::copy_tensors;
use crate::layers::Layer;
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;
use std::cell::RefCell;

/// 2D Convolutional layer with learnable filters.
///
/// # Fields
///
/// * `in_channels` - Number of input channels (e.g., 1 for grayscale, 3 for RGB)
/// * `out_channels` - Number of output feature maps (number of filters)
/// * `kernel_size` - Size of the square convolutional kernel
/// * `padding` - Zero-padding applied symmetrically on all sides
/// * `stride` - Stride for the convolution operation
/// * `weights` - Filters laid out as (out_channels × in_channels × kernel_size × kernel_size)
/// * `biases` - Bias for each output channel
///
/// # Example
///
/// ```
/// use vision_tutorials::layers::{Conv2DLayer, Layer};
/// use vision_tutorials::utils::SimpleRng;
///
/// let mut rng = SimpleRng::new(42);
/// // 1 input channel, 8 filters, 3x3 kernel, padding=1, stride=1, 28x28 input
/// let layer = Conv2DLayer::new(1, 8, 3, 1, 1, 28, 28, &mut rng);
/// assert_eq!(layer.output_size(), 8 * 28 * 28);
/// ```
pub struct Conv2DLayer {
    in_channels: usize,
    out_channels: usize,
    kernel_size: usize,
    padding: isize,
    stride: usize,
    input_height: usize,
    input_width: usize,
    weights: Vec<f32>,
    biases: Vec<f32>,
    // Gradient accumulators (mutable interior via RefCell for trait compatibility)
    grad_weights: RefCell<Vec<f32>>,
    grad_biases: RefCell<Vec<f32>>,
}

/// Output positions `o` for which `o * stride + offset` lands inside
/// `[0, in_len)`, clipped to `[0, out_len)`.
fn valid_range(offset: isize, stride: usize, in_len: usize, out_len: usize) -> (usize, usize) {
    let s = stride as isize;
    let start = if offset >= 0 { 0 } else { (-offset + s - 1) / s };
    let room = in_len as isize - offset;
    let end = if room <= 0 { 0 } else { (room - 1) / s + 1 };
    let end = (end.max(0) as usize).min(out_len);
    let start = (start as usize).min(end);
    (start, end)
}

impl Conv2DLayer {
    /// Create a new Conv2DLayer with Xavier initialization.
    ///
    /// limit = sqrt(6 / (fan_in + fan_out)) with
    /// fan_in = in_channels × kernel_size² and fan_out = out_channels × kernel_size².
    /// Biases are initialized to zero.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        kernel_size: usize,
        padding: isize,
        stride: usize,
        input_height: usize,
        input_width: usize,
        rng: &mut SimpleRng,
    ) -> Self {
        let fan_in = (in_channels * kernel_size * kernel_size) as f32;
        let fan_out = (out_channels * kernel_size * kernel_size) as f32;
        let limit = (6.0f32 / (fan_in + fan_out)).sqrt();

        let weight_count = out_channels * in_channels * kernel_size * kernel_size;
        let mut weights = vec![0.0f32; weight_count];

        for value in &mut weights {
            *value = rng.gen_range_f32(-limit, limit);
        }

        Self {
            in_channels,
            out_channels,
            kernel_size,
            padding,
            stride,
            input_height,
            input_width,
            weights,
            biases: vec![0.0f32; out_channels],
            grad_weights: RefCell::new(vec![0.0f32; weight_count]),
            grad_biases: RefCell::new(vec![0.0f32; out_channels]),
        }
    }

    pub fn in_channels(&self) -> usize {
        self.in_channels
    }

    pub fn out_channels(&self) -> usize {
        self.out_channels
    }

    pub fn kernel_size(&self) -> usize {
        self.kernel_size
    }

    pub fn padding(&self) -> isize {
        self.padding
    }

    pub fn stride(&self) -> usize {
        self.stride
    }

    /// (input_height + 2*padding - kernel_size) / stride + 1
    pub fn output_height(&self) -> usize {
        ((self.input_height as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    /// (input_width + 2*padding - kernel_size) / stride + 1
    pub fn output_width(&self) -> usize {
        ((self.input_width as isize + 2 * self.padding - self.kernel_size as isize)
            / self.stride as isize
            + 1) as usize
    }

    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Replace filters and biases, e.g. with hand-picked kernels in tests.
    pub fn set_parameters(&mut self, weights: Vec<f32>, biases: Vec<f32>) -> Result<()> {
        self.load_parameters(&[weights, biases])
    }

    /// Snapshot of the accumulated weight gradient.
    pub fn grad_weights(&self) -> Vec<f32> {
        self.grad_weights.borrow().clone()
    }

    /// Snapshot of the accumulated bias gradient.
    pub fn grad_biases(&self) -> Vec<f32> {
        self.grad_biases.borrow().clone()
    }
}

impl Layer for Conv2DLayer {
    fn kind(&self) -> &'static str {
        "conv2d"
    }

    fn forward(&self, input: &[f32], output: &mut [f32], batch_size: usize) {
        assert_eq!(input.len(), batch_size * self.input_size(), "conv2d input size");
        assert_eq!(output.len(), batch_size * self.output_size(), "conv2d output size");

        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;

        for b in 0..batch_size {
            let in_b = &input[b * self.in_channels * in_spatial..(b + 1) * self.in_channels * in_spatial];
            let out_b = &mut output[b * self.out_channels * out_spatial..(b + 1) * self.out_channels * out_spatial];

            for oc in 0..self.out_channels {
                let out_c = &mut out_b[oc * out_spatial..(oc + 1) * out_spatial];
                out_c.fill(self.biases[oc]);

                for ic in 0..self.in_channels {
                    let in_c = &in_b[ic * in_spatial..(ic + 1) * in_spatial];
                    let w_base = (oc * self.in_channels + ic) * k * k;

                    for ky in 0..k {
                        let (oy0, oy1) = valid_range(
                            ky as isize - self.padding,
                            self.stride,
                            self.input_height,
                            out_h,
                        );
                        for kx in 0..k {
                            let w = self.weights[w_base + ky * k + kx];
                            if w == 0.0 {
                                continue;
                            }
                            let (ox0, ox1) = valid_range(
                                kx as isize - self.padding,
                                self.stride,
                                self.input_width,
                                out_w,
                            );
                            for oy in oy0..oy1 {
                                let iy = (oy * self.stride + ky) as isize - self.padding;
                                let in_row = iy as usize * self.input_width;
                                let out_row = oy * out_w;
                                for ox in ox0..ox1 {
                                    let ix = ((ox * self.stride + kx) as isize - self.padding) as usize;
                                    out_c[out_row + ox] += w * in_c[in_row + ix];
                                }
                            }
                        }
                    }
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
        let out_h = self.output_height();
        let out_w = self.output_width();
        let out_spatial = out_h * out_w;
        let in_spatial = self.input_height * self.input_width;
        let k = self.kernel_size;

        let mut grad_w = self.grad_weights.borrow_mut();
        let mut grad_b = self.grad_biases.borrow_mut();

        grad_input.fill(0.0);

        for b in 0..batch_size {
            let in_base = b * self.in_channels * in_spatial;
            let g_base_b = b * self.out_channels * out_spatial;

            for oc in 0..self.out_channels {
                let g_c = &grad_output[g_base_b + oc * out_spatial..g_base_b + (oc + 1) * out_spatial];
                grad_b[oc] += g_c.iter().sum::<f32>();

                for ic in 0..self.in_channels {
                    let in_c = in_base + ic * in_spatial;
                    let w_base = (oc * self.in_channels + ic) * k * k;

                    for ky in 0..k {
                        let (oy0, oy1) = valid_range(
                            ky as isize - self.padding,
                            self.stride,
                            self.input_height,
                            out_h,
                        );
                        for kx in 0..k {
                            let w_idx = w_base + ky * k + kx;
                            let w = self.weights[w_idx];
                            let (ox0, ox1) = valid_range(
                                kx as isize - self.padding,
                                self.stride,
                                self.input_width,
                                out_w,
                            );
                            let mut gw = 0.0f32;
                            for oy in oy0..oy1 {
                                let iy = ((oy * self.stride + ky) as isize - self.padding) as usize;
                                let in_row = in_c + iy * self.input_width;
                                let g_row = oy * out_w;
                                for ox in ox0..ox1 {
                                    let ix = ((ox * self.stride + kx) as isize - self.padding) as usize;
                                    let g = g_c[g_row + ox];
                                    gw += g * input[in_row + ix];
                                    grad_input[in_row + ix] += g * w;
                                }
                            }
                            grad_w[w_idx] += gw;
                        }
                    }
                }
            }
        }
    }

    fn update_with_optimizers(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        assert_eq!(optimizers.len(), 2, "conv2d layer takes two optimizers");
        let mut grad_w = self.grad_weights.borrow_mut();
        let mut grad_b = self.grad_biases.borrow_mut();

        optimizers[0].update(&mut self.weights, &grad_w);
        optimizers[1].update(&mut self.biases, &grad_b);

        grad_w.fill(0.0);
        grad_b.fill(0.0);
    }

    fn clear_gradients(&self) {
        self.grad_weights.borrow_mut().fill(0.0);
        self.grad_biases.borrow_mut().fill(0.0);
    }

    fn parameters(&self) -> Vec<&[f32]> {
        vec![self.weights.as_slice(), self.biases.as_slice()]
    }

    fn load_parameters(&mut self, tensors: &[Vec<f32>]) -> Result<()> {
        copy_tensors("conv2d", &mut [&mut self.weights, &mut self.biases], tensors)
    }

    fn input_size(&self) -> usize {
        self.in_channels * self.input_height * self.input_width
    }

    fn output_size(&self) -> usize {
        self.out_channels * self.output_height() * self.output_width()
    }

    fn output_shape(&self) -> (usize, usize, usize) {
        (self.out_channels, self.output_height(), self.output_width())
    }
}

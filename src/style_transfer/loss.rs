//! Content, style and total-variation losses on a convolutional feature
//! network, with their gradient w.r.t. the generated image.

use crate::error::{Result, VisionError};
use crate::model::Sequential;
use serde::{Deserialize, Serialize};

/// Term weights and the layers they are measured at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleLossSettings {
    pub content_weight: f64,
    /// Split evenly across `style_layers`.
    pub style_weight: f64,
    pub total_variation_weight: f64,
    pub content_layer: String,
    pub style_layers: Vec<String>,
}

impl Default for StyleLossSettings {
    fn default() -> Self {
        Self {
            content_weight: 0.025,
            style_weight: 5.0,
            total_variation_weight: 1.0,
            content_layer: "block2_conv2".to_string(),
            style_layers: [
                "block1_conv2",
                "block2_conv2",
                "block3_conv3",
                "block4_conv3",
                "block5_conv3",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
        }
    }
}

/// Image channels used in the style normaliser.
const IMAGE_CHANNELS: usize = 3;

struct StyleTarget {
    index: usize,
    channels: usize,
    gram: Vec<f64>,
}

/// Loss of a candidate image against fixed content and style images.
///
/// Target features are computed once in [`StyleTransferLoss::new`]; every
/// [`StyleTransferLoss::evaluate`] then costs one forward and one backward
/// pass up to the deepest layer used.
pub struct StyleTransferLoss<'a> {
    model: &'a Sequential,
    height: usize,
    width: usize,
    settings: StyleLossSettings,
    content_index: usize,
    content_target: Vec<f32>,
    style_targets: Vec<StyleTarget>,
    depth: usize,
}

impl<'a> StyleTransferLoss<'a> {
    /// `content` and `style` are preprocessed images of `height`×`width`
    /// (three planes each).
    pub fn new(
        model: &'a Sequential,
        height: usize,
        width: usize,
        content: &[f32],
        style: &[f32],
        settings: StyleLossSettings,
    ) -> Result<Self> {
        let expected = IMAGE_CHANNELS * height * width;
        if model.input_size() != expected {
            return Err(VisionError::shape("feature network input", expected, model.input_size()));
        }
        if settings.style_layers.is_empty() {
            return Err(VisionError::InvalidConfig("no style layers given".to_string()));
        }

        let content_index = model.layer_index(&settings.content_layer)?;
        let style_indices = settings
            .style_layers
            .iter()
            .map(|name| model.layer_index(name))
            .collect::<Result<Vec<_>>>()?;
        let depth = style_indices
            .iter()
            .copied()
            .chain(std::iter::once(content_index))
            .max()
            .map_or(0, |i| i + 1);

        let content_acts = model.forward_to(depth, content, 1)?;
        let content_target = content_acts[content_index + 1].clone();

        let style_acts = model.forward_to(depth, style, 1)?;
        let style_targets = style_indices
            .into_iter()
            .map(|index| {
                let channels = model.layers()[index].output_shape().0;
                StyleTarget {
                    index,
                    channels,
                    gram: gram_matrix(&style_acts[index + 1], channels),
                }
            })
            .collect();

        Ok(Self {
            model,
            height,
            width,
            settings,
            content_index,
            content_target,
            style_targets,
            depth,
        })
    }

    pub fn image_len(&self) -> usize {
        IMAGE_CHANNELS * self.height * self.width
    }

    /// Total loss at `x` and its gradient w.r.t. `x`.
    pub fn evaluate(&self, x: &[f64]) -> Result<(f64, Vec<f64>)> {
        let image: Vec<f32> = x.iter().map(|&v| v as f32).collect();
        let activations = self.model.forward_to(self.depth, &image, 1)?;
        let mut taps = Vec::with_capacity(self.style_targets.len() + 1);

        let content_weight = self.settings.content_weight;
        let (content, grad) = content_loss(&self.content_target, &activations[self.content_index + 1]);
        let mut loss = content_weight * content;
        taps.push((self.content_index, scaled(grad, content_weight)));

        let layer_weight = self.settings.style_weight / self.style_targets.len() as f64;
        let size = self.height * self.width;
        for target in &self.style_targets {
            let (style, grad) = style_loss(&target.gram, &activations[target.index + 1], target.channels, size);
            loss += layer_weight * style;
            taps.push((target.index, scaled(grad, layer_weight)));
        }

        let network_grad = self.model.backward_from_taps(&activations, &taps, 1);
        self.model.clear_gradients();

        let tv_weight = self.settings.total_variation_weight;
        let (tv, tv_grad) = total_variation(x, IMAGE_CHANNELS, self.height, self.width);
        loss += tv_weight * tv;

        let grad = network_grad
            .iter()
            .zip(&tv_grad)
            .map(|(&n, &t)| n as f64 + tv_weight * t)
            .collect();
        Ok((loss, grad))
    }
}

fn scaled(grad: Vec<f32>, weight: f64) -> Vec<f32> {
    grad.into_iter().map(|g| (g as f64 * weight) as f32).collect()
}

/// `Σ (combination - target)²` and its gradient w.r.t. `combination`.
pub fn content_loss(target: &[f32], combination: &[f32]) -> (f64, Vec<f32>) {
    assert_eq!(target.len(), combination.len(), "content feature size");
    let mut loss = 0.0f64;
    let grad = combination
        .iter()
        .zip(target)
        .map(|(&c, &t)| {
            let d = c - t;
            loss += (d as f64) * (d as f64);
            2.0 * d
        })
        .collect();
    (loss, grad)
}

/// `F Fᵀ` for features stored as `channels` rows.
pub fn gram_matrix(features: &[f32], channels: usize) -> Vec<f64> {
    let n = features.len() / channels;
    let mut gram = vec![0.0f64; channels * channels];
    for i in 0..channels {
        let fi = &features[i * n..(i + 1) * n];
        for j in i..channels {
            let fj = &features[j * n..(j + 1) * n];
            let v: f64 = fi.iter().zip(fj).map(|(&a, &b)| a as f64 * b as f64).sum();
            gram[i * channels + j] = v;
            gram[j * channels + i] = v;
        }
    }
    gram
}

/// `Σ (S - G)² / (4 · 3² · size²)` with `G` the Gram matrix of `features`,
/// and its gradient w.r.t. `features`. `size` is the image pixel count.
pub fn style_loss(target_gram: &[f64], features: &[f32], channels: usize, size: usize) -> (f64, Vec<f32>) {
    let n = features.len() / channels;
    let gram = gram_matrix(features, channels);
    let norm = 4.0 * (IMAGE_CHANNELS * IMAGE_CHANNELS) as f64 * (size as f64).powi(2);

    let diff: Vec<f64> = target_gram.iter().zip(&gram).map(|(s, g)| s - g).collect();
    let loss = diff.iter().map(|d| d * d).sum::<f64>() / norm;

    // dL/dF = -4 (S - G) F / norm, since S - G is symmetric.
    let mut grad = vec![0.0f64; features.len()];
    for i in 0..channels {
        let row = &mut grad[i * n..(i + 1) * n];
        for j in 0..channels {
            let d = diff[i * channels + j];
            if d == 0.0 {
                continue;
            }
            for (g, &f) in row.iter_mut().zip(&features[j * n..(j + 1) * n]) {
                *g += d * f as f64;
            }
        }
    }
    let scale = -4.0 / norm;
    (loss, grad.into_iter().map(|g| (g * scale) as f32).collect())
}

/// `Σ ((x[i,j] - x[i+1,j])² + (x[i,j] - x[i,j+1])²)^1.25` over every
/// channel and every pixel that has both a lower and a right neighbour.
pub fn total_variation(x: &[f64], channels: usize, height: usize, width: usize) -> (f64, Vec<f64>) {
    assert_eq!(x.len(), channels * height * width, "image size");
    let mut loss = 0.0f64;
    let mut grad = vec![0.0f64; x.len()];
    let plane = height * width;

    for c in 0..channels {
        for i in 0..height.saturating_sub(1) {
            for j in 0..width.saturating_sub(1) {
                let p = c * plane + i * width + j;
                let down = p + width;
                let right = p + 1;
                let dy = x[p] - x[down];
                let dx = x[p] - x[right];
                let t = dy * dy + dx * dx;
                loss += t.powf(1.25);

                let d = 2.5 * t.powf(0.25);
                grad[p] += d * (dy + dx);
                grad[down] -= d * dy;
                grad[right] -= d * dx;
            }
        }
    }
    (loss, grad)
}

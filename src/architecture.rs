//! Architecture configuration structures
//!
//! Networks are described as a JSON list of layers. The same description is
//! written next to saved weights so that a model can be rebuilt later, and
//! the programs construct their topologies through the builders at the end
//! of this module.

use crate::error::{Result, VisionError};
use crate::layers::{
    ActivationLayer, Conv2DLayer, DenseLayer, DropoutLayer, GlobalAvgPoolLayer, Layer,
    MaxPool2DLayer, UpSampling2DLayer,
};
use crate::utils::rng::SimpleRng;
use crate::utils::Activation;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fs;
use std::path::Path;

/// Configuration for a single layer in the neural network.
///
/// Different layer types require different fields:
///
/// - **dense**: `input_size`, `output_size`
/// - **conv2d**: `in_channels`, `out_channels`, `kernel_size`, `input_height`,
///   `input_width`, optional `padding` (default 0) and `stride` (default 1)
/// - **maxpool2d**: `in_channels`, `input_height`, `input_width`, `pool_size`,
///   optional `ceil_mode` (default false)
/// - **upsampling2d**: `in_channels`, `input_height`, `input_width`, `scale`
/// - **global_avg_pool**: `in_channels`, `input_height`, `input_width`
/// - **dropout**: `drop_rate` plus either `size` or the spatial triple
/// - **activation**: `activation` plus either `size` or the spatial triple
///
/// `dense` and `conv2d` accept an `activation` that is applied by a separate
/// activation layer; the layer `name` then refers to the activated output.
///
/// ```json
/// {
///   "layer_type": "conv2d",
///   "name": "block1_conv1",
///   "activation": "relu",
///   "in_channels": 3,
///   "out_channels": 64,
///   "kernel_size": 3,
///   "padding": 1,
///   "input_height": 224,
///   "input_width": 224
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LayerConfig {
    /// One of "dense", "conv2d", "maxpool2d", "upsampling2d", "dropout",
    /// "activation", "global_avg_pool"
    pub layer_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// "relu", "sigmoid", "softmax" or "linear"
    #[serde(skip_serializing_if = "Option::is_none")]
    pub activation: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_size: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_channels: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub out_channels: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kernel_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub padding: Option<isize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stride: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_height: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_width: Option<usize>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pool_size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ceil_mode: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scale: Option<usize>,

    /// Feature count for flat dropout and activation layers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub drop_rate: Option<f32>,
}

/// Configuration for the entire neural network architecture.
///
/// Layers are applied in the order they appear.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArchitectureConfig {
    pub layers: Vec<LayerConfig>,
}

/// A built layer and the name it can be addressed by.
pub struct NamedLayer {
    pub name: Option<String>,
    pub layer: Box<dyn Layer>,
}

const LAYER_TYPES: &str =
    "dense, conv2d, maxpool2d, upsampling2d, dropout, activation, global_avg_pool";

fn invalid(index: usize, message: impl std::fmt::Display) -> VisionError {
    VisionError::InvalidArchitecture(format!("Layer {}: {}", index, message))
}

fn require<T: Copy>(value: Option<T>, index: usize, layer_type: &str, field: &str) -> Result<T> {
    value.ok_or_else(|| invalid(index, format!("{} layer requires '{}'", layer_type, field)))
}

fn require_positive(value: Option<usize>, index: usize, layer_type: &str, field: &str) -> Result<usize> {
    let value = require(value, index, layer_type, field)?;
    if value == 0 {
        return Err(invalid(index, format!("{} must be greater than 0", field)));
    }
    Ok(value)
}

impl LayerConfig {
    fn kind(&self) -> String {
        self.layer_type.to_lowercase()
    }

    /// (channels, height, width) of a spatial input.
    fn spatial_input(&self, index: usize) -> Result<(usize, usize, usize)> {
        let kind = self.kind();
        Ok((
            require_positive(self.in_channels, index, &kind, "in_channels")?,
            require_positive(self.input_height, index, &kind, "input_height")?,
            require_positive(self.input_width, index, &kind, "input_width")?,
        ))
    }

    /// Flat `size` if given, otherwise the spatial triple.
    fn shape_preserving_input(&self, index: usize) -> Result<(usize, usize, usize)> {
        match self.size {
            Some(0) => Err(invalid(index, "size must be greater than 0")),
            Some(size) => Ok((size, 1, 1)),
            None => self.spatial_input(index),
        }
    }

    /// Per-sample input shape (channels, height, width).
    pub fn input_shape(&self, index: usize) -> Result<(usize, usize, usize)> {
        match self.kind().as_str() {
            "dense" => Ok((require_positive(self.input_size, index, "dense", "input_size")?, 1, 1)),
            "conv2d" | "maxpool2d" | "upsampling2d" | "global_avg_pool" => self.spatial_input(index),
            "dropout" | "activation" => self.shape_preserving_input(index),
            _ => Err(invalid(
                index,
                format!("Invalid layer type '{}'. Must be one of: {}", self.layer_type, LAYER_TYPES),
            )),
        }
    }

    /// Per-sample output shape (channels, height, width).
    pub fn output_shape(&self, index: usize) -> Result<(usize, usize, usize)> {
        let (c, h, w) = self.input_shape(index)?;
        match self.kind().as_str() {
            "dense" => Ok((require_positive(self.output_size, index, "dense", "output_size")?, 1, 1)),
            "conv2d" => {
                let out_channels = require_positive(self.out_channels, index, "conv2d", "out_channels")?;
                let kernel = require_positive(self.kernel_size, index, "conv2d", "kernel_size")? as isize;
                let padding = self.padding.unwrap_or(0);
                let stride = self.stride.unwrap_or(1);
                if stride == 0 {
                    return Err(invalid(index, "stride must be greater than 0"));
                }
                if padding < 0 {
                    return Err(invalid(index, "padding must not be negative"));
                }
                let span_h = h as isize + 2 * padding - kernel;
                let span_w = w as isize + 2 * padding - kernel;
                if span_h < 0 || span_w < 0 {
                    return Err(invalid(index, "kernel larger than padded input"));
                }
                let stride = stride as isize;
                Ok((
                    out_channels,
                    (span_h / stride + 1) as usize,
                    (span_w / stride + 1) as usize,
                ))
            }
            "maxpool2d" => {
                let pool = require_positive(self.pool_size, index, "maxpool2d", "pool_size")?;
                let pooled = |len: usize| {
                    if self.ceil_mode.unwrap_or(false) {
                        len.div_ceil(pool)
                    } else {
                        len / pool
                    }
                };
                let (out_h, out_w) = (pooled(h), pooled(w));
                if out_h == 0 || out_w == 0 {
                    return Err(invalid(index, "pool_size larger than input"));
                }
                Ok((c, out_h, out_w))
            }
            "upsampling2d" => {
                let scale = require_positive(self.scale, index, "upsampling2d", "scale")?;
                Ok((c, h * scale, w * scale))
            }
            "global_avg_pool" => Ok((c, 1, 1)),
            _ => Ok((c, h, w)),
        }
    }
}

fn shape_size(shape: (usize, usize, usize)) -> usize {
    shape.0 * shape.1 * shape.2
}

/// Loads an architecture configuration from a JSON file and validates it.
///
/// # Examples
///
/// ```no_run
/// use vision_tutorials::architecture::load_architecture;
///
/// let arch = load_architecture("models/vgg16_features.json").unwrap();
/// assert!(!arch.layers.is_empty());
/// ```
pub fn load_architecture<P: AsRef<Path>>(path: P) -> Result<ArchitectureConfig> {
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| VisionError::file(path, e))?;
    let config: ArchitectureConfig = serde_json::from_str(&contents)?;
    validate_architecture(&config)?;
    Ok(config)
}

/// Writes an architecture as pretty JSON.
pub fn save_architecture<P: AsRef<Path>>(config: &ArchitectureConfig, path: P) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string_pretty(config)?;
    fs::write(path, json).map_err(|e| VisionError::file(path, e))
}

/// Validates an architecture configuration.
///
/// Checks that:
/// - Architecture has at least one layer
/// - Each layer has the required fields for its type with valid values
/// - Layer names are unique
/// - Output size of layer i matches input size of layer i+1 (a spatial
///   output may feed a dense layer, which flattens it)
pub fn validate_architecture(config: &ArchitectureConfig) -> Result<()> {
    if config.layers.is_empty() {
        return Err(VisionError::InvalidArchitecture(
            "Architecture must have at least one layer".to_string(),
        ));
    }

    let mut names = HashSet::new();
    for (i, layer) in config.layers.iter().enumerate() {
        validate_layer(layer, i)?;
        if let Some(name) = &layer.name {
            if !names.insert(name.as_str()) {
                return Err(invalid(i, format!("duplicate layer name '{}'", name)));
            }
        }
    }

    for (i, pair) in config.layers.windows(2).enumerate() {
        let current_output = shape_size(pair[0].output_shape(i)?);
        let next_input = shape_size(pair[1].input_shape(i + 1)?);

        if current_output != next_input {
            return Err(VisionError::InvalidArchitecture(format!(
                "Layer connection mismatch: Layer {} output size ({}) does not match Layer {} input size ({})",
                i,
                current_output,
                i + 1,
                next_input
            )));
        }
    }

    Ok(())
}

/// Validates a single layer configuration.
fn validate_layer(layer: &LayerConfig, index: usize) -> Result<()> {
    layer.output_shape(index)?;

    let kind = layer.kind();
    match (kind.as_str(), layer.activation.as_deref()) {
        ("activation", None) => {
            return Err(invalid(index, "activation layer requires 'activation'"));
        }
        ("dense" | "conv2d" | "activation", Some(name)) => {
            if Activation::from_name(name).is_none() {
                return Err(invalid(index, format!("unknown activation '{}'", name)));
            }
        }
        (_, Some(_)) => {
            return Err(invalid(index, format!("{} layer does not take an activation", kind)));
        }
        _ => {}
    }

    if kind == "dropout" {
        let drop_rate = require(layer.drop_rate, index, "dropout", "drop_rate")?;
        if !(0.0..1.0).contains(&drop_rate) {
            return Err(invalid(index, "drop_rate must be in range [0.0, 1.0)"));
        }
    }

    Ok(())
}

/// Builds the layers described by `config`.
///
/// A fused `activation` on a dense or conv2d layer produces two layers: the
/// linear one (unnamed) followed by an [`ActivationLayer`] carrying the
/// configured name. A `linear` activation adds nothing.
pub fn build_model(config: &ArchitectureConfig, rng: &mut SimpleRng) -> Result<Vec<NamedLayer>> {
    validate_architecture(config)?;
    let mut layers = Vec::with_capacity(config.layers.len());

    for (i, layer_config) in config.layers.iter().enumerate() {
        let (c, h, w) = layer_config.input_shape(i)?;
        let output_shape = layer_config.output_shape(i)?;
        let activation = layer_config
            .activation
            .as_deref()
            .and_then(Activation::from_name)
            .filter(|a| !matches!(a, Activation::Linear));

        let layer: Box<dyn Layer> = match layer_config.kind().as_str() {
            "dense" => Box::new(DenseLayer::new(c, output_shape.0, rng)),
            "conv2d" => Box::new(Conv2DLayer::new(
                c,
                output_shape.0,
                layer_config.kernel_size.unwrap_or(1),
                layer_config.padding.unwrap_or(0),
                layer_config.stride.unwrap_or(1),
                h,
                w,
                rng,
            )),
            "maxpool2d" => Box::new(MaxPool2DLayer::new(
                c,
                h,
                w,
                layer_config.pool_size.unwrap_or(2),
                layer_config.ceil_mode.unwrap_or(false),
            )),
            "upsampling2d" => Box::new(UpSampling2DLayer::new(c, h, w, layer_config.scale.unwrap_or(2))),
            "global_avg_pool" => Box::new(GlobalAvgPoolLayer::new(c, h, w)),
            "dropout" => Box::new(DropoutLayer::new(
                (c, h, w),
                layer_config.drop_rate.unwrap_or(0.0),
                rng,
            )),
            "activation" => {
                let activation = activation.unwrap_or(Activation::Linear);
                layers.push(NamedLayer {
                    name: layer_config.name.clone(),
                    layer: Box::new(ActivationLayer::new(activation, (c, h, w))),
                });
                continue;
            }
            other => {
                return Err(invalid(i, format!("Invalid layer type '{}'. Must be one of: {}", other, LAYER_TYPES)));
            }
        };

        match activation {
            Some(activation) => {
                layers.push(NamedLayer { name: None, layer });
                layers.push(NamedLayer {
                    name: layer_config.name.clone(),
                    layer: Box::new(ActivationLayer::new(activation, output_shape)),
                });
            }
            None => layers.push(NamedLayer {
                name: layer_config.name.clone(),
                layer,
            }),
        }
    }

    Ok(layers)
}

// ---------------------------------------------------------------------------
// Topologies used by the programs
// ---------------------------------------------------------------------------

/// Incrementally builds a chain of layers while tracking the current shape.
pub struct ArchitectureBuilder {
    shape: (usize, usize, usize),
    layers: Vec<LayerConfig>,
}

impl ArchitectureBuilder {
    /// Start from an input of `channels × height × width`.
    pub fn new(channels: usize, height: usize, width: usize) -> Self {
        Self {
            shape: (channels, height, width),
            layers: Vec::new(),
        }
    }

    fn spatial(&self, layer_type: &str) -> LayerConfig {
        LayerConfig {
            layer_type: layer_type.to_string(),
            in_channels: Some(self.shape.0),
            input_height: Some(self.shape.1),
            input_width: Some(self.shape.2),
            ..LayerConfig::default()
        }
    }

    fn push(mut self, layer: LayerConfig) -> Self {
        let index = self.layers.len();
        // Builders only produce well-formed layers; keep the shape unchanged otherwise.
        if let Ok(shape) = layer.output_shape(index) {
            self.shape = shape;
        }
        self.layers.push(layer);
        self
    }

    /// 3×3-style convolution; `same` pads by `kernel / 2`.
    pub fn conv2d(self, filters: usize, kernel: usize, same: bool, activation: &str, name: Option<&str>) -> Self {
        let layer = LayerConfig {
            out_channels: Some(filters),
            kernel_size: Some(kernel),
            padding: Some(if same { (kernel / 2) as isize } else { 0 }),
            stride: Some(1),
            activation: Some(activation.to_string()),
            name: name.map(str::to_string),
            ..self.spatial("conv2d")
        };
        self.push(layer)
    }

    pub fn maxpool(self, pool: usize, ceil_mode: bool, name: Option<&str>) -> Self {
        let layer = LayerConfig {
            pool_size: Some(pool),
            ceil_mode: Some(ceil_mode),
            name: name.map(str::to_string),
            ..self.spatial("maxpool2d")
        };
        self.push(layer)
    }

    pub fn upsample(self, scale: usize) -> Self {
        let layer = LayerConfig {
            scale: Some(scale),
            ..self.spatial("upsampling2d")
        };
        self.push(layer)
    }

    pub fn dropout(self, drop_rate: f32) -> Self {
        let layer = if self.shape.1 == 1 && self.shape.2 == 1 {
            LayerConfig {
                layer_type: "dropout".to_string(),
                size: Some(self.shape.0),
                ..LayerConfig::default()
            }
        } else {
            self.spatial("dropout")
        };
        self.push(LayerConfig {
            drop_rate: Some(drop_rate),
            ..layer
        })
    }

    /// Dense layer over the flattened current shape.
    pub fn dense(self, units: usize, activation: &str, name: Option<&str>) -> Self {
        let layer = LayerConfig {
            layer_type: "dense".to_string(),
            input_size: Some(shape_size(self.shape)),
            output_size: Some(units),
            activation: Some(activation.to_string()),
            name: name.map(str::to_string),
            ..LayerConfig::default()
        };
        self.push(layer)
    }

    pub fn global_avg_pool(self, name: Option<&str>) -> Self {
        let layer = LayerConfig {
            name: name.map(str::to_string),
            ..self.spatial("global_avg_pool")
        };
        self.push(layer)
    }

    pub fn build(self) -> ArchitectureConfig {
        ArchitectureConfig { layers: self.layers }
    }
}

/// VGG16 convolutional base (no classifier head), layers named
/// `block{b}_conv{c}` and `block{b}_pool`.
pub fn vgg16_features(height: usize, width: usize) -> ArchitectureConfig {
    let blocks: [(usize, usize); 5] = [(2, 64), (2, 128), (3, 256), (3, 512), (3, 512)];
    let mut builder = ArchitectureBuilder::new(3, height, width);
    for (b, &(convs, filters)) in blocks.iter().enumerate() {
        for c in 0..convs {
            let name = format!("block{}_conv{}", b + 1, c + 1);
            builder = builder.conv2d(filters, 3, true, "relu", Some(&name));
        }
        let name = format!("block{}_pool", b + 1);
        builder = builder.maxpool(2, false, Some(&name));
    }
    builder.build()
}

/// CIFAR-10 classifier: Conv32-Conv32-Pool-Drop-Conv64-Conv64-Pool-Drop-
/// Dense512-Drop-Dense(softmax).
pub fn cifar10_cnn(height: usize, width: usize, depth: usize, num_classes: usize) -> ArchitectureConfig {
    ArchitectureBuilder::new(depth, height, width)
        .conv2d(32, 3, true, "relu", Some("conv_1"))
        .conv2d(32, 3, true, "relu", Some("conv_2"))
        .maxpool(2, false, Some("pool_1"))
        .dropout(0.25)
        .conv2d(64, 3, true, "relu", Some("conv_3"))
        .conv2d(64, 3, true, "relu", Some("conv_4"))
        .maxpool(2, false, Some("pool_2"))
        .dropout(0.25)
        .dense(512, "relu", Some("hidden"))
        .dropout(0.5)
        .dense(num_classes, "softmax", Some("out"))
        .build()
}

/// Name of the bottleneck layer in [`conv_autoencoder`].
pub const ENCODED_LAYER: &str = "encoded";

/// MNIST convolutional autoencoder with an 8×4×4 bottleneck named
/// [`ENCODED_LAYER`].
pub fn conv_autoencoder() -> ArchitectureConfig {
    ArchitectureBuilder::new(1, 28, 28)
        .conv2d(16, 3, true, "relu", None)
        .maxpool(2, true, None)
        .conv2d(8, 3, true, "relu", None)
        .maxpool(2, true, None)
        .conv2d(8, 3, true, "relu", None)
        .maxpool(2, true, Some(ENCODED_LAYER))
        .conv2d(8, 3, true, "relu", None)
        .upsample(2)
        .conv2d(8, 3, true, "relu", None)
        .upsample(2)
        .conv2d(16, 3, false, "relu", None)
        .upsample(2)
        .conv2d(1, 3, true, "sigmoid", Some("decoded"))
        .build()
}

/// Convolutional feature extractor ending in global average pooling, used
/// for per-frame video features when no pretrained architecture is given.
pub fn frame_feature_extractor(height: usize, width: usize) -> ArchitectureConfig {
    ArchitectureBuilder::new(3, height, width)
        .conv2d(32, 3, true, "relu", None)
        .maxpool(2, false, None)
        .conv2d(64, 3, true, "relu", None)
        .maxpool(2, false, None)
        .conv2d(128, 3, true, "relu", None)
        .global_avg_pool(Some("avg_pool"))
        .build()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dense(input: usize, output: usize) -> LayerConfig {
        LayerConfig {
            layer_type: "dense".to_string(),
            input_size: Some(input),
            output_size: Some(output),
            ..LayerConfig::default()
        }
    }

    #[test]
    fn test_validate_dense_layer_missing_fields() {
        let layer = LayerConfig {
            layer_type: "dense".to_string(),
            input_size: Some(4),
            ..LayerConfig::default()
        };
        let err = validate_layer(&layer, 0).unwrap_err();
        assert!(err.to_string().contains("output_size"));
    }

    #[test]
    fn test_validate_invalid_layer_type() {
        let layer = LayerConfig {
            layer_type: "lstm".to_string(),
            ..LayerConfig::default()
        };
        let err = validate_layer(&layer, 3).unwrap_err();
        assert!(err.to_string().contains("Layer 3"));
        assert!(err.to_string().contains("lstm"));
    }

    #[test]
    fn test_validate_empty_architecture() {
        assert!(validate_architecture(&ArchitectureConfig::default()).is_err());
    }

    #[test]
    fn test_validate_dropout_rate() {
        let layer = LayerConfig {
            layer_type: "dropout".to_string(),
            size: Some(10),
            drop_rate: Some(1.0),
            ..LayerConfig::default()
        };
        assert!(validate_layer(&layer, 0).is_err());
    }

    #[test]
    fn test_validate_unknown_activation() {
        let layer = LayerConfig {
            activation: Some("swish".to_string()),
            ..dense(4, 2)
        };
        assert!(validate_layer(&layer, 0).is_err());
    }

    #[test]
    fn test_validate_layer_connection_mismatch() {
        let config = ArchitectureConfig {
            layers: vec![dense(4, 8), dense(6, 2)],
        };
        let err = validate_architecture(&config).unwrap_err();
        assert!(err.to_string().contains("connection mismatch"));
    }

    #[test]
    fn test_validate_duplicate_names() {
        let mut a = dense(4, 4);
        a.name = Some("x".to_string());
        let b = a.clone();
        let config = ArchitectureConfig { layers: vec![a, b] };
        assert!(validate_architecture(&config).is_err());
    }

    #[test]
    fn test_fused_activation_builds_two_layers() {
        let mut layer = dense(4, 3);
        layer.activation = Some("softmax".to_string());
        layer.name = Some("out".to_string());
        let config = ArchitectureConfig { layers: vec![layer] };

        let mut rng = SimpleRng::new(1);
        let built = build_model(&config, &mut rng).unwrap();
        assert_eq!(built.len(), 2);
        assert_eq!(built[0].layer.kind(), "dense");
        assert_eq!(built[0].name, None);
        assert_eq!(built[1].layer.kind(), "activation");
        assert_eq!(built[1].name.as_deref(), Some("out"));
    }

    #[test]
    fn test_serialization_skips_unset_fields() {
        let json = serde_json::to_string(&dense(2, 3)).unwrap();
        assert_eq!(json, r#"{"layer_type":"dense","input_size":2,"output_size":3}"#);
    }

    #[test]
    fn test_autoencoder_shapes() {
        let config = conv_autoencoder();
        validate_architecture(&config).unwrap();

        let encoded = config
            .layers
            .iter()
            .position(|l| l.name.as_deref() == Some(ENCODED_LAYER))
            .unwrap();
        assert_eq!(config.layers[encoded].output_shape(encoded).unwrap(), (8, 4, 4));

        let last = config.layers.len() - 1;
        assert_eq!(config.layers[last].output_shape(last).unwrap(), (1, 28, 28));
    }

    #[test]
    fn test_cifar10_cnn_shapes() {
        let config = cifar10_cnn(32, 32, 3, 10);
        validate_architecture(&config).unwrap();
        let hidden = config
            .layers
            .iter()
            .find(|l| l.name.as_deref() == Some("hidden"))
            .unwrap();
        assert_eq!(hidden.input_size, Some(64 * 8 * 8));
    }

    #[test]
    fn test_vgg16_layer_names() {
        let config = vgg16_features(32, 32);
        validate_architecture(&config).unwrap();
        let names: Vec<&str> = config.layers.iter().filter_map(|l| l.name.as_deref()).collect();
        assert_eq!(names.len(), 18);
        assert!(names.contains(&"block3_conv3"));
        assert!(names.contains(&"block5_pool"));
    }
}

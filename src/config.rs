//! Per-program configuration.
//!
//! Every program runs with built-in defaults; passing a JSON file as the
//! only command-line argument overrides any subset of the fields.
//!
//! ```json
//! {
//!   "epochs": 20,
//!   "optimizer": { "kind": "adam", "learning_rate": 0.0005 }
//! }
//! ```

use crate::error::{Result, VisionError};
use crate::optimizers::OptimizerKind;
use crate::style_transfer::StyleLossSettings;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Range checks run after a config is deserialized.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(message: impl Into<String>) -> VisionError {
    VisionError::InvalidConfig(message.into())
}

fn require_positive(value: usize, field: &str) -> Result<()> {
    if value == 0 {
        return Err(invalid(format!("{} must be greater than 0", field)));
    }
    Ok(())
}

fn validate_optimizer(optimizer: &OptimizerKind) -> Result<()> {
    let lr = match optimizer {
        OptimizerKind::Sgd { learning_rate } => *learning_rate,
        OptimizerKind::Adam { learning_rate, .. } => *learning_rate,
        OptimizerKind::Adadelta { learning_rate, rho, .. } => {
            if !(0.0..1.0).contains(rho) {
                return Err(invalid("rho must be in [0, 1)"));
            }
            *learning_rate
        }
    };
    if lr <= 0.0 {
        return Err(invalid("learning_rate must be positive"));
    }
    Ok(())
}

/// CIFAR-10 classifier.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CnnConfig {
    pub data_dir: PathBuf,
    pub batch_size: usize,
    pub epochs: usize,
    pub validation_split: f32,
    pub optimizer: OptimizerKind,
    pub architecture_path: PathBuf,
    pub weights_path: PathBuf,
    pub log_path: Option<PathBuf>,
    /// Fixed seed for reproducible runs; time-seeded when absent.
    pub seed: Option<u64>,
}

impl Default for CnnConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/cifar-10-batches-bin"),
            batch_size: 32,
            epochs: 200,
            validation_split: 0.1,
            optimizer: OptimizerKind::adam(),
            architecture_path: PathBuf::from("cnn_cifar10_model.json"),
            weights_path: PathBuf::from("cnn_cifar10_model.bin"),
            log_path: Some(PathBuf::from("logs/training_loss_cnn_cifar10.txt")),
            seed: None,
        }
    }
}

impl Validate for CnnConfig {
    fn validate(&self) -> Result<()> {
        require_positive(self.batch_size, "batch_size")?;
        require_positive(self.epochs, "epochs")?;
        if !(0.0..1.0).contains(&self.validation_split) {
            return Err(invalid("validation_split must be in [0, 1)"));
        }
        validate_optimizer(&self.optimizer)
    }
}

/// MNIST convolutional autoencoder.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AutoencoderConfig {
    pub data_dir: PathBuf,
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    pub optimizer: OptimizerKind,
    /// Per-epoch history goes to `<log_dir>/history.txt`.
    pub log_dir: PathBuf,
    pub encoded_path: PathBuf,
    pub labels_path: PathBuf,
    pub montage_path: PathBuf,
    /// Digits shown in the montage.
    pub display_count: usize,
    /// Read at most this many images per split.
    pub limit: Option<usize>,
    pub seed: Option<u64>,
}

impl Default for AutoencoderConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data/mnist"),
            epochs: 2,
            batch_size: 128,
            shuffle: true,
            optimizer: OptimizerKind::adadelta(),
            log_dir: PathBuf::from("logs/autoencoder"),
            encoded_path: PathBuf::from("data/encoded_imgs.csv"),
            labels_path: PathBuf::from("data/encoded_imgs_labels.csv"),
            montage_path: PathBuf::from("data/autoencoder_montage.png"),
            display_count: 10,
            limit: None,
            seed: None,
        }
    }
}

impl Validate for AutoencoderConfig {
    fn validate(&self) -> Result<()> {
        require_positive(self.epochs, "epochs")?;
        require_positive(self.batch_size, "batch_size")?;
        if self.limit == Some(0) {
            return Err(invalid("limit must be greater than 0"));
        }
        validate_optimizer(&self.optimizer)
    }
}

/// Style transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StyleTransferConfig {
    pub content_image: PathBuf,
    pub style_image: PathBuf,
    pub output_image: PathBuf,
    pub height: usize,
    pub width: usize,
    pub iterations: usize,
    /// Loss evaluations per L-BFGS call.
    pub max_evaluations: usize,
    /// Weights of the VGG16 convolutional base.
    pub weights_path: PathBuf,
    pub loss: StyleLossSettings,
    pub seed: Option<u64>,
}

impl Default for StyleTransferConfig {
    fn default() -> Self {
        Self {
            content_image: PathBuf::from("content.jpg"),
            style_image: PathBuf::from("style.png"),
            output_image: PathBuf::from("generated.png"),
            height: 512,
            width: 512,
            iterations: 10,
            max_evaluations: 20,
            weights_path: PathBuf::from("models/vgg16_features.bin"),
            loss: StyleLossSettings::default(),
            seed: None,
        }
    }
}

impl Validate for StyleTransferConfig {
    fn validate(&self) -> Result<()> {
        // Five 2×2 poolings in the VGG16 base.
        if self.height < 32 || self.width < 32 {
            return Err(invalid("height and width must be at least 32"));
        }
        require_positive(self.max_evaluations, "max_evaluations")?;
        let weights = [
            ("content_weight", self.loss.content_weight),
            ("style_weight", self.loss.style_weight),
            ("total_variation_weight", self.loss.total_variation_weight),
        ];
        for (field, value) in weights {
            if value.is_nan() || value < 0.0 {
                return Err(invalid(format!("{} must be non-negative", field)));
            }
        }
        if self.loss.style_layers.is_empty() {
            return Err(invalid("style_layers must not be empty"));
        }
        Ok(())
    }
}

/// Object detection demo.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectionConfig {
    pub model_name: String,
    pub download_base: String,
    pub label_map_path: PathBuf,
    pub num_classes: i32,
    pub test_images_dir: PathBuf,
    pub number_test_images: usize,
    pub output_dir: PathBuf,
    pub max_boxes: usize,
    pub min_score: f32,
    pub line_thickness: u32,
}

impl Default for DetectionConfig {
    fn default() -> Self {
        Self {
            model_name: crate::detection::archive::MODEL_NAME.to_string(),
            download_base: crate::detection::archive::DOWNLOAD_BASE.to_string(),
            label_map_path: PathBuf::from("data/mscoco_label_map.pbtxt"),
            num_classes: 90,
            test_images_dir: PathBuf::from("test_images"),
            number_test_images: 3,
            output_dir: PathBuf::from("output"),
            max_boxes: 20,
            min_score: 0.5,
            line_thickness: 8,
        }
    }
}

impl DetectionConfig {
    /// `<test_images_dir>/image{1..=n}.jpg`
    pub fn test_image_paths(&self) -> Vec<PathBuf> {
        (1..=self.number_test_images)
            .map(|i| self.test_images_dir.join(format!("image{}.jpg", i)))
            .collect()
    }
}

impl Validate for DetectionConfig {
    fn validate(&self) -> Result<()> {
        if self.model_name.is_empty() {
            return Err(invalid("model_name must not be empty"));
        }
        if self.num_classes < 1 {
            return Err(invalid("num_classes must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.min_score) {
            return Err(invalid("min_score must be in [0, 1]"));
        }
        require_positive(self.line_thickness as usize, "line_thickness")
    }
}

/// Video feature extraction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureExtractionConfig {
    pub data_dir: PathBuf,
    pub seq_length: usize,
    /// Only the first N classes (alphabetically); all when absent.
    pub class_limit: Option<usize>,
    pub max_frames: usize,
    pub architecture_path: PathBuf,
    pub weights_path: PathBuf,
    pub feature_layer: String,
}

impl Default for FeatureExtractionConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("data"),
            seq_length: 40,
            class_limit: None,
            max_frames: 300,
            architecture_path: PathBuf::from("models/extractor.json"),
            weights_path: PathBuf::from("models/extractor.bin"),
            feature_layer: crate::features::FEATURE_LAYER.to_string(),
        }
    }
}

impl Validate for FeatureExtractionConfig {
    fn validate(&self) -> Result<()> {
        require_positive(self.seq_length, "seq_length")?;
        if self.max_frames < self.seq_length {
            return Err(invalid("max_frames must be at least seq_length"));
        }
        if self.class_limit == Some(0) {
            return Err(invalid("class_limit must be greater than 0"));
        }
        Ok(())
    }
}

/// Loads and validates a configuration from a JSON file. Missing fields
/// take their defaults.
pub fn load_config<T, P>(path: P) -> Result<T>
where
    T: DeserializeOwned + Validate,
    P: AsRef<Path>,
{
    let path = path.as_ref();
    let contents = fs::read_to_string(path).map_err(|e| VisionError::file(path, e))?;
    let config: T = serde_json::from_str(&contents)?;
    config.validate()?;
    Ok(config)
}

/// Config from the command line: defaults without arguments, otherwise the
/// JSON file named by the single argument. `args` includes the program name.
pub fn config_from_args<T, I>(args: I) -> Result<T>
where
    T: DeserializeOwned + Validate + Default,
    I: IntoIterator<Item = String>,
{
    let mut args = args.into_iter().skip(1);
    let config = match (args.next(), args.next()) {
        (None, _) => T::default(),
        (Some(path), None) => {
            log::info!("Loading configuration from {}", path);
            load_config(path)?
        }
        (Some(_), Some(_)) => return Err(invalid("expected at most one argument: a JSON config path")),
    };
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        CnnConfig::default().validate().unwrap();
        AutoencoderConfig::default().validate().unwrap();
        StyleTransferConfig::default().validate().unwrap();
        DetectionConfig::default().validate().unwrap();
        FeatureExtractionConfig::default().validate().unwrap();
    }

    #[test]
    fn test_partial_json_keeps_defaults() {
        let cfg: CnnConfig = serde_json::from_str(r#"{ "epochs": 3 }"#).unwrap();
        assert_eq!(cfg.epochs, 3);
        assert_eq!(cfg.batch_size, 32);
        assert_eq!(cfg.optimizer, OptimizerKind::adam());
    }

    #[test]
    fn test_test_image_paths() {
        let cfg = DetectionConfig::default();
        let paths = cfg.test_image_paths();
        assert_eq!(paths.len(), 3);
        assert_eq!(paths[2], PathBuf::from("test_images/image3.jpg"));
    }

    #[test]
    fn test_config_from_args_without_path() {
        let cfg: FeatureExtractionConfig = config_from_args(vec!["extract_features".to_string()]).unwrap();
        assert_eq!(cfg, FeatureExtractionConfig::default());

        let err = config_from_args::<FeatureExtractionConfig, _>(vec![
            "prog".to_string(),
            "a.json".to_string(),
            "b.json".to_string(),
        ]);
        assert!(err.is_err());
    }
}

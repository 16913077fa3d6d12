//! Tests for per-program JSON configuration
//!
//! This file tests:
//! - Loading configs from disk with partial overrides
//! - Nested optimizer and style-loss sections
//! - Range validation for every program config
//! - Command-line selection of the config file

use std::io::Write;
use std::path::PathBuf;
use tempfile::NamedTempFile;
use vision_tutorials::config::{
    config_from_args, load_config, AutoencoderConfig, CnnConfig, DetectionConfig, FeatureExtractionConfig,
    StyleTransferConfig,
};
use vision_tutorials::optimizers::OptimizerKind;
use vision_tutorials::VisionError;

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

// ============================================================================
// Loading Tests
// ============================================================================

mod loading_tests {
    use super::*;

    #[test]
    fn test_cnn_config_with_optimizer_override() {
        let file = write_temp_config(
            r#"{
  "epochs": 5,
  "validation_split": 0.2,
  "optimizer": { "kind": "sgd", "learning_rate": 0.05 },
  "seed": 42
}"#,
        );
        let cfg: CnnConfig = load_config(file.path()).unwrap();
        assert_eq!(cfg.epochs, 5);
        assert_eq!(cfg.validation_split, 0.2);
        assert_eq!(cfg.optimizer, OptimizerKind::Sgd { learning_rate: 0.05 });
        assert_eq!(cfg.seed, Some(42));
        assert_eq!(cfg.batch_size, 32);
    }

    #[test]
    fn test_adam_fields_default_individually() {
        let file = write_temp_config(r#"{ "optimizer": { "kind": "adam", "learning_rate": 0.0005 } }"#);
        let cfg: CnnConfig = load_config(file.path()).unwrap();
        match cfg.optimizer {
            OptimizerKind::Adam {
                learning_rate, beta1, ..
            } => {
                assert_eq!(learning_rate, 0.0005);
                assert_eq!(beta1, 0.9);
            }
            other => panic!("expected adam, got {:?}", other),
        }
    }

    #[test]
    fn test_style_transfer_loss_section() {
        let file = write_temp_config(
            r#"{
  "width": 256,
  "height": 128,
  "loss": { "style_weight": 1.0, "style_layers": ["block1_conv2"] }
}"#,
        );
        let cfg: StyleTransferConfig = load_config(file.path()).unwrap();
        assert_eq!((cfg.width, cfg.height), (256, 128));
        assert_eq!(cfg.loss.style_weight, 1.0);
        assert_eq!(cfg.loss.style_layers, vec!["block1_conv2".to_string()]);
        // Untouched loss fields keep their defaults.
        assert_eq!(cfg.loss.content_weight, 0.025);
        assert_eq!(cfg.loss.content_layer, "block2_conv2");
    }

    #[test]
    fn test_autoencoder_defaults() {
        let file = write_temp_config("{}");
        let cfg: AutoencoderConfig = load_config(file.path()).unwrap();
        assert_eq!(cfg, AutoencoderConfig::default());
        assert_eq!(cfg.epochs, 2);
        assert_eq!(cfg.batch_size, 128);
        assert_eq!(cfg.optimizer, OptimizerKind::adadelta());
    }

    #[test]
    fn test_detection_image_paths_follow_config() {
        let file = write_temp_config(r#"{ "test_images_dir": "imgs", "number_test_images": 2 }"#);
        let cfg: DetectionConfig = load_config(file.path()).unwrap();
        assert_eq!(
            cfg.test_image_paths(),
            vec![PathBuf::from("imgs/image1.jpg"), PathBuf::from("imgs/image2.jpg")]
        );
    }

    #[test]
    fn test_missing_file_is_reported_with_path() {
        let err = load_config::<CnnConfig, _>("no/such/config.json").unwrap_err();
        match err {
            VisionError::File { path, .. } => assert_eq!(path, PathBuf::from("no/such/config.json")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_wrong_field_type_is_json_error() {
        let file = write_temp_config(r#"{ "epochs": "many" }"#);
        assert!(matches!(
            load_config::<CnnConfig, _>(file.path()),
            Err(VisionError::Json(_))
        ));
    }
}

// ============================================================================
// Validation Tests
// ============================================================================

mod validation_tests {
    use super::*;

    fn invalid<T>(json: &str) -> String
    where
        T: serde::de::DeserializeOwned + vision_tutorials::config::Validate + std::fmt::Debug,
    {
        let file = write_temp_config(json);
        match load_config::<T, _>(file.path()) {
            Err(VisionError::InvalidConfig(msg)) => msg,
            other => panic!("expected InvalidConfig, got {:?}", other),
        }
    }

    #[test]
    fn test_cnn_ranges() {
        assert!(invalid::<CnnConfig>(r#"{ "batch_size": 0 }"#).contains("batch_size"));
        assert!(invalid::<CnnConfig>(r#"{ "validation_split": 1.0 }"#).contains("validation_split"));
        assert!(invalid::<CnnConfig>(r#"{ "optimizer": { "kind": "sgd", "learning_rate": 0.0 } }"#)
            .contains("learning_rate"));
    }

    #[test]
    fn test_adadelta_rho_range() {
        let msg = invalid::<AutoencoderConfig>(r#"{ "optimizer": { "kind": "adadelta", "rho": 1.5 } }"#);
        assert!(msg.contains("rho"));
    }

    #[test]
    fn test_style_transfer_ranges() {
        assert!(invalid::<StyleTransferConfig>(r#"{ "width": 0 }"#).contains("width"));
        assert!(invalid::<StyleTransferConfig>(r#"{ "loss": { "content_weight": -1.0 } }"#)
            .contains("content_weight"));
        assert!(invalid::<StyleTransferConfig>(r#"{ "loss": { "style_layers": [] } }"#)
            .contains("style_layers"));
    }

    #[test]
    fn test_detection_ranges() {
        assert!(invalid::<DetectionConfig>(r#"{ "min_score": 1.5 }"#).contains("min_score"));
        assert!(invalid::<DetectionConfig>(r#"{ "num_classes": 0 }"#).contains("num_classes"));
    }

    #[test]
    fn test_feature_extraction_ranges() {
        assert!(invalid::<FeatureExtractionConfig>(r#"{ "seq_length": 50, "max_frames": 40 }"#)
            .contains("max_frames"));
        assert!(invalid::<FeatureExtractionConfig>(r#"{ "class_limit": 0 }"#).contains("class_limit"));
    }
}

// ============================================================================
// Command-Line Tests
// ============================================================================

mod args_tests {
    use super::*;

    fn args(extra: &[&str]) -> Vec<String> {
        std::iter::once("program")
            .chain(extra.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn test_no_argument_gives_defaults() {
        let cfg: StyleTransferConfig = config_from_args(args(&[])).unwrap();
        assert_eq!(cfg, StyleTransferConfig::default());
    }

    #[test]
    fn test_single_argument_is_config_path() {
        let file = write_temp_config(r#"{ "iterations": 3 }"#);
        let path = file.path().to_string_lossy().into_owned();
        let cfg: StyleTransferConfig = config_from_args(args(&[&path])).unwrap();
        assert_eq!(cfg.iterations, 3);
    }

    #[test]
    fn test_extra_arguments_are_rejected() {
        let result = config_from_args::<CnnConfig, _>(args(&["a.json", "b.json"]));
        assert!(matches!(result, Err(VisionError::InvalidConfig(_))));
    }
}

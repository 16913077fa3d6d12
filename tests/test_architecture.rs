//! Tests for architecture parsing, building and model persistence
//!
//! This file tests the architecture module including:
//! - Loading valid JSON architecture configs
//! - Rejecting invalid layer descriptions and broken connections
//! - Fused activations and layer naming in built models
//! - The fixed topologies used by the programs
//! - Saving and reloading a model (architecture + weights)

use std::io::Write;
use tempfile::NamedTempFile;
use vision_tutorials::architecture::{
    build_model, cifar10_cnn, conv_autoencoder, load_architecture, vgg16_features, ArchitectureBuilder,
    ENCODED_LAYER,
};
use vision_tutorials::utils::SimpleRng;
use vision_tutorials::{Sequential, VisionError};

fn write_temp_config(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("failed to create temp file");
    file.write_all(contents.as_bytes())
        .expect("failed to write temp config");
    file
}

// ============================================================================
// Valid Architecture Loading Tests
// ============================================================================

mod valid_architecture_tests {
    use super::*;

    #[test]
    fn test_load_small_cnn() {
        let config_json = r#"{
  "layers": [
    {
      "layer_type": "conv2d",
      "name": "conv",
      "activation": "relu",
      "in_channels": 1,
      "out_channels": 4,
      "kernel_size": 3,
      "padding": 1,
      "input_height": 8,
      "input_width": 8
    },
    {
      "layer_type": "maxpool2d",
      "in_channels": 4,
      "input_height": 8,
      "input_width": 8,
      "pool_size": 2
    },
    {
      "layer_type": "dense",
      "name": "out",
      "activation": "softmax",
      "input_size": 64,
      "output_size": 10
    }
  ]
}"#;

        let temp_file = write_temp_config(config_json);
        let config = load_architecture(temp_file.path()).unwrap();

        assert_eq!(config.layers.len(), 3);
        assert_eq!(config.layers[0].layer_type, "conv2d");
        assert_eq!(config.layers[0].name.as_deref(), Some("conv"));
        assert_eq!(config.layers[1].pool_size, Some(2));
        assert_eq!(config.layers[2].output_size, Some(10));
    }

    #[test]
    fn test_layer_type_is_case_insensitive() {
        let config_json = r#"{
  "layers": [
    { "layer_type": "Dense", "input_size": 4, "output_size": 2 }
  ]
}"#;
        let temp_file = write_temp_config(config_json);
        assert!(load_architecture(temp_file.path()).is_ok());
    }

    #[test]
    fn test_flat_dropout_after_dense() {
        let config_json = r#"{
  "layers": [
    { "layer_type": "dense", "input_size": 6, "output_size": 3 },
    { "layer_type": "dropout", "size": 3, "drop_rate": 0.5 }
  ]
}"#;
        let temp_file = write_temp_config(config_json);
        let config = load_architecture(temp_file.path()).unwrap();
        assert_eq!(config.layers[1].drop_rate, Some(0.5));
    }
}

// ============================================================================
// Invalid Architecture Tests
// ============================================================================

mod invalid_architecture_tests {
    use super::*;

    fn load_err(json: &str) -> VisionError {
        let temp_file = write_temp_config(json);
        load_architecture(temp_file.path()).unwrap_err()
    }

    #[test]
    fn test_missing_file() {
        let err = load_architecture("definitely/not/here.json").unwrap_err();
        assert!(matches!(err, VisionError::File { .. }));
    }

    #[test]
    fn test_malformed_json() {
        let err = load_err(r#"{ "layers": [ { "layer_type": "dense", "#);
        assert!(matches!(err, VisionError::Json(_)));
    }

    #[test]
    fn test_empty_layers() {
        let err = load_err(r#"{ "layers": [] }"#);
        assert!(err.to_string().contains("at least one layer"));
    }

    #[test]
    fn test_unknown_layer_type() {
        let err = load_err(r#"{ "layers": [ { "layer_type": "lstm", "input_size": 4 } ] }"#);
        assert!(err.to_string().contains("Invalid layer type"));
    }

    #[test]
    fn test_unknown_activation() {
        let err = load_err(
            r#"{ "layers": [ { "layer_type": "dense", "input_size": 4, "output_size": 2, "activation": "gelu" } ] }"#,
        );
        assert!(err.to_string().contains("unknown activation"));
    }

    #[test]
    fn test_connection_mismatch() {
        let err = load_err(
            r#"{ "layers": [
                { "layer_type": "dense", "input_size": 4, "output_size": 3 },
                { "layer_type": "dense", "input_size": 5, "output_size": 2 }
            ] }"#,
        );
        assert!(err.to_string().contains("Layer connection mismatch"));
    }

    #[test]
    fn test_duplicate_names() {
        let err = load_err(
            r#"{ "layers": [
                { "layer_type": "dense", "name": "x", "input_size": 4, "output_size": 4 },
                { "layer_type": "dense", "name": "x", "input_size": 4, "output_size": 2 }
            ] }"#,
        );
        assert!(err.to_string().contains("duplicate layer name"));
    }

    #[test]
    fn test_dropout_rate_out_of_range() {
        let err = load_err(r#"{ "layers": [ { "layer_type": "dropout", "size": 4, "drop_rate": 1.0 } ] }"#);
        assert!(err.to_string().contains("drop_rate"));
    }

    #[test]
    fn test_kernel_larger_than_input() {
        let err = load_err(
            r#"{ "layers": [ {
                "layer_type": "conv2d", "in_channels": 1, "out_channels": 1,
                "kernel_size": 5, "input_height": 3, "input_width": 3
            } ] }"#,
        );
        assert!(err.to_string().contains("kernel larger"));
    }
}

// ============================================================================
// Model Building Tests
// ============================================================================

mod build_tests {
    use super::*;

    #[test]
    fn test_fused_activation_adds_named_layer() {
        let arch = ArchitectureBuilder::new(1, 4, 4)
            .conv2d(2, 3, true, "relu", Some("features"))
            .dense(3, "softmax", Some("out"))
            .build();
        let layers = build_model(&arch, &mut SimpleRng::new(1)).unwrap();

        // conv, relu, dense, softmax
        assert_eq!(layers.len(), 4);
        assert_eq!(layers[0].name, None);
        assert_eq!(layers[0].layer.kind(), "conv2d");
        assert_eq!(layers[1].name.as_deref(), Some("features"));
        assert_eq!(layers[1].layer.kind(), "activation");
        assert_eq!(layers[3].name.as_deref(), Some("out"));
    }

    #[test]
    fn test_linear_activation_adds_no_layer() {
        let arch = ArchitectureBuilder::new(4, 1, 1)
            .dense(2, "linear", Some("out"))
            .build();
        let model = Sequential::from_architecture(arch, &mut SimpleRng::new(1)).unwrap();
        assert_eq!(model.len(), 1);
        assert_eq!(model.layer_index("out").unwrap(), 0);
    }

    #[test]
    fn test_cifar10_topology() {
        let model = Sequential::from_architecture(cifar10_cnn(32, 32, 3, 10), &mut SimpleRng::new(1)).unwrap();
        assert_eq!(model.input_size(), 3 * 32 * 32);
        assert_eq!(model.output_size(), 10);
        assert_eq!(model.output_shape_of("pool_2").unwrap(), (64, 8, 8));
    }

    #[test]
    fn test_autoencoder_bottleneck_and_output() {
        let model = Sequential::from_architecture(conv_autoencoder(), &mut SimpleRng::new(1)).unwrap();
        assert_eq!(model.output_shape_of(ENCODED_LAYER).unwrap(), (8, 4, 4));
        assert_eq!(model.output_size(), 28 * 28);
        assert_eq!(model.input_size(), 28 * 28);
    }

    #[test]
    fn test_vgg16_layer_names_and_shapes() {
        let arch = vgg16_features(32, 32);
        let model = Sequential::from_architecture(arch, &mut SimpleRng::new(1)).unwrap();
        assert_eq!(model.output_shape_of("block1_conv2").unwrap(), (64, 32, 32));
        assert_eq!(model.output_shape_of("block3_conv3").unwrap(), (256, 8, 8));
        assert_eq!(model.output_shape_of("block5_conv3").unwrap(), (512, 2, 2));
        assert_eq!(model.output_shape_of("block5_pool").unwrap(), (512, 1, 1));
    }

    #[test]
    fn test_unknown_layer_name() {
        let model = Sequential::from_architecture(cifar10_cnn(8, 8, 3, 2), &mut SimpleRng::new(1)).unwrap();
        assert!(matches!(model.layer_index("nope"), Err(VisionError::UnknownLayer(_))));
    }
}

// ============================================================================
// Persistence Tests
// ============================================================================

mod persistence_tests {
    use super::*;

    #[test]
    fn test_save_and_reload_gives_same_predictions() {
        let dir = tempfile::tempdir().unwrap();
        let arch_path = dir.path().join("model.json");
        let weights_path = dir.path().join("model.bin");

        let arch = ArchitectureBuilder::new(2, 4, 4)
            .conv2d(3, 3, true, "relu", Some("conv"))
            .maxpool(2, false, None)
            .dense(5, "softmax", Some("out"))
            .build();
        let model = Sequential::from_architecture(arch, &mut SimpleRng::new(9)).unwrap();
        model.save(&arch_path, &weights_path).unwrap();

        let loaded = Sequential::load(&arch_path, &weights_path).unwrap();
        assert_eq!(loaded.architecture(), model.architecture());
        assert_eq!(loaded.parameter_count(), model.parameter_count());

        let mut rng = SimpleRng::new(4);
        let input: Vec<f32> = (0..3 * 32).map(|_| rng.gen_range_f32(-1.0, 1.0)).collect();
        let expected = model.predict(&input, 3, 2).unwrap();
        let actual = loaded.predict(&input, 3, 2).unwrap();
        assert_eq!(expected, actual);
    }

    #[test]
    fn test_weights_for_other_architecture_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let arch_path = dir.path().join("a.json");
        let weights_path = dir.path().join("a.bin");

        let small = ArchitectureBuilder::new(4, 1, 1).dense(2, "linear", None).build();
        Sequential::from_architecture(small, &mut SimpleRng::new(1))
            .unwrap()
            .save(&arch_path, &weights_path)
            .unwrap();

        let other = ArchitectureBuilder::new(4, 1, 1).dense(3, "linear", None).build();
        let mut model = Sequential::from_architecture(other, &mut SimpleRng::new(1)).unwrap();
        assert!(matches!(
            model.load_weights(&weights_path),
            Err(VisionError::WeightMismatch(_))
        ));
    }
}

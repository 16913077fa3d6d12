//! End-to-end tests for video feature extraction
//!
//! Builds a miniature dataset on disk (index file plus jpg frames), saves a
//! small extractor network and runs the full sequence extraction over it.

use image::{Rgb, RgbImage};
use std::fs;
use std::path::Path;
use vision_tutorials::architecture::frame_feature_extractor;
use vision_tutorials::datasets::video::{DataSet, DATA_FILE, SEQUENCES_DIR};
use vision_tutorials::features::{extract_sequences, Extractor, FEATURE_LAYER};
use vision_tutorials::utils::SimpleRng;
use vision_tutorials::Sequential;

const SEQ_LENGTH: usize = 3;

/// Index with two usable videos and one too short to keep.
fn write_dataset(root: &Path, frames_per_video: usize) {
    fs::write(
        root.join(DATA_FILE),
        "train,Archery,v_Archery_g01_c01,6\n\
         test,Biking,v_Biking_g01_c01,6\n\
         train,Biking,v_Biking_g02_c01,2\n",
    )
    .unwrap();

    for (split, class, video) in [
        ("train", "Archery", "v_Archery_g01_c01"),
        ("test", "Biking", "v_Biking_g01_c01"),
    ] {
        let dir = root.join(split).join(class);
        fs::create_dir_all(&dir).unwrap();
        for i in 0..frames_per_video {
            let shade = (i * 40) as u8;
            RgbImage::from_pixel(12, 10, Rgb([shade, 255 - shade, 128]))
                .save(dir.join(format!("{}-{:04}.jpg", video, i + 1)))
                .unwrap();
        }
    }
}

fn save_extractor(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let arch_path = dir.join("extractor.json");
    let weights_path = dir.join("extractor.bin");
    Sequential::from_architecture(frame_feature_extractor(8, 8), &mut SimpleRng::new(4))
        .unwrap()
        .save(&arch_path, &weights_path)
        .unwrap();
    (arch_path, weights_path)
}

fn read_rows(path: &Path) -> Vec<Vec<f64>> {
    fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(|line| line.split(' ').map(|v| v.parse().unwrap()).collect())
        .collect()
}

// ============================================================================
// Extraction Tests
// ============================================================================

mod extraction_tests {
    use super::*;

    #[test]
    fn test_extract_writes_one_sequence_per_video() {
        let data_dir = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        write_dataset(data_dir.path(), 6);
        let (arch, weights) = save_extractor(model_dir.path());

        let data = DataSet::new(data_dir.path(), SEQ_LENGTH, None, 300).unwrap();
        assert_eq!(data.data.len(), 2);
        let extractor = Extractor::load(&arch, &weights, FEATURE_LAYER).unwrap();
        let feature_len = extractor.feature_len().unwrap();

        let summary = extract_sequences(&data, &extractor).unwrap();
        assert_eq!(summary.written, 2);
        assert_eq!(summary.skipped, 0);

        let path = data_dir
            .path()
            .join(SEQUENCES_DIR)
            .join("v_Archery_g01_c01-3-features.txt");
        let rows = read_rows(&path);
        assert_eq!(rows.len(), SEQ_LENGTH);
        assert!(rows.iter().all(|r| r.len() == feature_len));

        // Rows are frames 1, 3 and 5 of the six on disk.
        let frame = data_dir.path().join("train/Archery/v_Archery_g01_c01-0003.jpg");
        let expected = extractor.extract(&frame).unwrap();
        for (written, fresh) in rows[1].iter().zip(&expected) {
            assert!((written - *fresh as f64).abs() < 1e-6);
        }
    }

    #[test]
    fn test_second_run_skips_existing_sequences() {
        let data_dir = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        write_dataset(data_dir.path(), 6);
        let (arch, weights) = save_extractor(model_dir.path());

        let data = DataSet::new(data_dir.path(), SEQ_LENGTH, None, 300).unwrap();
        let extractor = Extractor::load(&arch, &weights, FEATURE_LAYER).unwrap();
        extract_sequences(&data, &extractor).unwrap();

        let path = data.sequence_path(&data.data[0]);
        fs::write(&path, "kept\n").unwrap();

        let summary = extract_sequences(&data, &extractor).unwrap();
        assert_eq!(summary.written, 0);
        assert_eq!(summary.skipped, 2);
        assert_eq!(fs::read_to_string(&path).unwrap(), "kept\n");
    }

    #[test]
    fn test_class_limit_restricts_videos() {
        let data_dir = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        write_dataset(data_dir.path(), 6);
        let (arch, weights) = save_extractor(model_dir.path());

        let data = DataSet::new(data_dir.path(), SEQ_LENGTH, Some(1), 300).unwrap();
        assert_eq!(data.classes, vec!["Archery"]);
        let extractor = Extractor::load(&arch, &weights, FEATURE_LAYER).unwrap();

        let summary = extract_sequences(&data, &extractor).unwrap();
        assert_eq!(summary.written, 1);
        assert!(!data_dir
            .path()
            .join(SEQUENCES_DIR)
            .join("v_Biking_g01_c01-3-features.txt")
            .exists());
    }

    #[test]
    fn test_too_few_frames_on_disk_is_an_error() {
        let data_dir = tempfile::tempdir().unwrap();
        let model_dir = tempfile::tempdir().unwrap();
        // The index promises six frames but only two exist.
        write_dataset(data_dir.path(), 2);
        let (arch, weights) = save_extractor(model_dir.path());

        let data = DataSet::new(data_dir.path(), SEQ_LENGTH, None, 300).unwrap();
        let extractor = Extractor::load(&arch, &weights, FEATURE_LAYER).unwrap();
        assert!(extract_sequences(&data, &extractor).is_err());
    }

    #[test]
    fn test_missing_feature_layer() {
        let model_dir = tempfile::tempdir().unwrap();
        let (arch, weights) = save_extractor(model_dir.path());
        assert!(Extractor::load(&arch, &weights, "fc2").is_err());
    }
}

// extract_features.rs
// Per-frame feature sequences for every video in the dataset, used by the
// downstream sequence models.
// Expected files:
//   ./data/data_file.csv (split,class,filename,frame_count)
//   ./data/<split>/<class>/<filename>-NNNN.jpg
//   ./models/extractor.json, ./models/extractor.bin
//     (pretrained network with a pooled layer named "avg_pool")
//
// Output:
//   - data/sequences/<filename>-<seq_length>-features.txt
//     (one space-separated feature row per frame)
//
// Set `class_limit` in the config to extract only the first N classes
// (alphabetically) instead of all of them.
//
// Usage: extract_features [config.json]

use anyhow::{Context, Result};
use vision_tutorials::config::{config_from_args, FeatureExtractionConfig};
use vision_tutorials::datasets::video::DataSet;
use vision_tutorials::features::{extract_sequences, Extractor};

fn main() -> Result<()> {
    env_logger::init();
    let config: FeatureExtractionConfig = config_from_args(std::env::args()).context("loading configuration")?;

    let data = DataSet::new(&config.data_dir, config.seq_length, config.class_limit, config.max_frames)
        .with_context(|| format!("reading video index in {}", config.data_dir.display()))?;

    let extractor = Extractor::load(&config.architecture_path, &config.weights_path, &config.feature_layer)
        .with_context(|| {
            format!(
                "loading extractor {} / {}",
                config.architecture_path.display(),
                config.weights_path.display()
            )
        })?;
    log::info!("Feature length: {}", extractor.feature_len()?);

    let summary = extract_sequences(&data, &extractor)?;
    println!(
        "{} sequences written, {} skipped",
        summary.written, summary.skipped
    );
    Ok(())
}

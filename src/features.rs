//! Per-frame feature vectors for video sequence models.

use crate::datasets::video::{rescale_list, DataSet};
use crate::error::{Result, VisionError};
use crate::imaging::{load_rgb_chw, scale_to_unit_range};
use crate::model::Sequential;
use crate::utils::text::write_rows;
use indicatif::{ProgressBar, ProgressStyle};
use std::fs;
use std::path::Path;

/// Name of the pooled feature layer in the bundled extractor topology.
pub const FEATURE_LAYER: &str = "avg_pool";

/// Runs frames through a pretrained network and returns the output of one
/// named layer.
pub struct Extractor {
    model: Sequential,
    layer: String,
    width: u32,
    height: u32,
}

impl Extractor {
    /// `model` must take RGB images of `height`×`width`.
    pub fn new(model: Sequential, layer: &str, height: usize, width: usize) -> Result<Self> {
        let expected = 3 * height * width;
        if model.input_size() != expected {
            return Err(VisionError::shape("extractor input", expected, model.input_size()));
        }
        model.layer_index(layer)?;
        Ok(Self {
            model,
            layer: layer.to_string(),
            width: width as u32,
            height: height as u32,
        })
    }

    /// Load the network from its architecture and weight files; the input
    /// size is read from the first layer.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(architecture: P, weights: Q, layer: &str) -> Result<Self> {
        let model = Sequential::load(architecture, weights)?;
        let first = model
            .architecture()
            .layers
            .first()
            .ok_or_else(|| VisionError::InvalidArchitecture("empty architecture".to_string()))?;
        let (_, height, width) = first.input_shape(0)?;
        Self::new(model, layer, height, width)
    }

    pub fn feature_len(&self) -> Result<usize> {
        let (c, h, w) = self.model.output_shape_of(&self.layer)?;
        Ok(c * h * w)
    }

    /// Features of one image file, resized to the network input and scaled
    /// to `[-1, 1]`.
    pub fn extract<P: AsRef<Path>>(&self, image_path: P) -> Result<Vec<f32>> {
        let mut pixels = load_rgb_chw(image_path, self.width, self.height)?;
        scale_to_unit_range(&mut pixels);
        self.model.predict_at(&self.layer, &pixels, 1, 1)
    }
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExtractionSummary {
    pub written: usize,
    pub skipped: usize,
}

/// Write one feature sequence per video. Videos whose sequence file already
/// exists are skipped.
pub fn extract_sequences(data: &DataSet, extractor: &Extractor) -> Result<ExtractionSummary> {
    let seq_dir = data.data_dir().join(crate::datasets::video::SEQUENCES_DIR);
    fs::create_dir_all(&seq_dir).map_err(|e| VisionError::file(&seq_dir, e))?;

    let bar = ProgressBar::new(data.data.len() as u64);
    if let Ok(style) = ProgressStyle::with_template("[{elapsed_precise}] {bar:40} {pos}/{len} {msg}") {
        bar.set_style(style);
    }

    let mut summary = ExtractionSummary::default();
    for sample in &data.data {
        let path = data.sequence_path(sample);
        if path.is_file() {
            log::debug!("{} exists, skipping", path.display());
            summary.skipped += 1;
            bar.inc(1);
            continue;
        }
        bar.set_message(sample.filename.clone());

        let frames = data.frames_for_sample(sample)?;
        let frames = rescale_list(&frames, data.seq_length())?;
        let sequence = frames
            .iter()
            .map(|frame| extractor.extract(frame))
            .collect::<Result<Vec<_>>>()?;
        write_rows(&path, &sequence, " ")?;

        summary.written += 1;
        bar.inc(1);
    }
    bar.finish();
    log::info!(
        "{} sequences written, {} already present",
        summary.written,
        summary.skipped
    );
    Ok(summary)
}

//! Index of extracted video frames.
//!
//! The data directory holds `data_file.csv` with one row per video,
//! `split,class,filename,frame_count` (no header), and the frames themselves
//! as `<split>/<class>/<filename>-NNNN.jpg`.

use crate::error::{Result, VisionError};
use serde::Deserialize;
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

pub const DATA_FILE: &str = "data_file.csv";
pub const SEQUENCES_DIR: &str = "sequences";

/// One video from the index.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct VideoSample {
    pub split: String,
    pub class: String,
    pub filename: String,
    pub frame_count: usize,
}

pub struct DataSet {
    data_dir: PathBuf,
    seq_length: usize,
    pub classes: Vec<String>,
    pub data: Vec<VideoSample>,
}

impl DataSet {
    /// Read the index and keep usable samples.
    ///
    /// Classes are the sorted distinct class names, truncated to
    /// `class_limit` when given. A sample is kept when its class is kept and
    /// `seq_length <= frame_count <= max_frames`.
    pub fn new<P: AsRef<Path>>(
        data_dir: P,
        seq_length: usize,
        class_limit: Option<usize>,
        max_frames: usize,
    ) -> Result<Self> {
        let data_dir = data_dir.as_ref().to_path_buf();
        let all = read_index(&data_dir.join(DATA_FILE))?;

        let mut classes: Vec<String> = all
            .iter()
            .map(|s| s.class.clone())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();
        if let Some(limit) = class_limit {
            classes.truncate(limit);
        }

        let data = all
            .into_iter()
            .filter(|s| {
                s.frame_count >= seq_length
                    && s.frame_count <= max_frames
                    && classes.binary_search(&s.class).is_ok()
            })
            .collect::<Vec<_>>();

        log::info!("{} videos in {} classes", data.len(), classes.len());
        Ok(Self {
            data_dir,
            seq_length,
            classes,
            data,
        })
    }

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn seq_length(&self) -> usize {
        self.seq_length
    }

    /// Sorted frame files for `sample`.
    pub fn frames_for_sample(&self, sample: &VideoSample) -> Result<Vec<PathBuf>> {
        let dir = self.data_dir.join(&sample.split).join(&sample.class);
        let entries = fs::read_dir(&dir).map_err(|e| VisionError::file(&dir, e))?;

        let mut frames = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| VisionError::file(&dir, e))?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.starts_with(&sample.filename) && name.ends_with("jpg") {
                frames.push(entry.path());
            }
        }
        frames.sort();
        Ok(frames)
    }

    /// Where the feature sequence of `sample` is stored.
    pub fn sequence_path(&self, sample: &VideoSample) -> PathBuf {
        self.data_dir.join(SEQUENCES_DIR).join(format!(
            "{}-{}-features.txt",
            sample.filename, self.seq_length
        ))
    }
}

fn read_index(path: &Path) -> Result<Vec<VideoSample>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut samples = Vec::new();
    for row in reader.deserialize() {
        samples.push(row?);
    }
    Ok(samples)
}

/// Downsample `items` to exactly `size` elements by taking every
/// `len / size`-th one from the start.
pub fn rescale_list<T: Clone>(items: &[T], size: usize) -> Result<Vec<T>> {
    if size == 0 || items.len() < size {
        return Err(VisionError::shape("frame list", size, items.len()));
    }
    let skip = items.len() / size;
    Ok(items.iter().step_by(skip).take(size).cloned().collect())
}

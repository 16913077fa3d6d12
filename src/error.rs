//! Error types shared by the library modules.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias used throughout the library.
pub type Result<T> = std::result::Result<T, VisionError>;

/// Errors produced while loading data, building models or running the programs.
#[derive(Debug, Error)]
pub enum VisionError {
    /// Underlying I/O failure.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Failure to open or create a specific file.
    #[error("could not access {path}: {source}")]
    File {
        /// Path that could not be accessed.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// JSON (de)serialization failure for configs and architectures.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV reading or writing failure.
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Image decoding or encoding failure.
    #[error("image error: {0}")]
    Image(#[from] image::ImageError),

    /// HTTP download failure.
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// Failure inside the frozen-graph runtime.
    #[error("inference error: {0}")]
    Inference(#[from] tract_tensorflow::prelude::TractError),

    /// Architecture description is structurally invalid.
    #[error("invalid architecture: {0}")]
    InvalidArchitecture(String),

    /// Program configuration holds an out-of-range value.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// Buffer sizes do not agree.
    #[error("shape mismatch in {context}: expected {expected}, got {actual}")]
    ShapeMismatch {
        /// Where the mismatch was detected.
        context: String,
        /// Expected element count.
        expected: usize,
        /// Actual element count.
        actual: usize,
    },

    /// Dataset file is truncated or has an unexpected layout.
    #[error("malformed dataset {path}: {reason}")]
    MalformedDataset {
        /// Dataset file.
        path: PathBuf,
        /// What was wrong with it.
        reason: String,
    },

    /// Label map text is not valid protobuf text format.
    #[error("label map syntax: {0}")]
    LabelMapSyntax(String),

    /// A label map item breaks the id rules.
    #[error("malformed label map item {index}: {reason}")]
    MalformedLabelMap {
        /// 0-based position of the item in the file.
        index: usize,
        /// What was wrong with it.
        reason: String,
    },

    /// Weight file does not match the model it is loaded into.
    #[error("weight file mismatch: {0}")]
    WeightMismatch(String),

    /// A named layer was requested but the model has none by that name.
    #[error("no layer named '{0}'")]
    UnknownLayer(String),
}

impl VisionError {
    /// Wraps an I/O error with the path it concerns.
    pub fn file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        VisionError::File {
            path: path.into(),
            source,
        }
    }

    /// Creates a shape mismatch error.
    pub fn shape(context: impl Into<String>, expected: usize, actual: usize) -> Self {
        VisionError::ShapeMismatch {
            context: context.into(),
            expected,
            actual,
        }
    }

    /// Creates a malformed dataset error.
    pub fn dataset(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        VisionError::MalformedDataset {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_mismatch_message() {
        let err = VisionError::shape("dense input", 784, 10);
        assert_eq!(
            err.to_string(),
            "shape mismatch in dense input: expected 784, got 10"
        );
    }

    #[test]
    fn test_io_conversion() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "missing");
        let err: VisionError = io.into();
        assert!(matches!(err, VisionError::Io(_)));
    }
}

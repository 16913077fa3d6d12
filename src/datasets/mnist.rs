//! MNIST in the IDX format (`train-images-idx3-ubyte` and friends).

use crate::error::{Result, VisionError};
use std::fs;
use std::path::Path;

pub const IMAGE_HEIGHT: usize = 28;
pub const IMAGE_WIDTH: usize = 28;

const IMAGES_MAGIC: u32 = 2051;
const LABELS_MAGIC: u32 = 2049;

/// Images scaled to [0, 1], one 28×28 plane per sample, plus their labels.
#[derive(Debug, Clone)]
pub struct MnistSet {
    pub images: Vec<f32>,
    pub labels: Vec<u8>,
    pub count: usize,
}

// Read a big-endian u32 and advance the byte offset (IDX format uses BE).
fn read_be_u32(data: &[u8], offset: &mut usize, path: &Path) -> Result<u32> {
    let bytes = data
        .get(*offset..*offset + 4)
        .ok_or_else(|| VisionError::dataset(path, "header is truncated"))?;
    *offset += 4;
    Ok(u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

/// Read IDX images and normalize to [0,1] floats. Returns the pixels and the
/// number of images read (at most `limit` when given).
pub fn read_images<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<(Vec<f32>, usize)> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| VisionError::file(path, e))?;

    let mut offset = 0usize;
    let magic = read_be_u32(&data, &mut offset, path)?;
    if magic != IMAGES_MAGIC {
        return Err(VisionError::dataset(path, format!("bad image magic {}", magic)));
    }
    let total_images = read_be_u32(&data, &mut offset, path)? as usize;
    let rows = read_be_u32(&data, &mut offset, path)? as usize;
    let cols = read_be_u32(&data, &mut offset, path)? as usize;

    if rows != IMAGE_HEIGHT || cols != IMAGE_WIDTH {
        return Err(VisionError::dataset(
            path,
            format!("unexpected image shape {}x{}", rows, cols),
        ));
    }

    let count = limit.map_or(total_images, |l| l.min(total_images));
    let total_bytes = count * rows * cols;
    let pixels = data
        .get(offset..offset + total_bytes)
        .ok_or_else(|| VisionError::dataset(path, "image data is truncated"))?;

    Ok((pixels.iter().map(|&p| p as f32 / 255.0).collect(), count))
}

/// Read IDX labels (0-9).
pub fn read_labels<P: AsRef<Path>>(path: P, limit: Option<usize>) -> Result<Vec<u8>> {
    let path = path.as_ref();
    let data = fs::read(path).map_err(|e| VisionError::file(path, e))?;

    let mut offset = 0usize;
    let magic = read_be_u32(&data, &mut offset, path)?;
    if magic != LABELS_MAGIC {
        return Err(VisionError::dataset(path, format!("bad label magic {}", magic)));
    }
    let total_labels = read_be_u32(&data, &mut offset, path)? as usize;
    let count = limit.map_or(total_labels, |l| l.min(total_labels));

    data.get(offset..offset + count)
        .map(<[u8]>::to_vec)
        .ok_or_else(|| VisionError::dataset(path, "label data is truncated"))
}

fn load_set(dir: &Path, prefix: &str, limit: Option<usize>) -> Result<MnistSet> {
    let (images, count) = read_images(dir.join(format!("{}-images-idx3-ubyte", prefix)), limit)?;
    let labels = read_labels(dir.join(format!("{}-labels-idx1-ubyte", prefix)), limit)?;
    if labels.len() != count {
        return Err(VisionError::shape(format!("{} labels", prefix), count, labels.len()));
    }
    Ok(MnistSet {
        images,
        labels,
        count,
    })
}

/// Load the training and test splits from `dir`.
pub fn load_mnist<P: AsRef<Path>>(dir: P, limit: Option<usize>) -> Result<(MnistSet, MnistSet)> {
    let dir = dir.as_ref();
    Ok((load_set(dir, "train", limit)?, load_set(dir, "t10k", limit)?))
}

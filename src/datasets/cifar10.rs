//! CIFAR-10 binary batches (`cifar-10-batches-bin`).
//!
//! Each record is one label byte followed by 3072 pixel bytes: the red,
//! green and blue 32×32 planes in that order, which is already NCHW.

use crate::error::{Result, VisionError};
use std::fs;
use std::path::Path;

pub const HEIGHT: usize = 32;
pub const WIDTH: usize = 32;
pub const DEPTH: usize = 3;
pub const IMAGE_SIZE: usize = HEIGHT * WIDTH * DEPTH;
const RECORD_SIZE: usize = 1 + IMAGE_SIZE;

pub const TRAIN_BATCHES: [&str; 5] = [
    "data_batch_1.bin",
    "data_batch_2.bin",
    "data_batch_3.bin",
    "data_batch_4.bin",
    "data_batch_5.bin",
];
pub const TEST_BATCH: &str = "test_batch.bin";

/// Raw pixel values (0-255 as `f32`) and labels.
#[derive(Debug, Clone, Default)]
pub struct Cifar10Set {
    pub images: Vec<f32>,
    pub labels: Vec<u8>,
}

impl Cifar10Set {
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    fn append_batch(&mut self, path: &Path) -> Result<()> {
        let data = fs::read(path).map_err(|e| VisionError::file(path, e))?;
        if data.is_empty() || data.len() % RECORD_SIZE != 0 {
            return Err(VisionError::dataset(
                path,
                format!("size {} is not a multiple of {}", data.len(), RECORD_SIZE),
            ));
        }
        for record in data.chunks_exact(RECORD_SIZE) {
            self.labels.push(record[0]);
            self.images.extend(record[1..].iter().map(|&p| p as f32));
        }
        Ok(())
    }
}

/// Load one or more batch files into a single set.
pub fn load_batches<P: AsRef<Path>>(paths: &[P]) -> Result<Cifar10Set> {
    let mut set = Cifar10Set::default();
    for path in paths {
        set.append_batch(path.as_ref())?;
    }
    Ok(set)
}

/// Load the five training batches and the test batch from `dir`.
pub fn load_cifar10<P: AsRef<Path>>(dir: P) -> Result<(Cifar10Set, Cifar10Set)> {
    let dir = dir.as_ref();
    let train: Vec<_> = TRAIN_BATCHES.iter().map(|name| dir.join(name)).collect();
    Ok((load_batches(&train)?, load_batches(&[dir.join(TEST_BATCH)])?))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(label: u8, fill: u8) -> Vec<u8> {
        let mut r = vec![fill; RECORD_SIZE];
        r[0] = label;
        r
    }

    #[test]
    fn test_load_batches_concatenates_records() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.bin");
        let b = dir.path().join("b.bin");
        std::fs::write(&a, [record(3, 10), record(7, 20)].concat()).unwrap();
        std::fs::write(&b, record(1, 255)).unwrap();

        let set = load_batches(&[a, b]).unwrap();
        assert_eq!(set.labels, vec![3, 7, 1]);
        assert_eq!(set.images.len(), 3 * IMAGE_SIZE);
        assert_eq!(set.images[IMAGE_SIZE], 20.0);
        assert_eq!(set.images[2 * IMAGE_SIZE + 5], 255.0);
    }

    #[test]
    fn test_partial_record_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.bin");
        std::fs::write(&path, vec![0u8; RECORD_SIZE + 10]).unwrap();
        assert!(load_batches(&[path]).is_err());
    }
}

//! Dataset readers for the programs: MNIST IDX files, CIFAR-10 binary
//! batches and the video-frame index used for feature extraction.

pub mod cifar10;
pub mod mnist;
pub mod video;

use std::collections::BTreeSet;

/// One-hot encode `labels` into rows of width `num_classes`. Labels outside
/// the range produce an all-zero row.
pub fn one_hot(labels: &[u8], num_classes: usize) -> Vec<f32> {
    let mut encoded = vec![0.0f32; labels.len() * num_classes];
    for (row, &label) in encoded.chunks_mut(num_classes.max(1)).zip(labels) {
        if let Some(slot) = row.get_mut(label as usize) {
            *slot = 1.0;
        }
    }
    encoded
}

/// Number of distinct labels.
pub fn count_classes(labels: &[u8]) -> usize {
    labels.iter().collect::<BTreeSet<_>>().len()
}

/// Divide every value by the largest one (no-op for an all-zero buffer).
pub fn normalize_by_max(values: &mut [f32]) {
    let max = values.iter().cloned().fold(0.0f32, f32::max);
    if max > 0.0 {
        for v in values.iter_mut() {
            *v /= max;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_one_hot() {
        assert_eq!(one_hot(&[2, 0], 3), vec![0.0, 0.0, 1.0, 1.0, 0.0, 0.0]);
        assert_eq!(one_hot(&[5], 2), vec![0.0, 0.0]);
    }

    #[test]
    fn test_count_classes() {
        assert_eq!(count_classes(&[3, 1, 3, 7]), 3);
        assert_eq!(count_classes(&[]), 0);
    }

    #[test]
    fn test_normalize_by_max() {
        let mut values = vec![0.0, 127.5, 255.0];
        normalize_by_max(&mut values);
        assert_eq!(values, vec![0.0, 0.5, 1.0]);
    }
}

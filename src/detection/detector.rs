//! Running a frozen TensorFlow detection graph.

use crate::error::{Result, VisionError};
use image::RgbImage;
use std::collections::HashMap;
use std::path::Path;
use tract_tensorflow::prelude::*;

pub const INPUT_NODE: &str = "image_tensor";
pub const OUTPUT_NODES: [&str; 4] = [
    "detection_boxes",
    "detection_scores",
    "detection_classes",
    "num_detections",
];

/// One detected object. `bbox` is `[ymin, xmin, ymax, xmax]` in `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub bbox: [f32; 4],
    pub score: f32,
    pub class_id: i32,
}

pub trait Detector {
    /// Detections for one image, in the order the model reports them.
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>>;
}

type Plan = TypedRunnableModel<TypedModel>;

/// Frozen graph with a `[1, h, w, 3]` `uint8` input. The graph is
/// specialised and optimised once per input size.
pub struct FrozenGraphDetector {
    graph: InferenceModel,
    plans: HashMap<(u32, u32), Plan>,
}

impl FrozenGraphDetector {
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if !path.is_file() {
            return Err(VisionError::file(
                path,
                std::io::Error::new(std::io::ErrorKind::NotFound, "frozen graph not found"),
            ));
        }
        log::info!("Load a (frozen) Tensorflow model into memory.");
        let mut graph = tract_tensorflow::tensorflow().model_for_path(path)?;
        graph.set_input_names([INPUT_NODE])?;
        graph.set_output_names(OUTPUT_NODES)?;
        Ok(Self {
            graph,
            plans: HashMap::new(),
        })
    }

    fn plan(&mut self, width: u32, height: u32) -> Result<&Plan> {
        if !self.plans.contains_key(&(width, height)) {
            let fact = InferenceFact::dt_shape(u8::datum_type(), tvec!(1, height as usize, width as usize, 3));
            let plan = self
                .graph
                .clone()
                .with_input_fact(0, fact)?
                .into_optimized()?
                .into_runnable()?;
            self.plans.insert((width, height), plan);
        }
        self.plans
            .get(&(width, height))
            .ok_or_else(|| VisionError::InvalidConfig("detection plan missing".to_string()))
    }
}

impl Detector for FrozenGraphDetector {
    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Detection>> {
        let (width, height) = image.dimensions();
        let input = Tensor::from_shape::<u8>(&[1, height as usize, width as usize, 3], image.as_raw())?;
        let outputs = self.plan(width, height)?.run(tvec!(input.into()))?;
        if outputs.len() != OUTPUT_NODES.len() {
            return Err(VisionError::shape("detection outputs", OUTPUT_NODES.len(), outputs.len()));
        }

        let boxes: Vec<f32> = outputs[0].to_array_view::<f32>()?.iter().copied().collect();
        let scores: Vec<f32> = outputs[1].to_array_view::<f32>()?.iter().copied().collect();
        let classes: Vec<f32> = outputs[2].to_array_view::<f32>()?.iter().copied().collect();
        let count = outputs[3]
            .to_array_view::<f32>()?
            .iter()
            .next()
            .map_or(scores.len(), |&n| n as usize);

        Ok(decode_detections(&boxes, &scores, &classes, count))
    }
}

/// Zip the flat output tensors into detections, stopping at `count` or at
/// the shortest tensor.
pub fn decode_detections(boxes: &[f32], scores: &[f32], classes: &[f32], count: usize) -> Vec<Detection> {
    boxes
        .chunks_exact(4)
        .zip(scores)
        .zip(classes)
        .take(count)
        .map(|((b, &score), &class)| Detection {
            bbox: [b[0], b[1], b[2], b[3]],
            score,
            class_id: class as i32,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_detections() {
        let boxes = [0.1, 0.2, 0.5, 0.6, 0.0, 0.0, 1.0, 1.0, 0.3, 0.3, 0.4, 0.4];
        let scores = [0.9, 0.6, 0.1];
        let classes = [1.0, 18.0, 3.0];

        let all = decode_detections(&boxes, &scores, &classes, 3);
        assert_eq!(all.len(), 3);
        assert_eq!(all[1].class_id, 18);
        assert_eq!(all[0].bbox, [0.1, 0.2, 0.5, 0.6]);

        assert_eq!(decode_detections(&boxes, &scores, &classes, 1).len(), 1);
        assert_eq!(decode_detections(&boxes, &scores[..2], &classes, 10).len(), 2);
    }

    #[test]
    fn test_missing_graph_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let result = FrozenGraphDetector::load(dir.path().join("absent.pb"));
        assert!(matches!(result, Err(VisionError::File { .. })));
    }
}

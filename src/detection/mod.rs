//! Object detection with a pretrained frozen inference graph.

pub mod archive;
pub mod detector;
pub mod label_map;
pub mod visualize;

pub use detector::{Detection, Detector, FrozenGraphDetector};
pub use label_map::{convert_to_categories, create_category_index, load_label_map, Category, CategoryIndex};
pub use visualize::{draw_detections, DrawOptions};

// object_detection_demo.rs
// Object detection with a pretrained SSD MobileNet frozen graph.
// Expected files:
//   ./data/mscoco_label_map.pbtxt
//   ./test_images/image{1..3}.jpg
// Downloaded on first run:
//   ./ssd_mobilenet_v1_coco_11_06_2017.tar.gz
//     -> ./ssd_mobilenet_v1_coco_11_06_2017/frozen_inference_graph.pb
//
// Output:
//   - output/image{1..3}.png with the detected boxes drawn
//
// Usage: object_detection_demo [config.json]

use anyhow::{Context, Result};
use vision_tutorials::config::{config_from_args, DetectionConfig};
use vision_tutorials::detection::archive::{archive_name, ensure_downloaded, extract_member, GRAPH_FILE};
use vision_tutorials::detection::{
    convert_to_categories, create_category_index, draw_detections, load_label_map, Detector, DrawOptions,
    FrozenGraphDetector,
};
use vision_tutorials::imaging::{load_rgb8, save_png};

fn main() -> Result<()> {
    env_logger::init();
    let config: DetectionConfig = config_from_args(std::env::args()).context("loading configuration")?;

    let archive = archive_name(&config.model_name);
    let url = format!("{}{}", config.download_base, archive);
    ensure_downloaded(&url, &archive).with_context(|| format!("downloading {}", url))?;
    let graph_path = extract_member(&archive, GRAPH_FILE, ".").with_context(|| format!("extracting {}", archive))?;

    let mut detector = FrozenGraphDetector::load(&graph_path)
        .with_context(|| format!("loading {}", graph_path.display()))?;

    log::info!("Loading label map");
    let label_map = load_label_map(&config.label_map_path)
        .with_context(|| format!("reading {}", config.label_map_path.display()))?;
    let categories = convert_to_categories(&label_map, config.num_classes, true);
    let category_index = create_category_index(&categories);

    let options = DrawOptions {
        max_boxes: config.max_boxes,
        min_score: config.min_score,
        line_thickness: config.line_thickness,
    };

    for image_path in config.test_image_paths() {
        log::info!("Evaluating {}", image_path.display());
        let mut image = load_rgb8(&image_path).with_context(|| format!("opening {}", image_path.display()))?;
        let detections = detector.detect(&image)?;
        let labels = draw_detections(&mut image, &detections, &category_index, &options);
        for label in &labels {
            log::info!("  {}", label);
        }

        let stem = image_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "image".to_string());
        let out_path = config.output_dir.join(format!("{}.png", stem));
        save_png(&image, &out_path).with_context(|| format!("saving {}", out_path.display()))?;
    }
    Ok(())
}

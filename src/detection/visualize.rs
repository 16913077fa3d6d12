//! Drawing detection boxes onto images.

use super::detector::Detection;
use super::label_map::CategoryIndex;
use image::{Rgb, RgbImage};

/// Drawing parameters for [`draw_detections`].
#[derive(Debug, Clone, Copy)]
pub struct DrawOptions {
    pub max_boxes: usize,
    /// Boxes need a score strictly above this.
    pub min_score: f32,
    pub line_thickness: u32,
}

impl Default for DrawOptions {
    fn default() -> Self {
        Self {
            max_boxes: 20,
            min_score: 0.5,
            line_thickness: 8,
        }
    }
}

const COLORS: [[u8; 3]; 16] = [
    [240, 248, 255], // alice blue
    [127, 255, 212], // aquamarine
    [255, 127, 80],  // coral
    [220, 20, 60],   // crimson
    [0, 255, 255],   // cyan
    [255, 215, 0],   // gold
    [173, 255, 47],  // green yellow
    [255, 105, 180], // hot pink
    [240, 230, 140], // khaki
    [124, 252, 0],   // lawn green
    [255, 0, 255],   // magenta
    [255, 165, 0],   // orange
    [218, 112, 214], // orchid
    [152, 251, 152], // pale green
    [65, 105, 225],  // royal blue
    [255, 255, 0],   // yellow
];

pub fn class_color(class_id: i32) -> Rgb<u8> {
    Rgb(COLORS[class_id.rem_euclid(COLORS.len() as i32) as usize])
}

/// `"<class name>: <score>%"`, or `N/A` for ids missing from the index.
pub fn detection_label(detection: &Detection, categories: &CategoryIndex) -> String {
    let name = categories
        .get(&detection.class_id)
        .map_or("N/A", |c| c.name.as_str());
    format!("{}: {}%", name, (detection.score * 100.0) as i32)
}

/// Draw the first `max_boxes` detections whose score passes the threshold.
/// Returns the labels of the drawn boxes.
pub fn draw_detections(
    image: &mut RgbImage,
    detections: &[Detection],
    categories: &CategoryIndex,
    options: &DrawOptions,
) -> Vec<String> {
    let mut labels = Vec::new();
    for detection in detections.iter().take(options.max_boxes) {
        if detection.score <= options.min_score {
            continue;
        }
        draw_box(image, detection.bbox, class_color(detection.class_id), options.line_thickness);
        labels.push(detection_label(detection, categories));
    }
    labels
}

/// Outline a normalised `[ymin, xmin, ymax, xmax]` box, lines centred on
/// the box edges.
pub fn draw_box(image: &mut RgbImage, bbox: [f32; 4], color: Rgb<u8>, thickness: u32) {
    let (w, h) = image.dimensions();
    if w == 0 || h == 0 {
        return;
    }
    let to_px = |v: f32, len: u32| (v.clamp(0.0, 1.0) * len as f32) as i64;
    let top = to_px(bbox[0], h);
    let left = to_px(bbox[1], w);
    let bottom = to_px(bbox[2], h);
    let right = to_px(bbox[3], w);

    let half = thickness as i64 / 2;
    let lo = -half;
    let hi = thickness as i64 - half;

    let mut fill = |x0: i64, y0: i64, x1: i64, y1: i64| {
        let x0 = x0.max(0);
        let y0 = y0.max(0);
        let x1 = x1.min(w as i64);
        let y1 = y1.min(h as i64);
        for y in y0..y1 {
            for x in x0..x1 {
                image.put_pixel(x as u32, y as u32, color);
            }
        }
    };

    fill(left + lo, top + lo, right + hi, top + hi);
    fill(left + lo, bottom + lo, right + hi, bottom + hi);
    fill(left + lo, top + lo, left + hi, bottom + hi);
    fill(right + lo, top + lo, right + hi, bottom + hi);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::label_map::Category;

    fn index() -> CategoryIndex {
        let mut index = CategoryIndex::new();
        index.insert(1, Category { id: 1, name: "person".to_string() });
        index
    }

    fn detection(score: f32, class_id: i32) -> Detection {
        Detection {
            bbox: [0.25, 0.25, 0.75, 0.75],
            score,
            class_id,
        }
    }

    #[test]
    fn test_threshold_and_box_limit() {
        let mut img = RgbImage::new(40, 40);
        let detections = vec![detection(0.9, 1), detection(0.5, 1), detection(0.7, 5)];
        let labels = draw_detections(&mut img, &detections, &index(), &DrawOptions::default());
        assert_eq!(labels, vec!["person: 90%", "N/A: 70%"]);

        let options = DrawOptions {
            max_boxes: 1,
            ..DrawOptions::default()
        };
        let labels = draw_detections(&mut img, &detections, &index(), &options);
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_box_outline() {
        let mut img = RgbImage::new(20, 20);
        let red = Rgb([255, 0, 0]);
        draw_box(&mut img, [0.25, 0.25, 0.75, 0.75], red, 2);
        // Edges at 5 and 15, two pixels wide.
        assert_eq!(img.get_pixel(10, 4), &red);
        assert_eq!(img.get_pixel(10, 5), &red);
        assert_eq!(img.get_pixel(4, 10), &red);
        assert_eq!(img.get_pixel(15, 10), &red);
        // Interior untouched.
        assert_eq!(img.get_pixel(10, 10), &Rgb([0, 0, 0]));
        assert_eq!(img.get_pixel(10, 7), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_class_color_wraps() {
        assert_eq!(class_color(0), class_color(COLORS.len() as i32));
        assert_eq!(class_color(-1), class_color(COLORS.len() as i32 - 1));
    }
}

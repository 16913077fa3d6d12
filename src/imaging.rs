//! Image loading, pixel-layout conversions and PNG output.
//!
//! Network inputs are planar `f32` buffers (CHW); `image` buffers are
//! interleaved (HWC). The helpers here convert between the two.

use crate::error::{Result, VisionError};
use image::imageops::FilterType;
use image::{GrayImage, Luma, Rgb, RgbImage};
use std::fs;
use std::path::Path;

/// Means subtracted from the R, G and B planes before the channel order is
/// reversed to BGR.
pub const VGG_CHANNEL_MEANS: [f32; 3] = [103.939, 116.779, 123.68];

/// Decode an image file as 8-bit RGB.
pub fn load_rgb8<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    Ok(image::open(path.as_ref())?.to_rgb8())
}

/// Decode an image, resize it to `width`×`height` (nearest neighbour) and
/// return its RGB planes with values in `[0, 255]`.
pub fn load_rgb_chw<P: AsRef<Path>>(path: P, width: u32, height: u32) -> Result<Vec<f32>> {
    let img = load_rgb8(path)?;
    let img = if img.dimensions() == (width, height) {
        img
    } else {
        image::imageops::resize(&img, width, height, FilterType::Nearest)
    };
    Ok(rgb_to_chw(&img))
}

pub fn rgb_to_chw(img: &RgbImage) -> Vec<f32> {
    let (w, h) = img.dimensions();
    let plane = (w * h) as usize;
    let mut out = vec![0.0f32; 3 * plane];
    for (i, pixel) in img.pixels().enumerate() {
        for c in 0..3 {
            out[c * plane + i] = pixel[c] as f32;
        }
    }
    out
}

/// Interleave planar data: `[c][h][w]` becomes `[h][w][c]`.
pub fn chw_to_hwc(data: &[f32], channels: usize, height: usize, width: usize) -> Vec<f32> {
    assert_eq!(data.len(), channels * height * width, "chw buffer size");
    let plane = height * width;
    let mut out = vec![0.0f32; data.len()];
    for c in 0..channels {
        for p in 0..plane {
            out[p * channels + c] = data[c * plane + p];
        }
    }
    out
}

/// RGB planes in `[0, 255]` to zero-centred BGR planes.
pub fn vgg_preprocess(rgb_chw: &[f32]) -> Vec<f32> {
    let plane = rgb_chw.len() / 3;
    let mut out = vec![0.0f32; rgb_chw.len()];
    for (c, mean) in VGG_CHANNEL_MEANS.iter().enumerate() {
        let src = &rgb_chw[c * plane..(c + 1) * plane];
        let dst = 2 - c;
        for (o, &v) in out[dst * plane..(dst + 1) * plane].iter_mut().zip(src) {
            *o = v - mean;
        }
    }
    out
}

/// Inverse of [`vgg_preprocess`], clipped to 8-bit RGB. Fractions are
/// truncated.
pub fn vgg_deprocess(bgr_chw: &[f32], width: u32, height: u32) -> Result<RgbImage> {
    let plane = (width * height) as usize;
    if bgr_chw.len() != 3 * plane {
        return Err(VisionError::shape("deprocess input", 3 * plane, bgr_chw.len()));
    }
    let mut img = RgbImage::new(width, height);
    for (i, pixel) in img.pixels_mut().enumerate() {
        let mut rgb = [0u8; 3];
        for (c, mean) in VGG_CHANNEL_MEANS.iter().enumerate() {
            rgb[c] = (bgr_chw[(2 - c) * plane + i] + mean).clamp(0.0, 255.0) as u8;
        }
        *pixel = Rgb(rgb);
    }
    Ok(img)
}

/// Map `[0, 255]` to `[-1, 1]`.
pub fn scale_to_unit_range(pixels: &mut [f32]) {
    for p in pixels {
        *p = *p / 127.5 - 1.0;
    }
}

/// One grayscale picture inside a montage.
#[derive(Debug, Clone, Copy)]
pub struct Tile<'a> {
    pub pixels: &'a [f32],
    pub height: usize,
    pub width: usize,
}

/// Lay tiles out on a grid of `cell_height`×`cell_width` cells.
///
/// Each tile is min-max normalised on its own and sampled nearest-neighbour
/// into its cell, so tiles of different sizes can share a grid.
pub fn grayscale_montage(rows: &[Vec<Tile>], cell_height: usize, cell_width: usize) -> GrayImage {
    let cols = rows.iter().map(Vec::len).max().unwrap_or(0);
    let mut img = GrayImage::new((cols * cell_width) as u32, (rows.len() * cell_height) as u32);

    for (r, row) in rows.iter().enumerate() {
        for (c, tile) in row.iter().enumerate() {
            let (min, max) = tile
                .pixels
                .iter()
                .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
            let range = if max > min { max - min } else { 1.0 };

            for y in 0..cell_height {
                let ty = y * tile.height / cell_height;
                for x in 0..cell_width {
                    let tx = x * tile.width / cell_width;
                    let v = tile.pixels.get(ty * tile.width + tx).copied().unwrap_or(min);
                    let level = ((v - min) / range * 255.0).clamp(0.0, 255.0) as u8;
                    img.put_pixel(
                        (c * cell_width + x) as u32,
                        (r * cell_height + y) as u32,
                        Luma([level]),
                    );
                }
            }
        }
    }
    img
}

/// Write `img` as PNG, creating the parent directory when needed.
pub fn save_png<P: AsRef<Path>>(img: &impl SavePng, path: P) -> Result<()> {
    let path = path.as_ref();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| VisionError::file(parent, e))?;
    }
    img.save_png(path)
}

/// Image buffers that can be written as PNG.
pub trait SavePng {
    fn save_png(&self, path: &Path) -> Result<()>;
}

impl SavePng for RgbImage {
    fn save_png(&self, path: &Path) -> Result<()> {
        Ok(self.save_with_format(path, image::ImageFormat::Png)?)
    }
}

impl SavePng for GrayImage {
    fn save_png(&self, path: &Path) -> Result<()> {
        Ok(self.save_with_format(path, image::ImageFormat::Png)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_vgg_round_trip() {
        let mut img = RgbImage::new(2, 1);
        img.put_pixel(0, 0, Rgb([10, 200, 30]));
        img.put_pixel(1, 0, Rgb([255, 0, 128]));

        let pre = vgg_preprocess(&rgb_to_chw(&img));
        // Channel 0 is blue.
        assert_relative_eq!(pre[0], 30.0 - 123.68, epsilon = 1e-4);
        assert_relative_eq!(pre[4], 10.0 - 103.939, epsilon = 1e-4);

        let back = vgg_deprocess(&pre, 2, 1).unwrap();
        for (restored, original) in back.pixels().zip(img.pixels()) {
            for c in 0..3 {
                assert!(original[c].abs_diff(restored[c]) <= 1, "{:?} vs {:?}", restored, original);
            }
        }
    }

    #[test]
    fn test_deprocess_truncates() {
        let data = vec![
            77.9 - VGG_CHANNEL_MEANS[2],
            50.5 - VGG_CHANNEL_MEANS[1],
            100.9 - VGG_CHANNEL_MEANS[0],
        ];
        let img = vgg_deprocess(&data, 1, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([100, 50, 77]));
    }

    #[test]
    fn test_deprocess_clips() {
        let data = vec![500.0, -500.0, 0.0];
        let img = vgg_deprocess(&data, 1, 1).unwrap();
        assert_eq!(img.get_pixel(0, 0), &Rgb([103, 0, 255]));
    }

    #[test]
    fn test_chw_to_hwc() {
        let chw = [1.0, 2.0, 3.0, 4.0, 10.0, 20.0, 30.0, 40.0];
        assert_eq!(
            chw_to_hwc(&chw, 2, 2, 2),
            vec![1.0, 10.0, 2.0, 20.0, 3.0, 30.0, 4.0, 40.0]
        );
    }

    #[test]
    fn test_scale_to_unit_range() {
        let mut p = [0.0, 127.5, 255.0];
        scale_to_unit_range(&mut p);
        assert_eq!(p, [-1.0, 0.0, 1.0]);
    }

    #[test]
    fn test_montage_layout() {
        let a = [0.0, 1.0];
        let b = [5.0];
        let rows = vec![
            vec![Tile { pixels: &a, height: 1, width: 2 }, Tile { pixels: &b, height: 1, width: 1 }],
            vec![Tile { pixels: &a, height: 2, width: 1 }],
        ];
        let img = grayscale_montage(&rows, 2, 2);
        assert_eq!(img.dimensions(), (4, 4));
        assert_eq!(img.get_pixel(0, 0)[0], 0);
        assert_eq!(img.get_pixel(1, 0)[0], 255);
        // Constant tile maps to zero.
        assert_eq!(img.get_pixel(2, 0)[0], 0);
        assert_eq!(img.get_pixel(0, 3)[0], 255);
    }

    #[test]
    fn test_load_resizes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.png");
        let img = RgbImage::from_pixel(4, 4, Rgb([1, 2, 3]));
        save_png(&img, &path).unwrap();

        let chw = load_rgb_chw(&path, 2, 3).unwrap();
        assert_eq!(chw.len(), 3 * 2 * 3);
        assert_eq!(chw[0], 1.0);
        assert_eq!(chw[6], 2.0);
    }
}

// generate_art.rs
// Neural style transfer: repaint a content image in the style of another
// image by minimising VGG16 feature losses with L-BFGS.
// Expected files:
//   ./content.jpg, ./style.png
//   ./models/vgg16_features.bin
//     (weights of the VGG16 convolutional base, layers block{b}_conv{c})
//
// Output:
//   - generated.png
//
// Usage: generate_art [config.json]

use anyhow::{Context, Result};
use vision_tutorials::architecture::vgg16_features;
use vision_tutorials::config::{config_from_args, StyleTransferConfig};
use vision_tutorials::imaging::{load_rgb_chw, save_png, vgg_deprocess, vgg_preprocess};
use vision_tutorials::style_transfer::{generate, initial_noise, StyleTransferLoss};
use vision_tutorials::utils::SimpleRng;
use vision_tutorials::Sequential;

fn main() -> Result<()> {
    env_logger::init();
    let config: StyleTransferConfig = config_from_args(std::env::args()).context("loading configuration")?;
    let (width, height) = (config.width as u32, config.height as u32);

    let content = load_rgb_chw(&config.content_image, width, height)
        .with_context(|| format!("loading content image {}", config.content_image.display()))?;
    let style = load_rgb_chw(&config.style_image, width, height)
        .with_context(|| format!("loading style image {}", config.style_image.display()))?;
    let content = vgg_preprocess(&content);
    let style = vgg_preprocess(&style);

    let mut rng = SimpleRng::new(config.seed.unwrap_or(1));
    if config.seed.is_none() {
        rng.reseed_from_time();
    }

    let mut model = Sequential::from_architecture(vgg16_features(config.height, config.width), &mut rng)?;
    model
        .load_weights(&config.weights_path)
        .with_context(|| format!("loading VGG16 weights {}", config.weights_path.display()))?;
    model.log_summary();

    let loss = StyleTransferLoss::new(
        &model,
        config.height,
        config.width,
        &content,
        &style,
        config.loss.clone(),
    )?;

    let x0 = initial_noise(loss.image_len(), &mut rng);

    let (x, value) = generate(&loss, x0, config.iterations, config.max_evaluations)?;
    log::info!("Final loss value: {:.6e}", value);

    let pixels: Vec<f32> = x.iter().map(|&v| v as f32).collect();
    let image = vgg_deprocess(&pixels, width, height)?;
    save_png(&image, &config.output_image)
        .with_context(|| format!("saving {}", config.output_image.display()))?;
    log::info!("Saved {}", config.output_image.display());
    Ok(())
}

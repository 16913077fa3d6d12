// convolution_autoencoder_mnist.rs
// Convolutional autoencoder on MNIST: 1x28x28 -> 8x4x4 code -> 1x28x28.
// Expected files:
//   ./data/mnist/train-images-idx3-ubyte
//   ./data/mnist/train-labels-idx1-ubyte
//   ./data/mnist/t10k-images-idx3-ubyte
//   ./data/mnist/t10k-labels-idx1-ubyte
//
// Output:
//   - data/encoded_imgs.csv (one 128-value code per test image)
//   - data/encoded_imgs_labels.csv (test labels)
//   - data/autoencoder_montage.png (originals / codes / reconstructions)
//   - logs/autoencoder/history.txt
//
// Usage: convolution_autoencoder_mnist [config.json]

use anyhow::{Context, Result};
use vision_tutorials::architecture::{conv_autoencoder, ENCODED_LAYER};
use vision_tutorials::config::{config_from_args, AutoencoderConfig};
use vision_tutorials::datasets::mnist::{load_mnist, IMAGE_HEIGHT, IMAGE_WIDTH};
use vision_tutorials::imaging::{chw_to_hwc, grayscale_montage, save_png, Tile};
use vision_tutorials::losses::Loss;
use vision_tutorials::training::{FitOptions, Samples, Trainer};
use vision_tutorials::utils::text::{write_column, write_csv};
use vision_tutorials::utils::SimpleRng;
use vision_tutorials::Sequential;

const PIXELS: usize = IMAGE_HEIGHT * IMAGE_WIDTH;

fn digit(data: &[f32], i: usize) -> Tile<'_> {
    Tile {
        pixels: &data[i * PIXELS..(i + 1) * PIXELS],
        height: IMAGE_HEIGHT,
        width: IMAGE_WIDTH,
    }
}

fn main() -> Result<()> {
    env_logger::init();
    let config: AutoencoderConfig = config_from_args(std::env::args()).context("loading configuration")?;

    let (train, test) = load_mnist(&config.data_dir, config.limit)
        .with_context(|| format!("reading MNIST from {}", config.data_dir.display()))?;
    log::info!("Train data shape: ({}, 28, 28, 1)", train.count);
    log::info!("Test data shape: ({}, 28, 28, 1)", test.count);

    let mut rng = SimpleRng::new(config.seed.unwrap_or(1));
    if config.seed.is_none() {
        rng.reseed_from_time();
    }

    let mut model = Sequential::from_architecture(conv_autoencoder(), &mut rng)?;
    model.log_summary();
    let (code_c, code_h, code_w) = model.output_shape_of(ENCODED_LAYER)?;
    let code_len = code_c * code_h * code_w;

    let loss = Loss::BinaryCrossentropy;
    let mut trainer = Trainer::new(&model, loss, &config.optimizer);
    let options = FitOptions {
        epochs: config.epochs,
        batch_size: config.batch_size,
        shuffle: config.shuffle,
        validation_split: 0.0,
        log_path: Some(config.log_dir.join("history.txt")),
    };
    // Inputs are their own targets.
    let train_set = Samples::new(&train.images, &train.images, train.count)?;
    let test_set = Samples::new(&test.images, &test.images, test.count)?;
    trainer.fit(&mut model, train_set, Some(test_set), &options, &mut rng)?;

    let encoded = model.predict_at(ENCODED_LAYER, &test.images, test.count, config.batch_size)?;
    let decoded = model.predict(&test.images, test.count, config.batch_size)?;

    // Codes are stored height-major with channels last.
    let codes: Vec<Vec<f32>> = encoded
        .chunks_exact(code_len)
        .map(|code| chw_to_hwc(code, code_c, code_h, code_w))
        .collect();
    write_csv(&config.encoded_path, &codes)
        .with_context(|| format!("writing {}", config.encoded_path.display()))?;
    let labels: Vec<f32> = test.labels.iter().map(|&l| l as f32).collect();
    write_column(&config.labels_path, &labels)
        .with_context(|| format!("writing {}", config.labels_path.display()))?;
    log::info!("Saved {} codes to {}", codes.len(), config.encoded_path.display());

    let n = config.display_count.min(test.count);
    let rows = vec![
        (0..n).map(|i| digit(&test.images, i)).collect::<Vec<_>>(),
        (0..n)
            .map(|i| Tile {
                pixels: &codes[i],
                height: 8,
                width: code_len / 8,
            })
            .collect(),
        (0..n).map(|i| digit(&decoded, i)).collect(),
    ];
    let montage = grayscale_montage(&rows, IMAGE_HEIGHT * 2, IMAGE_WIDTH * 2);
    save_png(&montage, &config.montage_path)?;
    log::info!("Montage written to {}", config.montage_path.display());
    Ok(())
}

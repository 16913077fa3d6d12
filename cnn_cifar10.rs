// cnn_cifar10.rs
// Convolutional classifier for CIFAR-10 on CPU.
// Expected files (binary version of the dataset):
//   ./data/cifar-10-batches-bin/data_batch_{1..5}.bin
//   ./data/cifar-10-batches-bin/test_batch.bin
//
// Output:
//   - cnn_cifar10_model.json / cnn_cifar10_model.bin (architecture + weights)
//   - logs/training_loss_cnn_cifar10.txt (epoch,loss,val_loss,accuracy,seconds)
//   - logs test accuracy of the reloaded model
//
// Usage: cnn_cifar10 [config.json]

use anyhow::{Context, Result};
use vision_tutorials::architecture::cifar10_cnn;
use vision_tutorials::config::{config_from_args, CnnConfig};
use vision_tutorials::datasets::cifar10::{self, load_cifar10};
use vision_tutorials::datasets::{count_classes, normalize_by_max, one_hot};
use vision_tutorials::losses::Loss;
use vision_tutorials::training::{evaluate, FitOptions, Samples, Trainer};
use vision_tutorials::utils::SimpleRng;
use vision_tutorials::Sequential;

fn main() -> Result<()> {
    env_logger::init();
    let config: CnnConfig = config_from_args(std::env::args()).context("loading configuration")?;

    log::info!("Loading CIFAR-10 from {}", config.data_dir.display());
    let (mut train, mut test) = load_cifar10(&config.data_dir)
        .with_context(|| format!("reading CIFAR-10 batches in {}", config.data_dir.display()))?;
    let num_classes = count_classes(&train.labels);
    log::info!("Train: {} | Test: {} | Classes: {}", train.len(), test.len(), num_classes);

    normalize_by_max(&mut train.images);
    normalize_by_max(&mut test.images);
    let train_targets = one_hot(&train.labels, num_classes);
    let test_targets = one_hot(&test.labels, num_classes);

    let mut rng = SimpleRng::new(config.seed.unwrap_or(1));
    if config.seed.is_none() {
        rng.reseed_from_time();
    }

    let architecture = cifar10_cnn(cifar10::HEIGHT, cifar10::WIDTH, cifar10::DEPTH, num_classes);
    let mut model = Sequential::from_architecture(architecture, &mut rng)?;
    model.log_summary();

    let train_set = Samples::new(&train.images, &train_targets, train.len())?;
    let test_set = Samples::new(&test.images, &test_targets, test.len())?;

    let loss = Loss::CategoricalCrossentropy;
    let mut trainer = Trainer::new(&model, loss, &config.optimizer);
    let options = FitOptions {
        epochs: config.epochs,
        batch_size: config.batch_size,
        shuffle: true,
        validation_split: config.validation_split,
        log_path: config.log_path.clone(),
    };
    trainer.fit(&mut model, train_set, None, &options, &mut rng)?;

    let score = evaluate(&model, loss, test_set, config.batch_size)?;
    log::info!("Test loss: {:.4}", score.loss);

    model
        .save(&config.architecture_path, &config.weights_path)
        .context("saving model")?;
    log::info!("Saved model to disk");

    let loaded = Sequential::load(&config.architecture_path, &config.weights_path).context("reloading model")?;
    log::info!("Loaded model from disk");

    let score = evaluate(&loaded, loss, test_set, config.batch_size)?;
    println!("accuracy: {:.2}%", score.accuracy.unwrap_or(0.0) * 100.0);
    Ok(())
}

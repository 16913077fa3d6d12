//! Mini-batch training loop for [`Sequential`] models.
//!
//! Mirrors the usual `fit`/`evaluate` pair: shuffled mini-batches, optional
//! held-out validation (a trailing split or explicit data), per-epoch
//! logging through `log` and an optional plain-text history file with lines
//! `epoch,loss,val_loss,accuracy,seconds`.

use crate::error::{Result, VisionError};
use crate::losses::Loss;
use crate::model::Sequential;
use crate::optimizers::{Optimizer, OptimizerKind};
use crate::utils::{argmax_rows, SimpleRng};
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use std::time::Instant;

/// Samples stored as one flat buffer each for inputs and targets.
#[derive(Debug, Clone, Copy)]
pub struct Samples<'a> {
    pub inputs: &'a [f32],
    pub targets: &'a [f32],
    pub count: usize,
}

impl<'a> Samples<'a> {
    pub fn new(inputs: &'a [f32], targets: &'a [f32], count: usize) -> Result<Self> {
        if count == 0 {
            return Err(VisionError::InvalidConfig("no samples to train on".to_string()));
        }
        if inputs.len() % count != 0 || targets.len() % count != 0 {
            return Err(VisionError::shape("samples", count, inputs.len()));
        }
        Ok(Self {
            inputs,
            targets,
            count,
        })
    }

    fn input_size(&self) -> usize {
        self.inputs.len() / self.count
    }

    fn target_size(&self) -> usize {
        self.targets.len() / self.count
    }

    /// Split off the last `fraction` of the samples.
    pub fn split_tail(&self, fraction: f32) -> (Samples<'a>, Option<Samples<'a>>) {
        let held_out = (self.count as f32 * fraction) as usize;
        if held_out == 0 || held_out >= self.count {
            return (*self, None);
        }
        let kept = self.count - held_out;
        let (xi, xv) = self.inputs.split_at(kept * self.input_size());
        let (ti, tv) = self.targets.split_at(kept * self.target_size());
        (
            Samples {
                inputs: xi,
                targets: ti,
                count: kept,
            },
            Some(Samples {
                inputs: xv,
                targets: tv,
                count: held_out,
            }),
        )
    }
}

#[derive(Debug, Clone)]
pub struct FitOptions {
    pub epochs: usize,
    pub batch_size: usize,
    pub shuffle: bool,
    /// Fraction of the training samples (taken from the end) held out for
    /// validation. Ignored when explicit validation data is passed.
    pub validation_split: f32,
    /// Append per-epoch history to this file.
    pub log_path: Option<PathBuf>,
}

impl Default for FitOptions {
    fn default() -> Self {
        Self {
            epochs: 1,
            batch_size: 32,
            shuffle: true,
            validation_split: 0.0,
            log_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EpochStats {
    pub epoch: usize,
    pub loss: f32,
    pub accuracy: Option<f32>,
    pub val_loss: Option<f32>,
    pub val_accuracy: Option<f32>,
    pub seconds: f32,
}

#[derive(Debug, Clone, Default)]
pub struct History {
    pub epochs: Vec<EpochStats>,
}

/// Loss (and accuracy for categorical targets) over a sample set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Evaluation {
    pub loss: f32,
    pub accuracy: Option<f32>,
}

/// Holds the loss and one optimizer instance per parameter tensor.
pub struct Trainer {
    loss: Loss,
    optimizers: Vec<Box<dyn Optimizer>>,
}

impl Trainer {
    pub fn new(model: &Sequential, loss: Loss, optimizer: &OptimizerKind) -> Self {
        Self {
            loss,
            optimizers: optimizer.build_many(model.optimizer_slots()),
        }
    }

    /// One forward/backward/update step. Returns the batch loss and the
    /// number of correct argmax predictions.
    pub fn train_batch(&mut self, model: &mut Sequential, inputs: &[f32], targets: &[f32], batch_size: usize) -> Result<(f32, usize)> {
        let activations = model.forward_all(inputs, batch_size)?;
        let predictions = activations.last().map(Vec::as_slice).unwrap_or_default();
        if predictions.len() != targets.len() {
            return Err(VisionError::shape("targets", predictions.len(), targets.len()));
        }

        let cols = model.output_size();
        let (loss, grad) = self.loss.evaluate(predictions, targets, cols);
        let correct = count_correct(predictions, targets, cols);

        model.backward(&activations, &grad, batch_size);
        model.apply_gradients(&mut self.optimizers);
        Ok((loss, correct))
    }

    /// Train for `options.epochs` epochs.
    pub fn fit(
        &mut self,
        model: &mut Sequential,
        train: Samples<'_>,
        validation: Option<Samples<'_>>,
        options: &FitOptions,
        rng: &mut SimpleRng,
    ) -> Result<History> {
        if options.batch_size == 0 {
            return Err(VisionError::InvalidConfig("batch_size must be positive".to_string()));
        }
        let (train, split) = if validation.is_some() {
            (train, validation)
        } else {
            train.split_tail(options.validation_split)
        };
        let validation = split;

        let mut log_file = match &options.log_path {
            Some(path) => {
                if let Some(parent) = path.parent() {
                    fs::create_dir_all(parent).map_err(|e| VisionError::file(parent, e))?;
                }
                let file = File::create(path).map_err(|e| VisionError::file(path, e))?;
                let mut writer = BufWriter::new(file);
                writeln!(writer, "epoch,loss,val_loss,accuracy,seconds")?;
                Some(writer)
            }
            None => None,
        };

        let in_size = train.input_size();
        let target_size = train.target_size();
        let categorical = self.loss == Loss::CategoricalCrossentropy;
        let mut order: Vec<usize> = (0..train.count).collect();
        let mut batch_inputs = Vec::with_capacity(options.batch_size * in_size);
        let mut batch_targets = Vec::with_capacity(options.batch_size * target_size);
        let mut history = History::default();

        log::info!(
            "Training on {} samples, validating on {}",
            train.count,
            validation.map_or(0, |v| v.count)
        );

        for epoch in 0..options.epochs {
            let start_time = Instant::now();
            model.set_training(true);
            if options.shuffle {
                rng.shuffle_usize(&mut order);
            }

            let mut total_loss = 0.0f32;
            let mut total_correct = 0usize;
            for (batch_idx, indices) in order.chunks(options.batch_size).enumerate() {
                batch_inputs.clear();
                batch_targets.clear();
                for &i in indices {
                    batch_inputs.extend_from_slice(&train.inputs[i * in_size..(i + 1) * in_size]);
                    batch_targets.extend_from_slice(&train.targets[i * target_size..(i + 1) * target_size]);
                }
                let (loss, correct) = self.train_batch(model, &batch_inputs, &batch_targets, indices.len())?;
                total_loss += loss * indices.len() as f32;
                total_correct += correct;
                log::debug!("epoch {} batch {} loss {:.6}", epoch + 1, batch_idx + 1, loss);
            }
            model.set_training(false);

            let loss = total_loss / train.count as f32;
            let accuracy = categorical.then(|| total_correct as f32 / train.count as f32);
            let evaluation = match validation {
                Some(v) => Some(evaluate(model, self.loss, v, options.batch_size)?),
                None => None,
            };
            let stats = EpochStats {
                epoch: epoch + 1,
                loss,
                accuracy,
                val_loss: evaluation.map(|e| e.loss),
                val_accuracy: evaluation.and_then(|e| e.accuracy),
                seconds: start_time.elapsed().as_secs_f32(),
            };

            log::info!(
                "Epoch {}/{} | loss={:.6}{}{} | time={:.3}s",
                stats.epoch,
                options.epochs,
                stats.loss,
                stats.val_loss.map(|v| format!(" val_loss={:.6}", v)).unwrap_or_default(),
                stats.val_accuracy.map(|v| format!(" val_acc={:.4}", v)).unwrap_or_default(),
                stats.seconds
            );
            if let Some(writer) = log_file.as_mut() {
                writeln!(
                    writer,
                    "{},{},{},{},{}",
                    stats.epoch,
                    stats.loss,
                    stats.val_loss.map(|v| v.to_string()).unwrap_or_default(),
                    stats.accuracy.map(|v| v.to_string()).unwrap_or_default(),
                    stats.seconds
                )?;
                writer.flush()?;
            }
            history.epochs.push(stats);
        }

        Ok(history)
    }
}

fn count_correct(predictions: &[f32], targets: &[f32], cols: usize) -> usize {
    if cols < 2 {
        return 0;
    }
    argmax_rows(predictions, cols)
        .into_iter()
        .zip(argmax_rows(targets, cols))
        .filter(|(p, t)| p == t)
        .count()
}

/// Loss and (for categorical cross-entropy) accuracy in inference mode.
pub fn evaluate(model: &Sequential, loss: Loss, samples: Samples<'_>, batch_size: usize) -> Result<Evaluation> {
    let predictions = model.predict(samples.inputs, samples.count, batch_size)?;
    if predictions.len() != samples.targets.len() {
        return Err(VisionError::shape("targets", predictions.len(), samples.targets.len()));
    }
    let cols = model.output_size();
    let (value, _) = loss.evaluate(&predictions, samples.targets, cols);
    let accuracy = (loss == Loss::CategoricalCrossentropy)
        .then(|| count_correct(&predictions, samples.targets, cols) as f32 / samples.count as f32);
    Ok(Evaluation {
        loss: value,
        accuracy,
    })
}

//! Sequential model: an ordered chain of layers with optional names.
//!
//! Besides plain prediction the model exposes every intermediate activation
//! (`forward_all`) and can push gradients injected at several depths back to
//! the input (`backward_from_taps`), which the style-transfer loss needs.
//!
//! Weights are persisted in a small binary format:
//!
//! ```text
//! b"VTW1"
//! u32 layer count
//! per layer:  u32 tensor count
//!   per tensor: u64 value count, then that many little-endian f32
//! ```

use crate::architecture::{build_model, load_architecture, save_architecture, ArchitectureConfig};
use crate::error::{Result, VisionError};
use crate::layers::Layer;
use crate::optimizers::Optimizer;
use crate::utils::SimpleRng;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

const WEIGHTS_MAGIC: &[u8; 4] = b"VTW1";

pub struct Sequential {
    layers: Vec<Box<dyn Layer>>,
    names: Vec<Option<String>>,
    architecture: ArchitectureConfig,
}

impl Sequential {
    /// Build a freshly initialised model from an architecture description.
    pub fn from_architecture(architecture: ArchitectureConfig, rng: &mut SimpleRng) -> Result<Self> {
        let built = build_model(&architecture, rng)?;
        let (names, layers) = built.into_iter().map(|l| (l.name, l.layer)).unzip();
        Ok(Self {
            layers,
            names,
            architecture,
        })
    }

    /// Wrap hand-built layers. Such a model has no architecture description
    /// and cannot be saved.
    pub fn from_layers(layers: Vec<(Option<String>, Box<dyn Layer>)>) -> Self {
        let (names, layers) = layers.into_iter().unzip();
        Self {
            layers,
            names,
            architecture: ArchitectureConfig::default(),
        }
    }

    /// Rebuild a model from an architecture file and a weight file.
    pub fn load<P: AsRef<Path>, Q: AsRef<Path>>(architecture_path: P, weights_path: Q) -> Result<Self> {
        let architecture = load_architecture(architecture_path)?;
        let mut rng = SimpleRng::new(1);
        let mut model = Self::from_architecture(architecture, &mut rng)?;
        model.load_weights(weights_path)?;
        Ok(model)
    }

    /// Write the architecture (pretty JSON) and the weights.
    pub fn save<P: AsRef<Path>, Q: AsRef<Path>>(&self, architecture_path: P, weights_path: Q) -> Result<()> {
        if self.architecture.layers.is_empty() {
            return Err(VisionError::InvalidArchitecture(
                "model was built without an architecture description".to_string(),
            ));
        }
        save_architecture(&self.architecture, architecture_path)?;
        self.save_weights(weights_path)
    }

    pub fn architecture(&self) -> &ArchitectureConfig {
        &self.architecture
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[Box<dyn Layer>] {
        &self.layers
    }

    pub fn input_size(&self) -> usize {
        self.layers.first().map_or(0, |l| l.input_size())
    }

    pub fn output_size(&self) -> usize {
        self.layers.last().map_or(0, |l| l.output_size())
    }

    pub fn parameter_count(&self) -> usize {
        self.layers.iter().map(|l| l.parameter_count()).sum()
    }

    /// Index of the layer called `name`.
    pub fn layer_index(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n.as_deref() == Some(name))
            .ok_or_else(|| VisionError::UnknownLayer(name.to_string()))
    }

    /// Output shape (channels, height, width) of the layer called `name`.
    pub fn output_shape_of(&self, name: &str) -> Result<(usize, usize, usize)> {
        let index = self.layer_index(name)?;
        Ok(self.layers[index].output_shape())
    }

    /// Log one line per layer.
    pub fn log_summary(&self) {
        for (i, (layer, name)) in self.layers.iter().zip(&self.names).enumerate() {
            let (c, h, w) = layer.output_shape();
            log::info!(
                "{:>3} {:<16} {:<18} out {}x{}x{} params {}",
                i,
                layer.kind(),
                name.as_deref().unwrap_or("-"),
                c,
                h,
                w,
                layer.parameter_count()
            );
        }
        log::info!("total parameters: {}", self.parameter_count());
    }

    fn check_input(&self, input: &[f32], batch_size: usize) -> Result<()> {
        let expected = batch_size * self.input_size();
        if input.len() != expected {
            return Err(VisionError::shape("model input", expected, input.len()));
        }
        Ok(())
    }

    /// Run the first `end` layers on one batch, keeping every activation.
    /// `activations[0]` is the input and `activations[i + 1]` the output of layer `i`.
    fn forward_prefix(&self, end: usize, input: &[f32], batch_size: usize) -> Vec<Vec<f32>> {
        let mut activations = Vec::with_capacity(end + 1);
        activations.push(input.to_vec());
        for layer in &self.layers[..end] {
            let mut output = vec![0.0f32; batch_size * layer.output_size()];
            if let Some(last) = activations.last() {
                layer.forward(last, &mut output, batch_size);
            }
            activations.push(output);
        }
        activations
    }

    /// All activations for one batch (input first).
    pub fn forward_all(&self, input: &[f32], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        self.check_input(input, batch_size)?;
        Ok(self.forward_prefix(self.layers.len(), input, batch_size))
    }

    /// Activations of the first `end` layers only.
    pub fn forward_to(&self, end: usize, input: &[f32], batch_size: usize) -> Result<Vec<Vec<f32>>> {
        self.check_input(input, batch_size)?;
        Ok(self.forward_prefix(end.min(self.layers.len()), input, batch_size))
    }

    /// Output of the first `end` layers, computed `batch_size` samples at a time.
    fn predict_until(&self, end: usize, input: &[f32], count: usize, batch_size: usize) -> Result<Vec<f32>> {
        self.check_input(input, count)?;
        let in_size = self.input_size();
        let out_size = if end == 0 {
            in_size
        } else {
            self.layers[end - 1].output_size()
        };
        let batch_size = batch_size.max(1);
        let mut result = Vec::with_capacity(count * out_size);

        for start in (0..count).step_by(batch_size) {
            let n = batch_size.min(count - start);
            let chunk = &input[start * in_size..(start + n) * in_size];
            let mut activations = self.forward_prefix(end, chunk, n);
            if let Some(output) = activations.pop() {
                result.extend_from_slice(&output);
            }
        }
        Ok(result)
    }

    /// Final output for `count` samples.
    pub fn predict(&self, input: &[f32], count: usize, batch_size: usize) -> Result<Vec<f32>> {
        self.predict_until(self.layers.len(), input, count, batch_size)
    }

    /// Output of the layer called `name` for `count` samples.
    pub fn predict_at(&self, name: &str, input: &[f32], count: usize, batch_size: usize) -> Result<Vec<f32>> {
        let index = self.layer_index(name)?;
        self.predict_until(index + 1, input, count, batch_size)
    }

    /// Backpropagate `grad_output` (gradient of the loss w.r.t. the model
    /// output) through every layer. Returns the gradient w.r.t. the input.
    pub fn backward(&self, activations: &[Vec<f32>], grad_output: &[f32], batch_size: usize) -> Vec<f32> {
        match self.layers.len() {
            0 => grad_output.to_vec(),
            n => self.backward_from_taps(activations, &[(n - 1, grad_output.to_vec())], batch_size),
        }
    }

    /// Backpropagate gradients injected at several layer outputs.
    ///
    /// Each tap `(i, g)` adds `g` to the gradient of the output of layer `i`.
    /// Layers above the deepest tap are skipped.
    pub fn backward_from_taps(
        &self,
        activations: &[Vec<f32>],
        taps: &[(usize, Vec<f32>)],
        batch_size: usize,
    ) -> Vec<f32> {
        let Some(deepest) = taps.iter().map(|(i, _)| *i).max() else {
            return vec![0.0; activations.first().map_or(0, |a| a.len())];
        };

        let mut grad = vec![0.0f32; activations[deepest + 1].len()];
        for i in (0..=deepest).rev() {
            for (_, tap) in taps.iter().filter(|(t, _)| *t == i) {
                for (g, t) in grad.iter_mut().zip(tap) {
                    *g += t;
                }
            }
            let mut grad_input = vec![0.0f32; activations[i].len()];
            self.layers[i].backward(&activations[i], &grad, &mut grad_input, batch_size);
            grad = grad_input;
        }
        grad
    }

    /// Number of optimizer instances [`Sequential::apply_gradients`] expects.
    pub fn optimizer_slots(&self) -> usize {
        self.layers.iter().map(|l| l.parameters().len()).sum()
    }

    /// Apply accumulated gradients; `optimizers` holds one instance per
    /// parameter tensor, in layer order.
    pub fn apply_gradients(&mut self, optimizers: &mut [Box<dyn Optimizer>]) {
        let mut offset = 0;
        for layer in &mut self.layers {
            let n = layer.parameters().len();
            if n > 0 {
                layer.update_with_optimizers(&mut optimizers[offset..offset + n]);
            }
            offset += n;
        }
    }

    pub fn clear_gradients(&self) {
        for layer in &self.layers {
            layer.clear_gradients();
        }
    }

    pub fn set_training(&mut self, training: bool) {
        for layer in &mut self.layers {
            layer.set_training(training);
        }
    }

    /// Write all parameter tensors.
    pub fn save_weights<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let file = File::create(path).map_err(|e| VisionError::file(path, e))?;
        let mut writer = BufWriter::new(file);

        writer.write_all(WEIGHTS_MAGIC)?;
        writer.write_all(&(self.layers.len() as u32).to_le_bytes())?;
        for layer in &self.layers {
            let tensors = layer.parameters();
            writer.write_all(&(tensors.len() as u32).to_le_bytes())?;
            for tensor in tensors {
                writer.write_all(&(tensor.len() as u64).to_le_bytes())?;
                for value in tensor {
                    writer.write_all(&value.to_le_bytes())?;
                }
            }
        }
        writer.flush()?;
        Ok(())
    }

    /// Replace all parameter tensors from a weight file written by
    /// [`Sequential::save_weights`] for the same architecture.
    pub fn load_weights<P: AsRef<Path>>(&mut self, path: P) -> Result<()> {
        let path = path.as_ref();
        let data = fs::read(path).map_err(|e| VisionError::file(path, e))?;
        let mut offset = 0usize;

        if data.get(..4) != Some(&WEIGHTS_MAGIC[..]) {
            return Err(VisionError::WeightMismatch(format!(
                "{} is not a weight file",
                path.display()
            )));
        }
        offset += 4;

        let layer_count = read_le_u32(&data, &mut offset)? as usize;
        if layer_count != self.layers.len() {
            return Err(VisionError::WeightMismatch(format!(
                "file has {} layers, model has {}",
                layer_count,
                self.layers.len()
            )));
        }

        for (i, layer) in self.layers.iter_mut().enumerate() {
            let tensor_count = read_le_u32(&data, &mut offset)? as usize;
            let mut tensors = Vec::with_capacity(tensor_count);
            for _ in 0..tensor_count {
                let len = read_le_u64(&data, &mut offset)? as usize;
                tensors.push(read_le_f32s(&data, &mut offset, len)?);
            }
            layer.load_parameters(&tensors).map_err(|e| match e {
                VisionError::WeightMismatch(msg) => {
                    VisionError::WeightMismatch(format!("layer {}: {}", i, msg))
                }
                other => other,
            })?;
        }

        if offset != data.len() {
            return Err(VisionError::WeightMismatch(format!(
                "{} trailing bytes",
                data.len() - offset
            )));
        }
        Ok(())
    }
}

fn take<'a>(data: &'a [u8], offset: &mut usize, len: usize) -> Result<&'a [u8]> {
    let end = offset
        .checked_add(len)
        .filter(|&end| end <= data.len())
        .ok_or_else(|| VisionError::WeightMismatch("weight file is truncated".to_string()))?;
    let bytes = &data[*offset..end];
    *offset = end;
    Ok(bytes)
}

fn read_le_u32(data: &[u8], offset: &mut usize) -> Result<u32> {
    let bytes = take(data, offset, 4)?;
    Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
}

fn read_le_u64(data: &[u8], offset: &mut usize) -> Result<u64> {
    let bytes = take(data, offset, 8)?;
    let mut buf = [0u8; 8];
    buf.copy_from_slice(bytes);
    Ok(u64::from_le_bytes(buf))
}

fn read_le_f32s(data: &[u8], offset: &mut usize, count: usize) -> Result<Vec<f32>> {
    let byte_len = count
        .checked_mul(4)
        .ok_or_else(|| VisionError::WeightMismatch("tensor length overflow".to_string()))?;
    let bytes = take(data, offset, byte_len)?;
    Ok(bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect())
}

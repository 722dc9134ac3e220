use std::path::Path;
use std::sync::{Arc, Mutex};
use tch::{CModule, Device, Kind, Tensor};

use crate::inference::preprocess::{INPUT_CHANNELS, INPUT_SIDE};

#[derive(Debug, thiserror::Error)]
pub enum StartupError {
    #[error("failed to load model artifact: {0}")]
    ModelLoad(tch::TchError),
    #[error("model emits {actual} classes but {expected} labels are configured")]
    ClassCountMismatch { expected: usize, actual: usize },
}

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model forward pass failed: {0}")]
    Model(#[from] tch::TchError),
}

/// Owns the process-wide TorchScript module. Loaded once at startup, shared
/// by handle clone with every request handler, never reassigned.
#[derive(Clone)]
pub struct ModelHost {
    module: Arc<Mutex<CModule>>,
    device: Device,
}

impl ModelHost {
    pub fn load(model_path: &Path) -> Result<Self, StartupError> {
        let device = Device::cuda_if_available();
        let module =
            CModule::load_on_device(model_path, device).map_err(StartupError::ModelLoad)?;
        Ok(Self {
            module: Arc::new(Mutex::new(module)),
            device,
        })
    }

    /// Single forward pass producing one probability per class. The lock
    /// serializes concurrent calls; libtorch modules are not guaranteed safe
    /// for concurrent forwarding.
    pub fn infer(&self, input: &Tensor) -> Result<Vec<f32>, InferenceError> {
        let input = input.to_device(self.device);
        let output = self.module.lock().unwrap().forward_ts(&[input])?;
        let probs = output.softmax(-1, Kind::Float).view([-1]);
        let len = probs.size()[0] as usize;
        let mut scores = vec![0.0f32; len];
        probs.copy_data(&mut scores, len);
        Ok(scores)
    }

    /// Dry-run forward at startup so a class-count mismatch fails the
    /// process instead of indexing out of range on the first request.
    pub fn validate_class_count(&self, expected: usize) -> Result<(), StartupError> {
        let zeros = Tensor::zeros(
            [1, INPUT_SIDE, INPUT_SIDE, INPUT_CHANNELS],
            (Kind::Float, self.device),
        );
        let probe = self
            .infer(&zeros)
            .map_err(|InferenceError::Model(e)| StartupError::ModelLoad(e))?;
        if probe.len() != expected {
            return Err(StartupError::ClassCountMismatch {
                expected,
                actual: probe.len(),
            });
        }
        Ok(())
    }
}

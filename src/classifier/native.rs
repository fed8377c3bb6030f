use std::panic::{self, AssertUnwindSafe};
use std::path::Path;
use std::sync::{Mutex, PoisonError};

use burn::{
    backend::{ndarray::NdArrayDevice, NdArray},
    module::Module,
    record::{FullPrecisionSettings, NamedMpkBytesRecorder, Recorder},
    tensor::backend::Backend,
};
use ndarray::Array4;

use super::{check_input_shape, Classifier};
use crate::error::ClassifierError;
use crate::network::{images_to_tensor, Cifar10Cnn, ModelConfig};

/// CPU backend used for serving and batch prediction.
pub type InferenceBackend = NdArray;

type Recording = NamedMpkBytesRecorder<FullPrecisionSettings>;

/// The trainer's network, restored from its full-precision MessagePack record.
pub struct BurnClassifier {
    model: Mutex<Cifar10Cnn<InferenceBackend>>,
    device: NdArrayDevice,
}

impl BurnClassifier {
    pub fn load(path: &Path) -> Result<Self, ClassifierError> {
        let bytes = std::fs::read(path)
            .map_err(|e| ClassifierError::ModelLoad(format!("{}: {e}", path.display())))?;
        let device = NdArrayDevice::default();

        let record = Recording::default()
            .load(bytes, &device)
            .map_err(|e| ClassifierError::ModelLoad(format!("{e:?}")))?;

        // Mismatched parameter shapes panic inside burn rather than erroring.
        let model = panic::catch_unwind(AssertUnwindSafe(|| {
            ModelConfig::new()
                .init::<InferenceBackend>(&device)
                .load_record(record)
        }))
        .map_err(|_| {
            ClassifierError::ModelLoad("record does not fit the network layout".to_string())
        })?;

        Ok(Self::from_model(model, device))
    }

    pub fn from_model(model: Cifar10Cnn<InferenceBackend>, device: NdArrayDevice) -> Self {
        Self {
            model: Mutex::new(model),
            device,
        }
    }
}

impl Classifier for BurnClassifier {
    fn probabilities(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError> {
        check_input_shape(input)?;
        let pixels: Vec<f32> = input.iter().copied().collect();

        let model = self.model.lock().unwrap_or_else(PoisonError::into_inner);
        let output = panic::catch_unwind(AssertUnwindSafe(|| {
            let images = images_to_tensor::<InferenceBackend>(&pixels, 1, &self.device);
            model.infer(images).into_data()
        }))
        .map_err(|_| ClassifierError::Inference("forward pass panicked".to_string()))?;

        output
            .to_vec::<f32>()
            .map_err(|e| ClassifierError::Inference(format!("{e:?}")))
    }
}

/// Writes `model` as a full-precision MessagePack record at exactly `path`.
pub fn save_artifact<B: Backend>(model: Cifar10Cnn<B>, path: &Path) -> std::io::Result<()> {
    let bytes = Recording::default()
        .record(model.into_record(), ())
        .map_err(|e| std::io::Error::other(format!("{e:?}")))?;

    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, bytes)
}

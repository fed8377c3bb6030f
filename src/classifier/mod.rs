//! Loaded models behind one inference interface.
//!
//! Two artifact formats are understood: the burn record the trainer writes
//! (`.mpk`, or any other extension) and ONNX graphs (`.onnx`) run through tract.

mod native;
mod onnx;

use std::path::Path;
use std::sync::Arc;

use ndarray::Array4;
use tracing::{debug, info};

use crate::error::ClassifierError;
use crate::labels::{INPUT_SHAPE, NUM_CLASSES};
use crate::ranking::Prediction;

pub use native::{save_artifact, BurnClassifier, InferenceBackend};
pub use onnx::OnnxClassifier;

pub trait Classifier: Send + Sync {
    /// Class probabilities for a `(1, 32, 32, 3)` input, aligned with the label set.
    fn probabilities(&self, input: &Array4<f32>) -> Result<Vec<f32>, ClassifierError>;

    fn predict(&self, input: &Array4<f32>) -> Result<Prediction, ClassifierError> {
        let probabilities = self.probabilities(input)?;
        Prediction::from_probabilities(&probabilities)
    }
}

/// Loads the artifact at `path`, picking the runtime from its extension.
///
/// The loaded model is run once on a blank image; an artifact that does not yield
/// ten finite probabilities is rejected as a load error.
pub fn load_classifier(path: &Path) -> Result<Arc<dyn Classifier>, ClassifierError> {
    if !path.is_file() {
        return Err(ClassifierError::ModelNotFound(path.to_path_buf()));
    }

    let classifier: Arc<dyn Classifier> = match path.extension().and_then(|ext| ext.to_str()) {
        Some(ext) if ext.eq_ignore_ascii_case("onnx") => Arc::new(OnnxClassifier::load(path)?),
        _ => Arc::new(BurnClassifier::load(path)?),
    };

    probe(classifier.as_ref())?;
    info!(path = %path.display(), "model loaded");

    Ok(classifier)
}

fn probe(classifier: &dyn Classifier) -> Result<(), ClassifierError> {
    let probabilities = classifier
        .probabilities(&Array4::zeros(INPUT_SHAPE))
        .map_err(|e| {
            ClassifierError::ModelLoad(format!(
                "artifact does not match the expected architecture: {e}"
            ))
        })?;

    if probabilities.len() != NUM_CLASSES || !probabilities.iter().all(|p| p.is_finite()) {
        return Err(ClassifierError::ModelLoad(format!(
            "artifact does not match the expected architecture: expected {NUM_CLASSES} probabilities, got {}",
            probabilities.len()
        )));
    }

    debug!(?probabilities, "probe output");
    Ok(())
}

fn check_input_shape(input: &Array4<f32>) -> Result<(), ClassifierError> {
    if input.shape() != &INPUT_SHAPE[..] {
        return Err(ClassifierError::ShapeMismatch {
            expected: INPUT_SHAPE.to_vec(),
            actual: input.shape().to_vec(),
        });
    }
    Ok(())
}

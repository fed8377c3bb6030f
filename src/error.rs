use std::path::PathBuf;

use thiserror::Error;

/// Failures of the load / preprocess / infer path shared by every predictor.
#[derive(Debug, Error)]
pub enum ClassifierError {
    #[error("Model file not found at '{}'", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Error loading model: {0}")]
    ModelLoad(String),

    #[error("Error preprocessing image: {0}")]
    Decode(#[from] image::ImageError),

    #[error("Error reading image: {0}")]
    Io(#[from] std::io::Error),

    #[error("Unexpected tensor shape: expected {expected:?}, got {actual:?}")]
    ShapeMismatch {
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    #[error("Inference failed: {0}")]
    Inference(String),
}

impl ClassifierError {
    /// Whether the failure was caused by the caller's input rather than the model.
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::Decode(_) | Self::Io(_))
    }
}

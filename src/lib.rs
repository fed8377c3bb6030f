//! CIFAR-10 image classifier: training, batch prediction and an HTTP endpoint
//! sharing one preprocessing and ranking path.

pub mod classifier;
pub mod config;
pub mod error;
pub mod handlers;
pub mod labels;
pub mod model_slot;
pub mod models;
pub mod network;
pub mod preprocess;
pub mod ranking;
pub mod training;

pub use classifier::{load_classifier, Classifier};
pub use error::ClassifierError;
pub use model_slot::{LoadOutcome, ModelSlot};
pub use ranking::{ClassConfidence, Prediction};

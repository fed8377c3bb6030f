use serde::Serialize;

use crate::ranking::{ClassConfidence, Prediction};

#[derive(Debug, Serialize)]
pub struct PredictionResponse {
    pub success: bool,
    pub prediction: &'static str,
    pub confidence: f64,
    pub all_predictions: Vec<ClassConfidence>,
}

impl PredictionResponse {
    pub fn new(prediction: &Prediction, top_k: usize) -> Self {
        Self {
            success: true,
            prediction: prediction.label,
            confidence: prediction.confidence,
            all_predictions: prediction.top(top_k).to_vec(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub success: bool,
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            success: false,
            error: error.into(),
        }
    }
}

#[derive(Debug, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Error,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub model_status: String,
}

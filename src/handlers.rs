use std::path::PathBuf;

use actix_multipart::Multipart;
use actix_web::{http::header::ContentType, http::StatusCode, web, HttpResponse, ResponseError};
use futures_util::StreamExt;
use thiserror::Error;
use tracing::{error, info, warn};

use crate::config::{allowed_file, TOP_K};
use crate::error::ClassifierError;
use crate::model_slot::ModelSlot;
use crate::models::{ErrorResponse, HealthResponse, HealthStatus, PredictionResponse};
use crate::preprocess;
use crate::ranking::Prediction;

const INDEX_HTML: &str = include_str!("../static/index.html");

/// Shared by every worker through `web::Data`.
pub struct AppState {
    pub model: ModelSlot,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(model_path: impl Into<PathBuf>, max_upload_bytes: usize) -> Self {
        Self {
            model: ModelSlot::new(model_path),
            max_upload_bytes,
        }
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("No image file provided")]
    MissingImage,

    #[error("No file selected")]
    EmptyFilename,

    #[error("Invalid file type. Please upload PNG, JPG, JPEG, GIF, BMP, or WEBP files.")]
    InvalidFileType,

    #[error("File size must be less than {} MB", .limit / (1024 * 1024))]
    PayloadTooLarge { limit: usize },

    #[error("Malformed upload: {0}")]
    Multipart(String),

    #[error(transparent)]
    Classifier(#[from] ClassifierError),

    #[error("Prediction worker stopped unexpectedly")]
    Blocking,
}

impl ResponseError for ApiError {
    fn status_code(&self) -> StatusCode {
        match self {
            ApiError::MissingImage
            | ApiError::EmptyFilename
            | ApiError::InvalidFileType
            | ApiError::Multipart(_) => StatusCode::BAD_REQUEST,
            ApiError::PayloadTooLarge { .. } => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::Classifier(e) if e.is_client_error() => StatusCode::BAD_REQUEST,
            ApiError::Classifier(_) | ApiError::Blocking => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();
        if status.is_server_error() {
            error!(error = %self, "prediction failed");
        } else {
            warn!(error = %self, "rejected upload");
        }

        HttpResponse::build(status).json(ErrorResponse::new(self.to_string()))
    }
}

struct Upload {
    filename: String,
    bytes: Vec<u8>,
}

/// Collects the first `image` file part, draining any others. A part without a
/// `filename` parameter is a plain form value, not a file. The byte budget covers
/// every field of the body.
async fn read_image_field(payload: &mut Multipart, limit: usize) -> Result<Upload, ApiError> {
    let mut upload = None;
    let mut received = 0usize;

    while let Some(item) = payload.next().await {
        let mut field = item.map_err(|e| ApiError::Multipart(e.to_string()))?;

        let disposition = field.content_disposition();
        let filename = match disposition.get_filename() {
            Some(name) if upload.is_none() && disposition.get_name() == Some("image") => {
                Some(name.to_string())
            }
            _ => None,
        };

        let mut bytes = Vec::new();
        while let Some(chunk) = field.next().await {
            let data = chunk.map_err(|e| ApiError::Multipart(e.to_string()))?;
            received += data.len();
            if received > limit {
                return Err(ApiError::PayloadTooLarge { limit });
            }
            if filename.is_some() {
                bytes.extend_from_slice(&data);
            }
        }

        if let Some(filename) = filename {
            upload = Some(Upload { filename, bytes });
        }
    }

    upload.ok_or(ApiError::MissingImage)
}

pub async fn index() -> HttpResponse {
    HttpResponse::Ok()
        .content_type(ContentType::html())
        .body(INDEX_HTML)
}

pub async fn predict(
    state: web::Data<AppState>,
    mut payload: Multipart,
) -> Result<HttpResponse, ApiError> {
    let upload = read_image_field(&mut payload, state.max_upload_bytes).await?;

    if upload.filename.is_empty() {
        return Err(ApiError::EmptyFilename);
    }
    if !allowed_file(&upload.filename) {
        return Err(ApiError::InvalidFileType);
    }

    let filename = upload.filename;
    let bytes = upload.bytes;
    let prediction = web::block(move || -> Result<Prediction, ClassifierError> {
        let input = preprocess::from_bytes(&bytes)?;
        let (model, _) = state.model.ensure_loaded()?;
        model.predict(&input)
    })
    .await
    .map_err(|_| ApiError::Blocking)??;

    info!(
        file = %filename,
        prediction = prediction.label,
        confidence = prediction.confidence,
        "classified upload"
    );

    Ok(HttpResponse::Ok().json(PredictionResponse::new(&prediction, TOP_K)))
}

pub async fn health(state: web::Data<AppState>) -> Result<HttpResponse, ApiError> {
    let outcome = web::block(move || state.model.ensure_loaded().map(|(_, outcome)| outcome))
        .await
        .map_err(|_| ApiError::Blocking)?;

    let body = match outcome {
        Ok(outcome) => HealthResponse {
            status: HealthStatus::Healthy,
            model_status: outcome.message().to_string(),
        },
        Err(e) => HealthResponse {
            status: HealthStatus::Error,
            model_status: e.to_string(),
        },
    };

    Ok(HttpResponse::Ok().json(body))
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/").route(web::get().to(index)))
        .service(web::resource("/predict").route(web::post().to(predict)))
        .service(web::resource("/health").route(web::get().to(health)));
}

use crate::{
    annotate::encode_png_base64,
    backend::InferenceBackend,
    service::{DetectionResult, Detector},
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use schema::{DetectResponse, HealthResponse, ModelInfo};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub const SERVICE_NAME: &str = "AI Backend";
pub const IMAGE_FIELD: &str = "image";

pub struct AppState<B: InferenceBackend> {
    pub detector: Arc<Detector<B>>,
    pub temp_dir: PathBuf,
}

impl<B: InferenceBackend> Clone for AppState<B> {
    fn clone(&self) -> Self {
        Self {
            detector: Arc::clone(&self.detector),
            temp_dir: self.temp_dir.clone(),
        }
    }
}

impl<B: InferenceBackend> AppState<B> {
    pub fn new(detector: Arc<Detector<B>>, temp_dir: PathBuf) -> Self {
        Self { detector, temp_dir }
    }
}

pub fn router<B: InferenceBackend + 'static>(state: AppState<B>, max_upload_bytes: usize) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/detect", post(detect::<B>))
        .route("/model_info", get(model_info::<B>))
        .layer(DefaultBodyLimit::max(max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Failure classes of `/detect`; every variant renders the failure body shape.
#[derive(Debug)]
enum DetectError {
    BadRequest(String),
    Detection(String),
    Server(String),
}

impl IntoResponse for DetectError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            DetectError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            DetectError::Detection(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
            DetectError::Server(msg) => {
                tracing::error!(error = %msg, "Detection request failed");
                (StatusCode::INTERNAL_SERVER_ERROR, msg)
            }
        };
        (status, Json(DetectResponse::failure(message))).into_response()
    }
}

struct ImageUpload {
    filename: String,
    bytes: Vec<u8>,
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse::healthy(SERVICE_NAME))
}

async fn model_info<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
) -> Json<ModelInfo> {
    Json(state.detector.model_info())
}

async fn detect<B: InferenceBackend + 'static>(
    State(state): State<AppState<B>>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<DetectResponse>, DetectError> {
    let upload = read_image_field(multipart).await?;

    tracing::info!(
        filename = %upload.filename,
        bytes = upload.bytes.len(),
        "Received image for detection"
    );

    let detector = Arc::clone(&state.detector);
    let temp_dir = state.temp_dir.clone();

    let response = tokio::task::spawn_blocking(move || {
        detect_upload(&detector, &temp_dir, &upload)
    })
    .await
    .map_err(|e| DetectError::Server(format!("Server error: {}", e)))?
    .map_err(|e| DetectError::Server(format!("Server error: {}", e)))?;

    if !response.success {
        let message = response
            .error
            .unwrap_or_else(|| "Unknown error".to_string());
        return Err(DetectError::Detection(message));
    }

    Ok(Json(response))
}

/// Stages the upload in a temp file (removed on drop) and runs the detector on it.
fn detect_upload<B: InferenceBackend>(
    detector: &Detector<B>,
    temp_dir: &Path,
    upload: &ImageUpload,
) -> anyhow::Result<DetectResponse> {
    let suffix = Path::new(&upload.filename)
        .extension()
        .map(|ext| format!(".{}", ext.to_string_lossy()))
        .unwrap_or_default();

    let mut temp = tempfile::Builder::new()
        .prefix("temp_")
        .suffix(&suffix)
        .tempfile_in(temp_dir)?;
    temp.write_all(&upload.bytes)?;
    temp.flush()?;

    let result = detector.detect_path(temp.path());
    to_response(result)
}

fn to_response(result: DetectionResult) -> anyhow::Result<DetectResponse> {
    let total_detections = result.total_detections();
    let annotated_image_base64 = result
        .annotated_image
        .as_ref()
        .map(encode_png_base64)
        .transpose()?;

    Ok(DetectResponse {
        success: result.success,
        detections: result.detections,
        total_detections,
        annotated_image_base64,
        error: result.error,
    })
}

async fn read_image_field(
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<ImageUpload, DetectError> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Request is not a multipart upload");
        DetectError::BadRequest("No image file provided".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| DetectError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(DetectError::BadRequest(
                "No image file selected".to_string(),
            ));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| DetectError::BadRequest(e.to_string()))?;

        return Ok(ImageUpload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(DetectError::BadRequest(
        "No image file provided".to_string(),
    ))
}

use crate::{
    client::IMAGE_FIELD,
    error::{GatewayError, GatewayResult},
    service::Upload,
    state::AppState,
};
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path, State, multipart::MultipartRejection},
    http::header,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use schema::{HealthResponse, ResultListing, UploadResponse};
use tower_http::{cors::CorsLayer, services::ServeDir, trace::TraceLayer};

pub const SERVICE_NAME: &str = "UI Backend";

pub fn router(state: AppState) -> Router {
    let static_files = ServeDir::new(&state.static_dir);

    Router::new()
        .route("/health", get(health))
        .route("/upload", post(upload))
        .route("/download/*filename", get(download))
        .route("/results", get(list_results))
        .route("/model_info", get(model_info))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(state.max_upload_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let ai_backend_healthy = state.service.ai_backend_healthy().await;
    Json(HealthResponse {
        ai_backend_healthy: Some(ai_backend_healthy),
        ..HealthResponse::healthy(SERVICE_NAME)
    })
}

async fn upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> GatewayResult<Json<UploadResponse>> {
    let upload = read_image_field(multipart).await?;
    let summary = state.service.process_upload(upload).await?;
    Ok(Json(summary))
}

async fn download(State(state): State<AppState>, Path(filename): Path<String>) -> GatewayResult<Response> {
    let file = state.service.download(&filename).await?;
    let content_type = mime_guess::from_path(&file.filename).first_or_octet_stream();
    let disposition = format!("attachment; filename=\"{}\"", file.filename);

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        file.bytes,
    )
        .into_response())
}

async fn list_results(State(state): State<AppState>) -> GatewayResult<Json<ResultListing>> {
    let files = state.service.list_results().await?;
    Ok(Json(ResultListing { files }))
}

async fn model_info(State(state): State<AppState>) -> GatewayResult<Json<serde_json::Value>> {
    Ok(Json(state.service.model_info().await?))
}

async fn read_image_field(multipart: Result<Multipart, MultipartRejection>) -> GatewayResult<Upload> {
    let mut multipart = multipart.map_err(|e| {
        tracing::debug!(error = %e, "Request is not a multipart upload");
        GatewayError::BadRequest("No image file provided".to_string())
    })?;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| GatewayError::BadRequest(e.to_string()))?
    {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        if filename.is_empty() {
            return Err(GatewayError::BadRequest("No image file selected".to_string()));
        }

        let bytes = field
            .bytes()
            .await
            .map_err(|e| GatewayError::BadRequest(e.to_string()))?;

        return Ok(Upload {
            filename,
            bytes: bytes.to_vec(),
        });
    }

    Err(GatewayError::BadRequest("No image file provided".to_string()))
}

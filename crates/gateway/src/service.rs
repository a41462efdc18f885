use crate::{
    client::DetectorClient,
    error::{GatewayError, GatewayResult},
    storage::{ResultStore, StoredFile},
};
use schema::{ResultFile, ResultRecord, UploadResponse};

pub const ALLOWED_EXTENSIONS: [&str; 10] = [
    "bmp", "dng", "jpeg", "jpg", "mpo", "png", "tif", "tiff", "webp", "pfm",
];

const TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Case-insensitive check of the extension after the last dot.
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| {
            ALLOWED_EXTENSIONS
                .iter()
                .any(|allowed| allowed.eq_ignore_ascii_case(ext))
        })
        .unwrap_or(false)
}

pub struct Upload {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// Relays uploads to the detection service and persists what comes back.
pub struct UploadService {
    client: DetectorClient,
    store: ResultStore,
}

impl UploadService {
    pub fn new(client: DetectorClient, store: ResultStore) -> Self {
        Self { client, store }
    }

    pub async fn ai_backend_healthy(&self) -> bool {
        self.client.is_healthy().await
    }

    pub async fn model_info(&self) -> GatewayResult<serde_json::Value> {
        self.client.model_info().await.map_err(|e| {
            tracing::warn!(error = %e, "Could not fetch model info");
            GatewayError::Processing(format!("Could not fetch model info: {}", e))
        })
    }

    pub async fn download(&self, filename: &str) -> GatewayResult<StoredFile> {
        self.store.open_result(filename).await
    }

    pub async fn list_results(&self) -> GatewayResult<Vec<ResultFile>> {
        self.store.list().await
    }

    /// Validate, probe, save the original, relay, then persist the results.
    #[tracing::instrument(skip(self, upload), fields(filename = %upload.filename, bytes = upload.bytes.len()))]
    pub async fn process_upload(&self, upload: Upload) -> GatewayResult<UploadResponse> {
        let filename = sanitize_filename::sanitize(&upload.filename);
        if filename.is_empty() {
            return Err(GatewayError::BadRequest("No image file selected".to_string()));
        }
        if !allowed_file(&filename) {
            return Err(GatewayError::BadRequest(format!(
                "Invalid file type. Allowed: {}",
                ALLOWED_EXTENSIONS.join(", ")
            )));
        }

        if !self.client.is_healthy().await {
            tracing::warn!(url = %self.client.base_url(), "Detection service is not available");
            return Err(GatewayError::Unavailable);
        }

        let timestamp = chrono::Local::now().format(TIMESTAMP_FORMAT).to_string();
        let original_filename = self
            .store
            .save_upload(&timestamp, &filename, &upload.bytes)
            .await
            .map_err(|e| GatewayError::Processing(format!("Processing error: {}", e)))?;

        let response = self.client.detect(&filename, upload.bytes).await?;

        let record = ResultRecord {
            timestamp: timestamp.clone(),
            original_filename,
            success: response.success,
            total_detections: response.detections.len(),
            detections: response.detections,
        };
        let json_file = self.store.save_record(&record).await?;

        let annotated_image_file = match response.annotated_image_base64.as_deref() {
            Some(encoded) if !encoded.is_empty() => {
                Some(self.store.save_annotated(&timestamp, encoded).await?)
            }
            _ => None,
        };

        tracing::info!(
            total_detections = record.total_detections,
            json_file = %json_file,
            "Upload processed"
        );

        Ok(UploadResponse {
            success: true,
            message: "Image processed successfully".to_string(),
            total_detections: record.total_detections,
            detections: record.detections,
            json_file,
            annotated_image_file,
        })
    }
}

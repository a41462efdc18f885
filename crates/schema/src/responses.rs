use crate::Detection;
use serde::{Deserialize, Serialize};

/// Body of `POST /detect` on the detection service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectResponse {
    pub success: bool,
    #[serde(default)]
    pub detections: Vec<Detection>,
    #[serde(default)]
    pub total_detections: usize,
    #[serde(default)]
    pub annotated_image_base64: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl DetectResponse {
    pub fn failure(error: impl Into<String>) -> Self {
        Self {
            success: false,
            detections: Vec::new(),
            total_detections: 0,
            annotated_image_base64: None,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_backend_healthy: Option<bool>,
}

impl HealthResponse {
    pub fn healthy(service: &str) -> Self {
        Self {
            status: "healthy".to_string(),
            service: service.to_string(),
            ai_backend_healthy: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelInfo {
    pub model_name: String,
    pub classes: Vec<String>,
    pub total_classes: usize,
}

/// Body of a successful `POST /upload` on the gateway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResponse {
    pub success: bool,
    pub message: String,
    pub total_detections: usize,
    pub detections: Vec<Detection>,
    pub json_file: String,
    pub annotated_image_file: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultFile {
    pub filename: String,
    pub size: u64,
    /// Seconds since the Unix epoch.
    pub modified: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultListing {
    pub files: Vec<ResultFile>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_response_shape() {
        let json = serde_json::to_value(DetectResponse::failure("decode failed")).unwrap();
        assert_eq!(json["success"], false);
        assert_eq!(json["error"], "decode failed");
        assert_eq!(json["total_detections"], 0);
        assert!(json["detections"].as_array().unwrap().is_empty());
        assert!(json["annotated_image_base64"].is_null());
    }

    #[test]
    fn test_success_response_omits_error() {
        let response = DetectResponse {
            success: true,
            detections: Vec::new(),
            total_detections: 0,
            annotated_image_base64: Some("aGk=".to_string()),
            error: None,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert!(json.get("error").is_none());
    }

    #[test]
    fn test_minimal_failure_body_deserializes() {
        let parsed: DetectResponse =
            serde_json::from_str(r#"{"success": false, "error": "No image file provided"}"#)
                .unwrap();
        assert!(!parsed.success);
        assert_eq!(parsed.total_detections, 0);
        assert_eq!(parsed.error.as_deref(), Some("No image file provided"));
    }

    #[test]
    fn test_detection_service_health_omits_backend_flag() {
        let json = serde_json::to_value(HealthResponse::healthy("AI Backend")).unwrap();
        assert_eq!(json["status"], "healthy");
        assert!(json.get("ai_backend_healthy").is_none());
    }
}

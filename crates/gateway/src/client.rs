//! HTTP client for the detection service.

use crate::config::Timeouts;
use reqwest::multipart::{Form, Part};
use schema::DetectResponse;

pub const IMAGE_FIELD: &str = "image";

/// Errors from calls to the detection service.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// The request never produced a usable reply (connect, timeout, body decode).
    #[error("{0}")]
    Request(#[from] reqwest::Error),

    /// The detection service answered with a non-2xx status, or with `success: false`.
    #[error("AI Backend error: {status}{}", detail(.message))]
    Api { status: u16, message: Option<String> },
}

fn detail(message: &Option<String>) -> String {
    match message {
        Some(message) if !message.is_empty() => format!(" ({})", message),
        _ => String::new(),
    }
}

pub struct DetectorClient {
    client: reqwest::Client,
    base_url: String,
    timeouts: Timeouts,
}

impl DetectorClient {
    pub fn new(base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self::with_client(reqwest::Client::new(), base_url, timeouts)
    }

    pub fn with_client(client: reqwest::Client, base_url: impl Into<String>, timeouts: Timeouts) -> Self {
        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeouts,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// `GET /health`; any failure, including a timeout, counts as unhealthy.
    pub async fn is_healthy(&self) -> bool {
        let result = self
            .client
            .get(format!("{}/health", self.base_url))
            .timeout(self.timeouts.health)
            .send()
            .await;

        match result {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::debug!(error = %e, url = %self.base_url, "Detection service health probe failed");
                false
            }
        }
    }

    /// Sends the image as multipart field `image` to `POST /detect`.
    pub async fn detect(&self, filename: &str, bytes: Vec<u8>) -> Result<DetectResponse, ClientError> {
        let mime = mime_guess::from_path(filename).first_or_octet_stream();
        let part = Part::bytes(bytes)
            .file_name(filename.to_string())
            .mime_str(mime.as_ref())?;
        let form = Form::new().part(IMAGE_FIELD, part);

        let response = self
            .client
            .post(format!("{}/detect", self.base_url))
            .multipart(form)
            .timeout(self.timeouts.detect)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<DetectResponse>(&body)
                .ok()
                .and_then(|failure| failure.error);
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let body: DetectResponse = response.json().await?;
        if !body.success {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: body.error,
            });
        }

        Ok(body)
    }

    /// `GET /model_info`, returned as the raw JSON body so it can be relayed unchanged.
    pub async fn model_info(&self) -> Result<serde_json::Value, ClientError> {
        let response = self
            .client
            .get(format!("{}/model_info", self.base_url))
            .timeout(self.timeouts.model_info)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Api {
                status: status.as_u16(),
                message: None,
            });
        }

        Ok(response.json().await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_message() {
        let err = ClientError::Api {
            status: 500,
            message: Some("Could not decode image".to_string()),
        };
        assert_eq!(err.to_string(), "AI Backend error: 500 (Could not decode image)");

        let err = ClientError::Api {
            status: 502,
            message: None,
        };
        assert_eq!(err.to_string(), "AI Backend error: 502");
    }

    #[test]
    fn test_base_url_trailing_slash_is_trimmed() {
        let client = DetectorClient::new("http://localhost:5001/", Timeouts::default());
        assert_eq!(client.base_url(), "http://localhost:5001");
    }

    #[tokio::test]
    async fn test_unreachable_backend_is_unhealthy() {
        let client = DetectorClient::new("http://127.0.0.1:1", Timeouts::default());
        assert!(!client.is_healthy().await);
    }
}

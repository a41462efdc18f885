use crate::client::ClientError;
use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use schema::ErrorResponse;

/// Failures of the relay's HTTP handlers.
///
/// Every variant renders `{success: false, error}`; the status reflects the
/// failure class.
#[derive(Debug, thiserror::Error)]
pub enum GatewayError {
    /// Missing or disallowed upload.
    #[error("{0}")]
    BadRequest(String),

    /// The detection service did not answer its health probe.
    #[error("AI Backend is not available")]
    Unavailable,

    #[error("File not found")]
    NotFound,

    /// The relay call failed or the detection service reported a failure.
    #[error("{0}")]
    Processing(String),

    /// Results could not be decoded or written.
    #[error("Save error: {0}")]
    Save(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type GatewayResult<T> = Result<T, GatewayError>;

impl From<ClientError> for GatewayError {
    fn from(err: ClientError) -> Self {
        match err {
            ClientError::Request(e) => GatewayError::Processing(format!("Processing error: {}", e)),
            api @ ClientError::Api { .. } => GatewayError::Processing(api.to_string()),
        }
    }
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
            GatewayError::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NotFound => StatusCode::NOT_FOUND,
            GatewayError::Processing(_) | GatewayError::Save(_) | GatewayError::Io(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(ErrorResponse::new(self.to_string()))).into_response()
    }
}

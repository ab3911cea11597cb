//! HTTP error response conversion.
//!
//! Handlers return `Result<impl IntoResponse, ApiError>`; archive errors
//! convert with `?` and render consistently (status, JSON body, logging).

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use vidvault_archive::ArchiveError;
use vidvault_storage::BlobError;

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    /// Machine-readable error code for programmatic handling.
    pub code: String,
    /// Whether the request can be retried as-is.
    pub recoverable: bool,
}

#[derive(Debug)]
pub enum ApiError {
    Archive(ArchiveError),
    InvalidRequest(String),
    PayloadTooLarge(String),
}

impl From<ArchiveError> for ApiError {
    fn from(err: ArchiveError) -> Self {
        ApiError::Archive(err)
    }
}

impl ApiError {
    fn status_code_and_meta(&self) -> (StatusCode, &'static str, bool) {
        match self {
            ApiError::InvalidRequest(_) => (StatusCode::BAD_REQUEST, "invalid_request", false),
            ApiError::PayloadTooLarge(_) => {
                (StatusCode::PAYLOAD_TOO_LARGE, "payload_too_large", false)
            }
            ApiError::Archive(err) => match err {
                ArchiveError::NotFound(_) => (StatusCode::NOT_FOUND, "not_found", false),
                ArchiveError::Plan(_) => (StatusCode::BAD_REQUEST, "invalid_request", false),
                ArchiveError::ContentUnavailable(_) => {
                    (StatusCode::SERVICE_UNAVAILABLE, "content_unavailable", true)
                }
                ArchiveError::Reconstruction { .. } => (
                    StatusCode::SERVICE_UNAVAILABLE,
                    "reconstruction_failed",
                    true,
                ),
                ArchiveError::UploadFailed { source, .. } if source.is_transient() => {
                    (StatusCode::BAD_GATEWAY, "storage_error", true)
                }
                ArchiveError::UploadFailed { .. } => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "storage_error", false)
                }
                ArchiveError::Storage(BlobError::NotFound(_)) => {
                    (StatusCode::NOT_FOUND, "not_found", false)
                }
                ArchiveError::Storage(e) if e.is_transient() => {
                    (StatusCode::BAD_GATEWAY, "storage_error", true)
                }
                _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", false),
            },
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Archive(err) => err.to_string(),
            ApiError::InvalidRequest(msg) | ApiError::PayloadTooLarge(msg) => msg.clone(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, recoverable) = self.status_code_and_meta();
        let message = self.message();

        if status.is_server_error() {
            tracing::error!(status = %status, code, error = %message, "Request failed");
        } else {
            tracing::warn!(status = %status, code, error = %message, "Request rejected");
        }

        let body = Json(ErrorResponse {
            error: message,
            code: code.to_string(),
            recoverable,
        });
        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn not_found_maps_to_404() {
        let err = ApiError::from(ArchiveError::NotFound(Uuid::new_v4()));
        let (status, code, recoverable) = err.status_code_and_meta();
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(code, "not_found");
        assert!(!recoverable);
    }

    #[test]
    fn unavailable_content_is_recoverable_503() {
        let err = ApiError::from(ArchiveError::ContentUnavailable("down".to_string()));
        let (status, _, recoverable) = err.status_code_and_meta();
        assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
        assert!(recoverable);
    }

    #[test]
    fn error_response_shape() {
        let response = ErrorResponse {
            error: "Video not found".to_string(),
            code: "not_found".to_string(),
            recoverable: false,
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["code"], "not_found");
        assert_eq!(json["recoverable"], false);
        assert!(json["error"].is_string());
    }
}

//! # Application Error
//!
//! Maps storage errors to structured HTTP responses. Every non-2xx body has
//! the same shape:
//!
//! ```json
//! {"error": "Not Found", "code": 404, "message": "Blob not found"}
//! ```

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use cas_core::protocol::ErrorBody;
use cas_core::CasError;
use thiserror::Error;

/// Message for malformed fingerprints.
pub const INVALID_HASH_MESSAGE: &str = "Invalid hash format: must be 64 hex characters";

/// Application-level error type that maps to HTTP responses.
#[derive(Error, Debug)]
pub enum AppError {
    /// Malformed request.
    #[error("{0}")]
    BadRequest(String),

    /// Blob or entry does not exist.
    #[error("{0}")]
    NotFound(String),

    /// Missing or wrong bearer token.
    #[error("{0}")]
    Unauthorized(String),

    /// The request was not received and answered within the read timeout.
    #[error("{0}")]
    Timeout(String),

    /// Internal server error. The detail is logged, never returned.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Timeout(_) => StatusCode::REQUEST_TIMEOUT,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<CasError> for AppError {
    fn from(err: CasError) -> Self {
        match err {
            CasError::InvalidHash(_) => Self::BadRequest(INVALID_HASH_MESSAGE.into()),
            CasError::BlobNotFound(_) => Self::NotFound("Blob not found".into()),
            CasError::EntryNotFound(_) => Self::NotFound("Entry not found".into()),
            other => Self::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        match self {
            Self::Internal(detail) => {
                tracing::error!(error = %detail, "request failed");
                error_response(status, "Internal server error")
            }
            Self::BadRequest(msg)
            | Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Timeout(msg) => error_response(status, &msg),
        }
    }
}

/// Build the standard JSON error response.
pub fn error_response(status: StatusCode, message: &str) -> Response {
    let body = ErrorBody {
        error: status.canonical_reason().unwrap_or("Error").to_string(),
        code: status.as_u16(),
        message: message.to_string(),
    };
    (status, Json(body)).into_response()
}

/// Failures that stop the server from starting or serving.
#[derive(Error, Debug)]
pub enum ServerError {
    /// The repository or its catalog could not be opened.
    #[error("failed to open repository: {0}")]
    Repository(#[from] CasError),

    /// The listen address could not be bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        /// Requested address.
        addr: String,
        /// Socket error.
        #[source]
        source: std::io::Error,
    },

    /// The accept loop failed.
    #[error("server error: {0}")]
    Serve(#[source] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn response_parts(err: AppError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = response.into_body().collect().await.unwrap().to_bytes();
        (status, serde_json::from_slice(&body).unwrap())
    }

    #[tokio::test]
    async fn not_found_body_shape() {
        let (status, body) = response_parts(AppError::NotFound("Blob not found".into())).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Not Found");
        assert_eq!(body["code"], 404);
        assert_eq!(body["message"], "Blob not found");
    }

    #[tokio::test]
    async fn internal_error_hides_detail() {
        let (status, body) =
            response_parts(AppError::Internal("disk on fire at /srv/cas".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert!(!body.to_string().contains("/srv/cas"));
    }

    #[tokio::test]
    async fn store_errors_map_to_statuses() {
        let (status, body) = response_parts(CasError::InvalidHash("x".into()).into()).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], INVALID_HASH_MESSAGE);

        let (status, _) = response_parts(CasError::EntryNotFound("p".into()).into()).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = response_parts(CasError::Cancelled.into()).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    }
}

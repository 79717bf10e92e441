//! # Read Timeout
//!
//! Innermost layer. Bounds how long a request may take to be received and
//! answered with response headers. Expiry drops the handler future, so an
//! upload in progress removes its temp file, and the client gets a JSON 408.

use std::time::Duration;

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::config::DEFAULT_TIMEOUT;
use crate::error::AppError;

/// Read timeout, injected into request extensions.
#[derive(Debug, Clone, Copy)]
pub struct ReadTimeout(pub Duration);

impl Default for ReadTimeout {
    fn default() -> Self {
        Self(DEFAULT_TIMEOUT)
    }
}

/// Answer `408` when the inner service does not respond within the limit.
pub async fn timeout_middleware(request: Request, next: Next) -> Response {
    let ReadTimeout(limit) = request
        .extensions()
        .get::<ReadTimeout>()
        .copied()
        .unwrap_or_default();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    match tokio::time::timeout(limit, next.run(request)).await {
        Ok(response) => response,
        Err(_) => {
            tracing::warn!(%method, %path, limit_ms = limit.as_millis() as u64, "request exceeded read timeout");
            AppError::Timeout("Request timed out".into()).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use http_body_util::BodyExt;
    use tower::ServiceExt;

    fn test_app(limit: Duration) -> Router {
        Router::new()
            .route("/fast", get(|| async { "done" }))
            .route(
                "/slow",
                get(|| async {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                    "late"
                }),
            )
            .layer(from_fn(timeout_middleware))
            .layer(axum::Extension(ReadTimeout(limit)))
    }

    fn get_request(uri: &str) -> axum::http::Request<Body> {
        axum::http::Request::builder().uri(uri).body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn slow_handler_gets_json_408() {
        let response = test_app(Duration::from_millis(50))
            .oneshot(get_request("/slow"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
        let body = response.into_body().collect().await.unwrap().to_bytes();
        let err: serde_json::Value = serde_json::from_slice(&body).unwrap();
        assert_eq!(err["error"], "Request Timeout");
        assert_eq!(err["code"], 408);
        assert_eq!(err["message"], "Request timed out");
    }

    #[tokio::test]
    async fn fast_handler_passes_through() {
        let response = test_app(Duration::from_secs(5))
            .oneshot(get_request("/fast"))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }
}

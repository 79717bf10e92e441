//! # Authentication Middleware
//!
//! Optional shared-secret bearer token. When a token is configured, every
//! request that can change the store (POST and anything else outside
//! GET/HEAD/OPTIONS) must carry `Authorization: Bearer <token>`. Reads and
//! CORS preflights are never challenged.

use axum::extract::Request;
use axum::http::{header, Method};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use crate::error::AppError;

/// Auth configuration injected into request extensions.
///
/// Custom `Debug` redacts the token value to prevent credential leakage in logs.
#[derive(Clone, Default)]
pub struct AuthConfig {
    token: Option<Zeroizing<String>>,
}

impl AuthConfig {
    /// `None` or an empty token disables authentication.
    pub fn new(token: Option<&str>) -> Self {
        Self {
            token: token
                .filter(|t| !t.is_empty())
                .map(|t| Zeroizing::new(t.to_string())),
        }
    }
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison so the mismatch takes
/// the same time as a same-length miss.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

fn is_read_only(method: &Method) -> bool {
    method == Method::GET || method == Method::HEAD || method == Method::OPTIONS
}

/// Reject write requests that lack the configured bearer token.
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    let Some(expected) = config.token.as_deref() else {
        return next.run(request).await;
    };
    if is_read_only(request.method()) {
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        None => {
            tracing::warn!(path = %request.uri().path(), "authentication failed: missing authorization header");
            AppError::Unauthorized("Missing Authorization header".into()).into_response()
        }
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) if constant_time_token_eq(provided, expected) => {
                next.run(request).await
            }
            _ => {
                tracing::warn!(path = %request.uri().path(), "authentication failed: invalid bearer token");
                AppError::Unauthorized("Invalid token".into()).into_response()
            }
        },
    }
}

//! # Request Validation
//!
//! Provides the [`Validate`] trait for request bodies and helpers that
//! decode and validate JSON in one step. Bodies are decoded from raw bytes
//! so a missing or odd `Content-Type` is not an error.

use axum::extract::rejection::QueryRejection;
use axum::extract::Query;
use cas_core::protocol::AddEntryRequest;
use cas_core::Fingerprint;
use serde::de::DeserializeOwned;

use crate::error::{AppError, INVALID_HASH_MESSAGE};

/// Request types with rules beyond what deserialization checks.
pub trait Validate {
    /// Returns the client-facing message on failure.
    fn validate(&self) -> Result<(), String>;
}

impl Validate for AddEntryRequest {
    fn validate(&self) -> Result<(), String> {
        if self.filepath.is_empty() || self.hash.is_empty() {
            return Err("filepath and hash are required".into());
        }
        if !Fingerprint::is_valid(&self.hash) {
            return Err(INVALID_HASH_MESSAGE.into());
        }
        if self.filepath.contains("..") {
            return Err("Path traversal not allowed".into());
        }
        Ok(())
    }
}

/// Decode a JSON body. Any decode failure is reported as `400 Invalid JSON`.
pub fn parse_json<T: DeserializeOwned>(body: &[u8]) -> Result<T, AppError> {
    serde_json::from_slice(body).map_err(|err| {
        tracing::debug!(reason = %err, "rejected request body");
        AppError::BadRequest("Invalid JSON".into())
    })
}

/// [`parse_json`] followed by [`Validate::validate`].
pub fn parse_validated_json<T: DeserializeOwned + Validate>(body: &[u8]) -> Result<T, AppError> {
    let value: T = parse_json(body)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

/// Map a query-string rejection to a JSON 400.
pub fn extract_query<T>(result: Result<Query<T>, QueryRejection>) -> Result<T, AppError> {
    result
        .map(|Query(v)| v)
        .map_err(|err| AppError::BadRequest(err.body_text()))
}

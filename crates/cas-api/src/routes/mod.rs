//! # API Route Modules
//!
//! - `health`: liveness plus catalog counts.
//! - `blobs`: streamed upload and download, existence headers, stat.
//! - `catalog`: catalog listing, single-entry lookup, and upsert.

pub mod blobs;
pub mod catalog;
pub mod health;

use axum::http::StatusCode;
use axum::response::Response;

use crate::error::error_response;

/// JSON 404 for unknown paths and unsupported methods on known paths.
pub async fn not_found() -> Response {
    error_response(StatusCode::NOT_FOUND, "Not found")
}

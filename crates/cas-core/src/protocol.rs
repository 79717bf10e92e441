//! # HTTP Wire Types
//!
//! JSON bodies exchanged between the server and the remote client. Both
//! sides compile against these definitions so the field names cannot drift.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// `GET /health`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always `"ok"`.
    pub status: String,
    /// Paths in the catalog.
    pub total_files: usize,
    /// Distinct fingerprints referenced by the catalog.
    pub unique_blobs: usize,
}

/// `POST /blobs` and `GET /blobs/{hash}/stat`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BlobResponse {
    /// Fingerprint, 64 lowercase hex characters.
    pub hash: String,
    /// Blob size in bytes.
    pub size: u64,
    /// Present on stat responses only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub exists: Option<bool>,
}

/// `POST /catalog` request body.
///
/// Every field defaults so that a structurally valid but incomplete body
/// reaches field validation instead of failing as malformed JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddEntryRequest {
    /// Logical path.
    #[serde(default)]
    pub filepath: String,
    /// Fingerprint of an already uploaded blob.
    #[serde(default)]
    pub hash: String,
    /// Size in bytes.
    #[serde(default)]
    pub size: u64,
    /// Source modification time.
    #[serde(default)]
    pub modified: DateTime<Utc>,
}

/// Body of every non-2xx response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Canonical reason phrase of the status, e.g. `"Not Found"`.
    pub error: String,
    /// Numeric status code.
    pub code: u16,
    /// Human-readable detail.
    pub message: String,
}

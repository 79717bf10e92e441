//! # Error Types
//!
//! A single error enum for the storage engine. Front ends map the
//! not-found and validation variants onto their own surfaces (HTTP status
//! codes, CLI messages); everything else is an internal failure.

use std::path::PathBuf;

use thiserror::Error;

use crate::blob::IngestPhase;

/// Errors produced by the repository, blob store, and catalog.
#[derive(Error, Debug)]
pub enum CasError {
    /// A hash string was not exactly 64 lowercase hex characters.
    #[error("invalid hash format {0:?}: must be 64 hex characters")]
    InvalidHash(String),

    /// No blob is stored under this fingerprint.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// The catalog has no entry for this logical path.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// `init` found an existing `.cas` directory.
    #[error("CAS repository already exists at {}", .0.display())]
    AlreadyExists(PathBuf),

    /// `open` found no `.cas` directory.
    #[error("no CAS repository found at {}", .0.display())]
    NotARepository(PathBuf),

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// Blob ingest failed; the temp file has been removed unless the phase
    /// is [`IngestPhase::Placed`].
    #[error("blob ingest failed while {phase}: {source}")]
    Ingest {
        /// How far the ingest got before failing.
        phase: IngestPhase,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Filesystem failure with the path or action that caused it.
    #[error("{context}: {source}")]
    Io {
        /// What was being attempted.
        context: String,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// Catalog document could not be encoded or decoded.
    #[error("catalog encoding error: {0}")]
    Encoding(#[from] serde_json::Error),

    /// A catalog document held an entry that cannot be stored.
    #[error("invalid catalog entry: {0}")]
    InvalidEntry(String),

    /// SQLite catalog failure.
    #[error("catalog database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A size or timestamp does not fit the SQLite integer columns.
    #[error("catalog value out of range: {0}")]
    OutOfRange(String),
}

impl CasError {
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// True for the variants that mean "the thing asked for is absent".
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::BlobNotFound(_) | Self::EntryNotFound(_))
    }
}

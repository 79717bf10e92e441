//! # Application State
//!
//! Shared handles passed to every handler. Cloning is cheap: the blob store
//! is a path, the catalog an `Arc`, and the token a shared handle.

use std::time::Duration;

use cas_core::{BlobStore, Repository, SharedCatalog};
use tokio_util::sync::CancellationToken;

use crate::config::DEFAULT_TIMEOUT;

/// Shared application state.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Content-addressed blob files.
    pub blobs: BlobStore,
    /// Path to fingerprint table, shared behind one reader-writer lock.
    pub catalog: SharedCatalog,
    /// Deadline for streaming one blob response body.
    pub write_timeout: Duration,
    /// Cancelled when the shutdown grace period runs out; aborts in-flight
    /// ingests so their temp files are removed.
    pub abort: CancellationToken,
}

impl AppState {
    /// State over `repo` with its already loaded `catalog`.
    pub fn new(repo: &Repository, catalog: SharedCatalog) -> Self {
        Self {
            blobs: repo.blob_store(),
            catalog,
            write_timeout: DEFAULT_TIMEOUT,
            abort: CancellationToken::new(),
        }
    }

    /// Override the response streaming deadline.
    pub fn with_write_timeout(mut self, write_timeout: Duration) -> Self {
        self.write_timeout = write_timeout;
        self
    }
}

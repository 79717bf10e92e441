#![deny(missing_docs)]

//! # cas-core — Storage Engine for mini-cas
//!
//! Everything that touches the repository on disk lives here. The crate has
//! no knowledge of HTTP or the command line; both front ends borrow the
//! repository through the types below.
//!
//! ## Layout
//!
//! ```text
//! <work-dir>/.cas/
//!   storage/<h0h1>/<h2h3>/<64-hex>   immutable blobs, mode 0444
//!   catalog.json | catalog.db        path -> fingerprint table
//! ```
//!
//! ## Invariants
//!
//! 1. **Content addressing.** The file at `storage/.../H` always holds bytes
//!    whose SHA-256 is `H`. Placement goes through a same-filesystem temp
//!    file and an atomic rename, so a crash never leaves a partial blob
//!    under a fingerprint name.
//!
//! 2. **Write once.** A fingerprint that already exists is never rewritten;
//!    re-ingesting identical bytes is a cheap dedup hit.
//!
//! 3. **[`Fingerprint`] is the only way in.** Blob lookups take a parsed
//!    fingerprint, so malformed hashes are rejected before any filesystem
//!    access.

pub mod blob;
pub mod cancel;
pub mod catalog;
pub mod error;
pub mod fingerprint;
pub mod protocol;
pub mod repo;

pub use blob::{BlobStat, BlobStore, IngestPhase, Ingested};
pub use cancel::CancellableReader;
pub use catalog::{
    format_size, Catalog, CatalogBackend, CatalogEntry, CatalogStats, JsonCatalog, SharedCatalog,
    SqliteCatalog,
};
pub use error::CasError;
pub use fingerprint::{hash_reader, short_hex, Fingerprint, HashingWriter};
pub use repo::Repository;

/// Result alias used throughout the storage engine.
pub type Result<T, E = CasError> = std::result::Result<T, E>;

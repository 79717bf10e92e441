//! # Blob Store — Fan-out Object Storage
//!
//! Blobs live at `storage/<h0h1>/<h2h3>/<H>`. Ingest streams the payload
//! into a `tmp-*` file in the storage root while hashing it, then renames
//! the temp file onto its fingerprint path. Because the temp file sits on
//! the same filesystem as its destination the rename is atomic; readers
//! only ever see complete blobs.
//!
//! ## Ingest phases
//!
//! ```text
//! Receiving ──► Hashed ──► Placed
//!     │            │
//!     └────────────┴──► aborted (temp file removed)
//! ```
//!
//! The temp file is owned by a [`tempfile::TempPath`] guard until the
//! rename succeeds, so every early return (I/O error, cancellation, a
//! dropped request future) deletes it.

use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

use tokio::fs::File;
use tokio::io::{AsyncRead, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

use crate::error::CasError;
use crate::fingerprint::{Fingerprint, HashingWriter};

/// Prefix of in-flight ingest files in the storage root.
pub const TEMP_PREFIX: &str = "tmp-";

/// How far an ingest progressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestPhase {
    /// Streaming bytes into the temp file.
    Receiving,
    /// Digest known; moving the temp file onto its fingerprint path.
    Hashed,
    /// Renamed into place; sealing permissions.
    Placed,
}

impl fmt::Display for IngestPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Receiving => "receiving",
            Self::Hashed => "placing",
            Self::Placed => "sealing",
        })
    }
}

/// Outcome of a successful ingest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ingested {
    /// Fingerprint of the ingested bytes.
    pub fingerprint: Fingerprint,
    /// Number of bytes read from the input.
    pub size: u64,
    /// True if the blob was already present and the new copy was discarded.
    pub deduplicated: bool,
}

/// Size and presence of a blob.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlobStat {
    /// Fingerprint that was looked up.
    pub fingerprint: Fingerprint,
    /// Size in bytes; zero when absent.
    pub size: u64,
    /// Whether the blob exists.
    pub exists: bool,
}

/// Content-addressed blob directory.
#[derive(Debug, Clone)]
pub struct BlobStore {
    storage_dir: PathBuf,
}

impl BlobStore {
    /// Store rooted at `storage_dir` (normally `.cas/storage`).
    pub fn new(storage_dir: impl Into<PathBuf>) -> Self {
        Self {
            storage_dir: storage_dir.into(),
        }
    }

    /// The storage root.
    pub fn storage_dir(&self) -> &Path {
        &self.storage_dir
    }

    /// `storage/<h0h1>/<h2h3>/<H>`.
    pub fn object_path(&self, fingerprint: &Fingerprint) -> PathBuf {
        let hex = fingerprint.to_hex();
        self.storage_dir
            .join(&hex[0..2])
            .join(&hex[2..4])
            .join(hex)
    }

    /// Stream `reader` into the store, returning its fingerprint.
    ///
    /// Never buffers the whole payload. If the blob already exists the new
    /// copy is discarded and the existing file is left untouched.
    pub async fn ingest<R>(
        &self,
        mut reader: R,
        cancel: &CancellationToken,
    ) -> Result<Ingested, CasError>
    where
        R: AsyncRead + Unpin,
    {
        if cancel.is_cancelled() {
            return Err(CasError::Cancelled);
        }

        let receiving = |source| CasError::Ingest {
            phase: IngestPhase::Receiving,
            source,
        };

        let tmp = tempfile::Builder::new()
            .prefix(TEMP_PREFIX)
            .tempfile_in(&self.storage_dir)
            .map_err(receiving)?;
        let (file, tmp_path) = tmp.into_parts();
        let mut tee = HashingWriter::new(File::from_std(file));

        let size = tokio::select! {
            biased;
            _ = cancel.cancelled() => {
                tracing::debug!(tmp = %tmp_path.display(), "ingest cancelled");
                return Err(CasError::Cancelled);
            }
            copied = tokio::io::copy(&mut reader, &mut tee) => copied.map_err(receiving)?,
        };
        tee.flush().await.map_err(receiving)?;
        let (file, fingerprint) = tee.finalize();
        file.sync_all().await.map_err(receiving)?;
        drop(file);

        let dest = self.object_path(&fingerprint);
        let dedup = Ingested {
            fingerprint,
            size,
            deduplicated: true,
        };
        let present = tokio::fs::try_exists(&dest).await.map_err(|source| CasError::Ingest {
            phase: IngestPhase::Hashed,
            source,
        })?;
        if present {
            tracing::debug!(hash = %fingerprint, size, "blob already stored");
            return Ok(dedup);
        }

        if let Some(parent) = dest.parent() {
            create_fan_out_dir(parent)
                .await
                .map_err(|source| CasError::Ingest {
                    phase: IngestPhase::Hashed,
                    source,
                })?;
        }
        if let Err(e) = tmp_path.persist_noclobber(&dest) {
            if e.error.kind() == io::ErrorKind::AlreadyExists {
                tracing::debug!(hash = %fingerprint, "lost placement race to identical blob");
                return Ok(dedup);
            }
            return Err(CasError::Ingest {
                phase: IngestPhase::Hashed,
                source: e.error,
            });
        }

        seal(&dest).await.map_err(|source| CasError::Ingest {
            phase: IngestPhase::Placed,
            source,
        })?;
        tracing::debug!(hash = %fingerprint, size, "stored blob");
        Ok(Ingested {
            fingerprint,
            size,
            deduplicated: false,
        })
    }

    /// Open a blob for streaming reads.
    pub async fn open(&self, fingerprint: &Fingerprint) -> Result<File, CasError> {
        let path = self.object_path(fingerprint);
        File::open(&path).await.map_err(|e| match e.kind() {
            io::ErrorKind::NotFound => CasError::BlobNotFound(fingerprint.to_hex()),
            _ => CasError::io(format!("opening {}", path.display()), e),
        })
    }

    /// Size and presence. Absence is not an error.
    pub async fn stat(&self, fingerprint: &Fingerprint) -> Result<BlobStat, CasError> {
        let path = self.object_path(fingerprint);
        match tokio::fs::metadata(&path).await {
            Ok(meta) => Ok(BlobStat {
                fingerprint: *fingerprint,
                size: meta.len(),
                exists: true,
            }),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(BlobStat {
                fingerprint: *fingerprint,
                size: 0,
                exists: false,
            }),
            Err(e) => Err(CasError::io(format!("reading {}", path.display()), e)),
        }
    }

    /// Whether a blob is stored under `fingerprint`.
    pub async fn exists(&self, fingerprint: &Fingerprint) -> Result<bool, CasError> {
        let path = self.object_path(fingerprint);
        tokio::fs::try_exists(&path)
            .await
            .map_err(|e| CasError::io(format!("checking {}", path.display()), e))
    }
}

async fn create_fan_out_dir(dir: &Path) -> io::Result<()> {
    let mut builder = tokio::fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    builder.mode(0o755);
    builder.create(dir).await
}

#[cfg(unix)]
async fn seal(path: &Path) -> io::Result<()> {
    use std::os::unix::fs::PermissionsExt;
    tokio::fs::set_permissions(path, std::fs::Permissions::from_mode(0o444)).await
}

#[cfg(not(unix))]
async fn seal(path: &Path) -> io::Result<()> {
    let mut perms = tokio::fs::metadata(path).await?.permissions();
    perms.set_readonly(true);
    tokio::fs::set_permissions(path, perms).await
}

//! # Catalog — Logical Path to Fingerprint Table
//!
//! The catalog maps user-facing paths to blob fingerprints plus the size
//! and modification time observed at ingest. Paths are unique; many paths
//! may share a fingerprint.
//!
//! Two persistence back ends share one contract:
//!
//! - [`JsonCatalog`] keeps the table in memory and writes `catalog.json`
//!   on [`save`](Catalog::save).
//! - [`SqliteCatalog`] writes through to `catalog.db` on every upsert, so
//!   `save`/`load` have nothing to do.
//!
//! [`Catalog`] dispatches between them and [`SharedCatalog`] puts one
//! behind a reader-writer lock for concurrent callers.
//!
//! ## Interchange format
//!
//! `write_to` emits a JSON array of entries sorted by path. `read_from`
//! accepts that array or an object keyed by path, and upserts every entry
//! it finds.

mod json;
mod shared;
mod sqlite;
mod stats;

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::CasError;
use crate::fingerprint::Fingerprint;
use crate::repo::Repository;

pub use json::JsonCatalog;
pub use shared::SharedCatalog;
pub use sqlite::SqliteCatalog;
pub use stats::{format_size, CatalogStats};

/// One row of the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Logical path; the primary key. Defaults to empty so the keyed
    /// object form may omit it.
    #[serde(default)]
    pub filepath: String,
    /// Fingerprint of the content, 64 lowercase hex characters.
    pub hash: String,
    /// Size in bytes at ingest time.
    pub file_size: u64,
    /// Source file modification time, nanosecond precision.
    pub modification_time: DateTime<Utc>,
}

impl CatalogEntry {
    /// Build an entry for `fingerprint`.
    pub fn new(
        filepath: impl Into<String>,
        fingerprint: &Fingerprint,
        file_size: u64,
        modification_time: DateTime<Utc>,
    ) -> Self {
        Self {
            filepath: filepath.into(),
            hash: fingerprint.to_hex(),
            file_size,
            modification_time,
        }
    }

    /// Parse the stored hash.
    pub fn fingerprint(&self) -> Result<Fingerprint, CasError> {
        Fingerprint::parse(&self.hash)
    }
}

/// Which persistence back end a catalog uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CatalogBackend {
    /// `catalog.json`, saved explicitly.
    #[default]
    Json,
    /// `catalog.db`, written through on every upsert.
    Sqlite,
}

impl CatalogBackend {
    /// Pick the back end already present in `repo`: SQLite if `catalog.db`
    /// exists, JSON otherwise.
    pub fn detect(repo: &Repository) -> Self {
        if repo.catalog_db_path().is_file() {
            Self::Sqlite
        } else {
            Self::Json
        }
    }

    /// Lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Json => "json",
            Self::Sqlite => "sqlite",
        }
    }
}

impl fmt::Display for CatalogBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CatalogBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "sqlite" => Ok(Self::Sqlite),
            other => Err(format!("unknown catalog backend {other:?}")),
        }
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum CatalogDocument {
    List(Vec<CatalogEntry>),
    Keyed(BTreeMap<String, CatalogEntry>),
}

/// Parse an array or path-keyed object of entries. Blank input is empty;
/// an entry without a path is rejected.
pub(crate) fn decode_entries(bytes: &[u8]) -> Result<Vec<CatalogEntry>, CasError> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(Vec::new());
    }
    let entries = match serde_json::from_slice::<CatalogDocument>(bytes)? {
        CatalogDocument::List(entries) => entries,
        CatalogDocument::Keyed(map) => map
            .into_iter()
            .map(|(path, mut entry)| {
                entry.filepath = path;
                entry
            })
            .collect(),
    };
    if let Some(pos) = entries.iter().position(|e| e.filepath.is_empty()) {
        return Err(CasError::InvalidEntry(format!(
            "entry {pos} has an empty filepath"
        )));
    }
    Ok(entries)
}

/// Pretty JSON array, in the order given.
pub(crate) fn encode_entries(entries: &[CatalogEntry]) -> Result<Vec<u8>, CasError> {
    let mut out = serde_json::to_vec_pretty(entries)?;
    out.push(b'\n');
    Ok(out)
}

/// A catalog with either persistence back end.
#[derive(Debug)]
pub enum Catalog {
    /// In-memory table saved to `catalog.json`.
    Json(JsonCatalog),
    /// Write-through `catalog.db`.
    Sqlite(SqliteCatalog),
}

impl Catalog {
    /// Open the catalog kind present in `repo`. Does not load; see
    /// [`load`](Self::load).
    pub async fn open(repo: &Repository) -> Result<Self, CasError> {
        match CatalogBackend::detect(repo) {
            CatalogBackend::Json => Ok(Self::Json(JsonCatalog::new(repo.catalog_json_path()))),
            CatalogBackend::Sqlite => Ok(Self::Sqlite(
                SqliteCatalog::open(repo.catalog_db_path()).await?,
            )),
        }
    }

    /// Which back end this is.
    pub fn backend(&self) -> CatalogBackend {
        match self {
            Self::Json(_) => CatalogBackend::Json,
            Self::Sqlite(_) => CatalogBackend::Sqlite,
        }
    }

    /// Insert or replace the entry for `entry.filepath`.
    pub async fn add_entry(&mut self, entry: CatalogEntry) -> Result<(), CasError> {
        match self {
            Self::Json(c) => {
                c.add_entry(entry);
                Ok(())
            }
            Self::Sqlite(c) => c.add_entry(&entry).await,
        }
    }

    /// Entry for `filepath`, or [`CasError::EntryNotFound`].
    pub async fn get_entry(&self, filepath: &str) -> Result<CatalogEntry, CasError> {
        match self {
            Self::Json(c) => c.get_entry(filepath),
            Self::Sqlite(c) => c.get_entry(filepath).await,
        }
    }

    /// All entries, ascending by path.
    pub async fn list_entries(&self) -> Result<Vec<CatalogEntry>, CasError> {
        match self {
            Self::Json(c) => Ok(c.list_entries()),
            Self::Sqlite(c) => c.list_entries().await,
        }
    }

    /// Persist the table. No-op for SQLite.
    pub async fn save(&self) -> Result<(), CasError> {
        match self {
            Self::Json(c) => c.save().await,
            Self::Sqlite(_) => Ok(()),
        }
    }

    /// Replace the in-memory table with the persisted one. No-op for SQLite.
    pub async fn load(&mut self) -> Result<(), CasError> {
        match self {
            Self::Json(c) => c.load().await,
            Self::Sqlite(_) => Ok(()),
        }
    }

    /// Upsert every entry in a JSON document read from `reader`.
    /// Returns the number of entries applied.
    pub async fn read_from<R>(&mut self, reader: &mut R) -> Result<usize, CasError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        let mut buf = Vec::new();
        reader
            .read_to_end(&mut buf)
            .await
            .map_err(|e| CasError::io("reading catalog document", e))?;
        let entries = decode_entries(&buf)?;
        let count = entries.len();
        for entry in entries {
            self.add_entry(entry).await?;
        }
        Ok(count)
    }

    /// Write every entry as a JSON array. Returns the number of bytes written.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<u64, CasError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        let bytes = encode_entries(&self.list_entries().await?)?;
        writer
            .write_all(&bytes)
            .await
            .map_err(|e| CasError::io("writing catalog document", e))?;
        Ok(bytes.len() as u64)
    }

    /// Release back-end resources.
    pub async fn close(&self) {
        if let Self::Sqlite(c) = self {
            c.close().await;
        }
    }
}

use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};

use tokio::io::AsyncWriteExt;

use super::{decode_entries, encode_entries, CatalogEntry};
use crate::error::CasError;

/// In-memory catalog persisted as a JSON array.
///
/// Keyed by a `BTreeMap`, so iteration order is the byte-lexicographic path
/// order that listings require.
#[derive(Debug, Clone)]
pub struct JsonCatalog {
    path: PathBuf,
    entries: BTreeMap<String, CatalogEntry>,
}

impl JsonCatalog {
    /// Empty catalog that will persist to `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            entries: BTreeMap::new(),
        }
    }

    /// Persistence file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when no paths are tracked.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Insert or replace by path.
    pub fn add_entry(&mut self, entry: CatalogEntry) {
        self.entries.insert(entry.filepath.clone(), entry);
    }

    /// Entry for `filepath`.
    pub fn get_entry(&self, filepath: &str) -> Result<CatalogEntry, CasError> {
        self.entries
            .get(filepath)
            .cloned()
            .ok_or_else(|| CasError::EntryNotFound(filepath.to_string()))
    }

    /// All entries, ascending by path.
    pub fn list_entries(&self) -> Vec<CatalogEntry> {
        self.entries.values().cloned().collect()
    }

    /// Write the table to a temp file beside `catalog.json` and rename it
    /// into place, so a crash leaves either the old or the new file.
    pub async fn save(&self) -> Result<(), CasError> {
        let bytes = encode_entries(&self.list_entries())?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let context = || format!("saving {}", self.path.display());

        let tmp = tempfile::Builder::new()
            .prefix(".catalog-")
            .suffix(".json")
            .tempfile_in(dir)
            .map_err(|e| CasError::io(context(), e))?;
        let (file, tmp_path) = tmp.into_parts();
        let mut file = tokio::fs::File::from_std(file);
        file.write_all(&bytes)
            .await
            .map_err(|e| CasError::io(context(), e))?;
        file.sync_all()
            .await
            .map_err(|e| CasError::io(context(), e))?;
        drop(file);
        tmp_path
            .persist(&self.path)
            .map_err(|e| CasError::io(context(), e.error))?;

        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "saved catalog");
        Ok(())
    }

    /// Replace the table with the file's contents. A missing file is an
    /// empty catalog.
    pub async fn load(&mut self) -> Result<(), CasError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => Vec::new(),
            Err(e) => {
                return Err(CasError::io(format!("loading {}", self.path.display()), e));
            }
        };
        let entries = decode_entries(&bytes)?;
        self.entries.clear();
        for entry in entries {
            self.add_entry(entry);
        }
        tracing::debug!(path = %self.path.display(), entries = self.entries.len(), "loaded catalog");
        Ok(())
    }
}

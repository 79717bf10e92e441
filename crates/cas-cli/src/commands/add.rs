//! `cas add`: ingest a file or directory tree and catalog every file.
//!
//! Directories are walked depth-first in name order; `.cas` directories are
//! skipped. Files are processed one at a time and the catalog is saved once
//! at the end.

use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use cas_client::{BlobOperations, CatalogOperations, Client, ClientError};
use cas_core::repo::CAS_DIR_NAME;
use cas_core::{CatalogEntry, Fingerprint};
use chrono::{DateTime, Utc};
use clap::Args;
use tokio_util::sync::CancellationToken;
use walkdir::WalkDir;

/// Arguments for `cas add`.
#[derive(Args, Debug)]
pub struct AddArgs {
    /// File or directory to add.
    pub path: PathBuf,
}

/// Outcome for one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Added {
    /// Catalog key: the path as walked.
    pub filepath: String,
    /// Content fingerprint.
    pub fingerprint: Fingerprint,
    /// True when the blob was uploaded but the back end keeps no catalog.
    pub uploaded_only: bool,
}

/// Execute `cas add`.
pub async fn run_add(
    args: &AddArgs,
    client: &Client,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<u8> {
    add_path(&args.path, client, cancel, out).await?;

    match client.save_catalog(cancel).await {
        Ok(()) => {}
        Err(ClientError::CatalogNotSupported) => {
            writeln!(out, "(Remote mode: server manages catalog)")?;
        }
        Err(e) => return Err(e).context("failed to save catalog"),
    }

    writeln!(out, "Successfully added {}", args.path.display())?;
    Ok(0)
}

/// Add `path` (a file, or every file beneath a directory), printing one
/// line per file.
pub async fn add_path(
    path: &Path,
    client: &Client,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<Vec<Added>> {
    let meta = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("failed to access {}", path.display()))?;

    let mut added = Vec::new();
    if meta.is_dir() {
        let walker = WalkDir::new(path)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(|e| !(e.file_type().is_dir() && e.file_name() == CAS_DIR_NAME));
        for entry in walker {
            let entry = entry.context("failed to walk directory")?;
            if entry.file_type().is_dir() {
                continue;
            }
            added.push(add_file(entry.path(), client, cancel, out).await?);
        }
    } else {
        added.push(add_file(path, client, cancel, out).await?);
    }
    Ok(added)
}

async fn add_file(
    path: &Path,
    client: &Client,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<Added> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("failed to open {}", path.display()))?;
    let meta = file
        .metadata()
        .await
        .with_context(|| format!("failed to stat {}", path.display()))?;
    let modified: DateTime<Utc> = meta
        .modified()
        .with_context(|| format!("failed to read modification time of {}", path.display()))?
        .into();

    let fingerprint = client
        .upload(cancel, file)
        .await
        .with_context(|| format!("failed to upload {}", path.display()))?;

    let filepath = path.to_string_lossy().into_owned();
    let entry = CatalogEntry::new(filepath.clone(), &fingerprint, meta.len(), modified);
    let uploaded_only = match client.add_entry(cancel, entry).await {
        Ok(()) => false,
        Err(ClientError::CatalogNotSupported) => true,
        Err(e) => {
            return Err(e).with_context(|| format!("failed to add catalog entry for {filepath}"))
        }
    };

    if uploaded_only {
        writeln!(out, "     {filepath} -> {} (uploaded)", fingerprint.short())?;
    } else {
        writeln!(out, "     {filepath} -> {}", fingerprint.short())?;
    }
    tracing::debug!(path = %filepath, hash = %fingerprint, size = meta.len(), "added file");

    Ok(Added {
        filepath,
        fingerprint,
        uploaded_only,
    })
}

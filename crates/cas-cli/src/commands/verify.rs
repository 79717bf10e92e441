//! `cas verify`: re-hash every cataloged blob and report damage.

use std::io::Write;

use anyhow::{Context, Result};
use cas_client::{BlobOperations, CatalogOperations, Client, ClientError};
use cas_core::{hash_reader, short_hex, CatalogEntry};
use tokio_util::sync::CancellationToken;

/// Counts reported at the end of a verification run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct VerifySummary {
    /// Entries checked.
    pub total: usize,
    /// Blobs whose content matches their fingerprint.
    pub verified: usize,
    /// Blobs that mismatch or could not be read.
    pub corrupted: usize,
    /// Blobs absent from storage.
    pub missing: usize,
}

impl VerifySummary {
    /// Whether anything needs attention.
    pub fn has_issues(&self) -> bool {
        self.corrupted > 0 || self.missing > 0
    }
}

/// Execute `cas verify`. Exits 1 when any blob is corrupt or missing.
pub async fn run_verify(client: &Client, cancel: &CancellationToken, out: &mut impl Write) -> Result<u8> {
    let entries = client
        .get_catalog(cancel)
        .await
        .context("failed to load catalog")?;
    let summary = verify_entries(&entries, client, cancel, out).await?;

    writeln!(out, "=====================")?;
    writeln!(out, "Verification Results:")?;
    writeln!(out, "  Total Files: {}", summary.total)?;
    writeln!(out, "  Verified Files: {}", summary.verified)?;
    writeln!(out, "  Corrupted Files: {}", summary.corrupted)?;

    if summary.has_issues() {
        writeln!(out, "\nWARNING: Storage issues detected")?;
        Ok(1)
    } else {
        writeln!(out, "\nAll files verified successfully!")?;
        Ok(0)
    }
}

/// Check each entry, printing one verdict per entry. Missing blobs are
/// reported on stderr.
pub async fn verify_entries(
    entries: &[CatalogEntry],
    client: &Client,
    cancel: &CancellationToken,
    out: &mut impl Write,
) -> Result<VerifySummary> {
    let mut summary = VerifySummary {
        total: entries.len(),
        ..VerifySummary::default()
    };

    for entry in entries {
        let mut reader = match client.download(cancel, &entry.hash).await {
            Ok(reader) => reader,
            Err(ClientError::BlobNotFound(_)) => {
                eprintln!("MISSING: {} (hash {})", entry.filepath, entry.hash);
                summary.missing += 1;
                continue;
            }
            Err(ClientError::Cancelled) => return Err(ClientError::Cancelled.into()),
            Err(e) => {
                writeln!(out, "ERROR: {} - failed to download: {e}", entry.filepath)?;
                summary.corrupted += 1;
                continue;
            }
        };

        let computed = match hash_reader(&mut reader).await {
            Ok((fingerprint, _)) => fingerprint.to_hex(),
            Err(_) if cancel.is_cancelled() => return Err(ClientError::Cancelled.into()),
            Err(e) => {
                writeln!(out, "ERROR: {} - failed to read: {e}", entry.filepath)?;
                summary.corrupted += 1;
                continue;
            }
        };

        if computed == entry.hash {
            writeln!(out, "OK: {}", entry.filepath)?;
            summary.verified += 1;
        } else {
            writeln!(out, "CORRUPT: {}", entry.filepath)?;
            writeln!(out, " Expected: {}", short_hex(&entry.hash))?;
            writeln!(out, " Got:      {}", short_hex(&computed))?;
            tracing::warn!(path = %entry.filepath, expected = %entry.hash, got = %computed, "blob content mismatch");
            summary.corrupted += 1;
        }
    }
    Ok(summary)
}

//! `cas status`: deduplication statistics.

use std::io::Write;

use anyhow::{Context, Result};
use cas_client::{CatalogOperations, Client};
use cas_core::{format_size, CatalogStats};
use tokio_util::sync::CancellationToken;

/// Execute `cas status`.
pub async fn run_status(client: &Client, cancel: &CancellationToken, out: &mut impl Write) -> Result<u8> {
    let entries = client
        .get_catalog(cancel)
        .await
        .context("failed to load catalog")?;
    write_stats(&CatalogStats::from_entries(&entries), out)?;
    Ok(0)
}

/// Render the statistics block.
pub fn write_stats(stats: &CatalogStats, out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "Repository Statistics:")?;
    writeln!(out, "======================")?;
    writeln!(out, "Files Tracked: {}", stats.files)?;
    writeln!(out, "Unique Blobs: {}", stats.unique_blobs)?;
    writeln!(out, "Total File Size: {}", format_size(stats.total_size))?;
    writeln!(out, "Actual Storage: {}", format_size(stats.stored_size))?;
    writeln!(
        out,
        "Space Saved: {} ({:.1}%)",
        format_size(stats.saved_size()),
        stats.saved_percent()
    )
}

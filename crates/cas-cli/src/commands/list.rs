//! `cas ls`: tabulate the catalog.

use std::io::Write;

use anyhow::{Context, Result};
use cas_client::{CatalogOperations, Client};
use cas_core::{format_size, short_hex, CatalogEntry};
use chrono::Local;
use tokio_util::sync::CancellationToken;

/// Execute `cas ls`. An empty catalog exits with 1.
pub async fn run_list(client: &Client, cancel: &CancellationToken, out: &mut impl Write) -> Result<u8> {
    let entries = client
        .get_catalog(cancel)
        .await
        .context("failed to load catalog")?;
    if entries.is_empty() {
        eprintln!("No files tracked in catalog");
        return Ok(1);
    }
    write_table(&entries, out)?;
    Ok(0)
}

/// Render `entries` as the `ls` table.
pub fn write_table(entries: &[CatalogEntry], out: &mut impl Write) -> std::io::Result<()> {
    writeln!(out, "{:<50} {:<10} {:<12} {}", "FILEPATH", "HASH", "SIZE", "MODIFIED")?;
    writeln!(out, "{}", "=".repeat(100))?;
    for entry in entries {
        let modified = entry.modification_time.with_timezone(&Local);
        writeln!(
            out,
            "{:<50} {:<10} {:<12}  {}",
            entry.filepath,
            short_hex(&entry.hash),
            format_size(entry.file_size),
            modified.format("%Y-%m-%d %H:%M"),
        )?;
    }
    writeln!(out, "\nTotal files: {}", entries.len())
}

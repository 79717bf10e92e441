//! `cas hash`: print a file's fingerprint without touching any repository.

use std::path::PathBuf;

use anyhow::{Context, Result};
use cas_core::CancellableReader;
use clap::Args;
use tokio_util::sync::CancellationToken;

/// Arguments for `cas hash`.
#[derive(Args, Debug)]
pub struct HashArgs {
    /// File to fingerprint.
    pub file: PathBuf,
}

/// Execute `cas hash`.
pub async fn run_hash(
    args: &HashArgs,
    cancel: &CancellationToken,
    out: &mut impl std::io::Write,
) -> Result<u8> {
    let file = tokio::fs::File::open(&args.file)
        .await
        .with_context(|| format!("failed to open {}", args.file.display()))?;
    let mut reader = CancellableReader::new(file, cancel.clone());
    let (fingerprint, _) = cas_core::hash_reader(&mut reader)
        .await
        .with_context(|| format!("failed to read {}", args.file.display()))?;
    writeln!(out, "{fingerprint}")?;
    Ok(0)
}

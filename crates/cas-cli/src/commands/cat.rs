//! `cas cat`: stream a cataloged file's content.

use anyhow::{Context, Result};
use cas_client::{BlobOperations, CatalogOperations, Client, ClientError};
use clap::Args;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;

/// Arguments for `cas cat`.
#[derive(Args, Debug)]
pub struct CatArgs {
    /// Catalog path, as shown by `cas ls`.
    pub filepath: String,
}

/// Execute `cas cat`, copying the blob to `out`.
pub async fn run_cat<W>(
    args: &CatArgs,
    client: &Client,
    cancel: &CancellationToken,
    out: &mut W,
) -> Result<u8>
where
    W: AsyncWrite + Unpin,
{
    let entry = match client.get_entry(cancel, &args.filepath).await {
        Ok(entry) => entry,
        Err(ClientError::EntryNotFound(_)) => {
            eprintln!("This file doesn't exist in the catalog: {}", args.filepath);
            return Ok(1);
        }
        Err(e) => return Err(e).context("failed to get entry"),
    };

    let mut reader = match client.download(cancel, &entry.hash).await {
        Ok(reader) => reader,
        Err(ClientError::BlobNotFound(_)) => {
            eprintln!("Blob not found in storage: {}", entry.hash);
            return Ok(1);
        }
        Err(e) => return Err(e).context("failed to download blob"),
    };

    if let Err(e) = tokio::io::copy(&mut reader, out).await {
        if cancel.is_cancelled() {
            return Err(ClientError::Cancelled.into());
        }
        return Err(e).context("failed to write blob");
    }
    out.flush().await?;
    Ok(0)
}

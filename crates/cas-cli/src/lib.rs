//! # cas-cli — the `cas` Command
//!
//! Subcommands that touch stored content go through [`cas_client::Client`],
//! so each of them works unchanged against a local `.cas` directory or a
//! running server:
//!
//! ```bash
//! cas init                                  # create ./.cas
//! cas add photos/                           # ingest and catalog a tree
//! CAS_SERVER_URL=http://nas:8080 cas ls     # same commands, remote store
//! cas serve --port 9000 --auth-token s3cret
//! ```
//!
//! Every `run_*` function returns the process exit code on success. Output
//! goes to the writer it is handed; diagnostics for individual items go to
//! stderr.

pub mod commands;

use anyhow::{Context, Result};
use cas_client::{Client, ClientConfig};

/// Build a client from `CAS_SERVER_URL`, `CAS_AUTH_TOKEN`, and `CAS_DIR`.
pub async fn connect() -> Result<Client> {
    let config = ClientConfig::from_env().context("invalid client configuration")?;
    tracing::debug!(?config, "creating client");
    Client::new(&config).await.context("failed to create client")
}

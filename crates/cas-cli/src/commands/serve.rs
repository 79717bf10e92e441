//! `cas serve`: run the HTTP server over the repository in the working
//! directory.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use cas_api::config::{parse_cors_origins, DEFAULT_HOST, DEFAULT_PORT};
use cas_api::{Server, ServerConfig};
use clap::Args;
use tokio_util::sync::CancellationToken;

/// Arguments for `cas serve`.
#[derive(Args, Debug)]
pub struct ServeArgs {
    /// HTTP port.
    #[arg(long, env = "CAS_PORT", default_value_t = DEFAULT_PORT)]
    pub port: u16,

    /// Bind address.
    #[arg(long, env = "CAS_HOST", default_value = DEFAULT_HOST)]
    pub host: String,

    /// Bearer token required for write operations.
    #[arg(long, env = "CAS_AUTH_TOKEN", hide_env_values = true)]
    pub auth_token: Option<String>,

    /// Comma-separated allowed CORS origins.
    #[arg(long, env = "CAS_CORS_ORIGINS", default_value = "*")]
    pub cors_origins: String,

    /// Seconds allowed to receive a request and produce its response headers.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub read_timeout: u64,

    /// Seconds allowed to stream one blob response.
    #[arg(long, value_name = "SECS", default_value_t = 30)]
    pub write_timeout: u64,

    /// Working directory containing `.cas`.
    #[arg(long, default_value = ".")]
    pub repo: PathBuf,
}

impl ServeArgs {
    /// Translate flags into a server configuration.
    pub fn to_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
            auth_token: None,
            cors_origins: parse_cors_origins(&self.cors_origins),
            read_timeout: Duration::from_secs(self.read_timeout),
            write_timeout: Duration::from_secs(self.write_timeout),
            repo_path: self.repo.clone(),
        }
        .with_auth_token(self.auth_token.clone())
    }
}

/// Execute `cas serve` until `shutdown` fires.
pub async fn run_serve(args: &ServeArgs, shutdown: &CancellationToken) -> Result<u8> {
    let config = args.to_config();
    tracing::info!(
        addr = %config.bind_addr(),
        auth = config.auth_token.is_some(),
        origins = ?config.cors_origins,
        "starting server"
    );
    let server = Server::open(config)
        .await
        .context("failed to create server")?;
    server
        .run(shutdown.clone())
        .await
        .context("server error")?;
    Ok(0)
}

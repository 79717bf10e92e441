//! # Server Lifecycle
//!
//! [`Server::open`] loads the repository and catalog once; [`Server::run`]
//! binds and serves until the shutdown token fires. In-flight requests then
//! get [`SHUTDOWN_GRACE`] to finish. When that runs out, in-flight ingests
//! are cancelled (removing their temp files) and `run` returns.

use std::future::IntoFuture;

use axum::Router;
use cas_core::{Repository, SharedCatalog};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;

use crate::config::{ServerConfig, SHUTDOWN_GRACE};
use crate::error::ServerError;
use crate::state::AppState;

/// A configured server over one repository.
#[derive(Debug)]
pub struct Server {
    config: ServerConfig,
    state: AppState,
}

impl Server {
    /// Open the repository under `config.repo_path` and load its catalog.
    pub async fn open(config: ServerConfig) -> Result<Self, ServerError> {
        let repo = Repository::open(&config.repo_path)?;
        let catalog = SharedCatalog::open(&repo).await?;
        let state = AppState::new(&repo, catalog).with_write_timeout(config.write_timeout);
        tracing::debug!(
            root = %repo.root().display(),
            backend = %state.catalog.backend().await,
            "opened repository"
        );
        Ok(Self { config, state })
    }

    /// The full application router.
    pub fn router(&self) -> Router {
        crate::app(self.state.clone(), &self.config)
    }

    /// Bind the configured address.
    pub async fn bind(&self) -> Result<TcpListener, ServerError> {
        let addr = self.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })
    }

    /// Bind, then [`serve`](Self::serve).
    pub async fn run(self, shutdown: CancellationToken) -> Result<(), ServerError> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` fires and the
    /// drain completes or times out. The catalog is closed on return.
    pub async fn serve(
        self,
        listener: TcpListener,
        shutdown: CancellationToken,
    ) -> Result<(), ServerError> {
        match listener.local_addr() {
            Ok(addr) => tracing::info!(%addr, "server listening"),
            Err(e) => tracing::warn!(error = %e, "server listening on unknown address"),
        }

        let signal = shutdown.clone();
        let server = axum::serve(listener, self.router())
            .with_graceful_shutdown(async move { signal.cancelled().await })
            .into_future();
        let grace_expired = async {
            shutdown.cancelled().await;
            tracing::info!("shutdown requested, draining in-flight requests");
            tokio::time::sleep(SHUTDOWN_GRACE).await;
        };

        let result = tokio::select! {
            res = server => res.map_err(ServerError::Serve),
            _ = grace_expired => {
                tracing::warn!(
                    grace_secs = SHUTDOWN_GRACE.as_secs(),
                    "shutdown grace period expired, aborting in-flight requests"
                );
                self.state.abort.cancel();
                Ok(())
            }
        };

        self.state.catalog.close().await;
        tracing::info!("server stopped");
        result
    }
}

//! # cas-api — HTTP Front End
//!
//! Projects the blob store and catalog over HTTP with Axum/Tower/Tokio.
//!
//! ## Routes
//!
//! | Method | Path | Purpose |
//! |--------|------|---------|
//! | GET    | `/health` | Liveness plus catalog counts |
//! | POST   | `/blobs` | Streamed upload, returns the fingerprint |
//! | GET    | `/blobs/{hash}` | Streamed download |
//! | HEAD   | `/blobs/{hash}` | Headers only |
//! | GET    | `/blobs/{hash}/stat` | Size and presence |
//! | GET    | `/catalog` | Full catalog, or one entry with `?filepath=` |
//! | POST   | `/catalog` | Upsert an entry for an uploaded blob |
//!
//! Any other method or path is a JSON 404.
//!
//! ## Middleware Stack (Tower)
//!
//! Recovery → AccessLog → CORS → Auth → Timeout → handler
//!
//! All errors map to `{"error", "code", "message"}` bodies via [`AppError`].

pub mod auth;
pub mod config;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod routes;
pub mod server;
pub mod state;

use axum::middleware::from_fn;
use axum::Router;

pub use config::ServerConfig;
pub use error::{AppError, ServerError};
pub use server::Server;
pub use state::AppState;

use crate::auth::{auth_middleware, AuthConfig};
use crate::middleware::cors::{cors_middleware, CorsConfig};
use crate::middleware::timeout::{timeout_middleware, ReadTimeout};

/// Build the full application router with the middleware pipeline.
pub fn app(state: AppState, config: &ServerConfig) -> Router {
    let auth_config = AuthConfig::new(config.auth_token.as_deref().map(String::as_str));
    let cors_config = CorsConfig::new(config.cors_origins.clone());

    Router::new()
        .merge(routes::health::router())
        .merge(routes::blobs::router())
        .merge(routes::catalog::router())
        .fallback(routes::not_found)
        .layer(from_fn(timeout_middleware))
        .layer(from_fn(auth_middleware))
        .layer(from_fn(cors_middleware))
        .layer(middleware::access_log::layer())
        .layer(middleware::recovery::layer())
        .layer(axum::Extension(auth_config))
        .layer(axum::Extension(cors_config))
        .layer(axum::Extension(ReadTimeout(config.read_timeout)))
        .with_state(state)
}

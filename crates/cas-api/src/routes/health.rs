//! `GET /health`.

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};
use cas_core::protocol::HealthResponse;
use cas_core::CatalogStats;

use super::not_found;
use crate::error::AppError;
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health).fallback(not_found))
}

async fn health(State(state): State<AppState>) -> Result<Json<HealthResponse>, AppError> {
    let entries = state.catalog.list_entries().await?;
    let stats = CatalogStats::from_entries(&entries);
    Ok(Json(HealthResponse {
        status: "ok".into(),
        total_files: stats.files,
        unique_blobs: stats.unique_blobs,
    }))
}

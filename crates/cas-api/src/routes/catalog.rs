//! # Catalog Endpoints
//!
//! `GET /catalog` serves the in-memory catalog; `?filepath=` narrows it to
//! one entry. `POST /catalog` records a path for an already uploaded blob
//! and persists the catalog before answering.

use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use cas_core::protocol::AddEntryRequest;
use cas_core::{CatalogEntry, Fingerprint};
use serde::Deserialize;

use super::not_found;
use crate::error::AppError;
use crate::extractors::{extract_query, parse_validated_json};
use crate::state::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route(
        "/catalog",
        get(get_catalog).post(add_entry).fallback(not_found),
    )
}

#[derive(Debug, Default, Deserialize)]
struct CatalogQuery {
    #[serde(default)]
    filepath: Option<String>,
}

async fn get_catalog(
    State(state): State<AppState>,
    query: Result<Query<CatalogQuery>, QueryRejection>,
) -> Result<Response, AppError> {
    let query = extract_query(query)?;
    match query.filepath.filter(|p| !p.is_empty()) {
        Some(filepath) => {
            let entry = state.catalog.get_entry(&filepath).await?;
            Ok(Json(entry).into_response())
        }
        None => {
            let entries = state.catalog.list_entries().await?;
            Ok(Json(entries).into_response())
        }
    }
}

async fn add_entry(
    State(state): State<AppState>,
    body: Bytes,
) -> Result<(StatusCode, Json<CatalogEntry>), AppError> {
    let req: AddEntryRequest = parse_validated_json(&body)?;
    let fingerprint = Fingerprint::parse(&req.hash)?;

    if !state.blobs.exists(&fingerprint).await? {
        return Err(AppError::NotFound(format!(
            "Blob {} not found - upload blob first",
            fingerprint.short()
        )));
    }

    let entry = CatalogEntry::new(req.filepath, &fingerprint, req.size, req.modified);
    state.catalog.add_entry(entry.clone()).await?;
    state.catalog.save().await?;

    tracing::info!(path = %entry.filepath, hash = %fingerprint.short(), "added catalog entry");
    Ok((StatusCode::CREATED, Json(entry)))
}

//! # Blob Endpoints
//!
//! Uploads stream straight from the request body through the hashing tee
//! into a temp file; nothing is buffered in memory beyond one chunk.
//! Downloads stream the stored file under the write-timeout deadline.

use std::io;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::extract::{Path, State};
use axum::http::{header, HeaderMap, HeaderValue, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use cas_core::protocol::BlobResponse;
use cas_core::Fingerprint;
use futures_util::{Stream, StreamExt, TryStreamExt};
use tokio::time::Instant;
use tokio_util::io::{ReaderStream, StreamReader};

use super::not_found;
use crate::error::AppError;
use crate::state::AppState;

const CACHE_CONTROL: &str = "public, max-age=31536000, immutable";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/blobs", post(upload).fallback(not_found))
        .route(
            "/blobs/{hash}",
            get(get_blob).head(head_blob).fallback(not_found),
        )
        .route("/blobs/{hash}/stat", get(stat_blob).fallback(not_found))
}

async fn upload(State(state): State<AppState>, body: Body) -> Result<impl IntoResponse, AppError> {
    let stream = body.into_data_stream().map_err(io::Error::other);
    let ingested = state
        .blobs
        .ingest(StreamReader::new(stream), &state.abort)
        .await?;
    tracing::info!(
        hash = %ingested.fingerprint.short(),
        size = ingested.size,
        deduplicated = ingested.deduplicated,
        "stored blob"
    );
    Ok((
        StatusCode::CREATED,
        Json(BlobResponse {
            hash: ingested.fingerprint.to_hex(),
            size: ingested.size,
            exists: None,
        }),
    ))
}

async fn get_blob(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, AppError> {
    let fingerprint = Fingerprint::parse(&hash)?;
    let file = state.blobs.open(&fingerprint).await?;
    let size = file
        .metadata()
        .await
        .map_err(|e| AppError::Internal(format!("reading blob {fingerprint}: {e}")))?
        .len();

    let body = with_deadline(ReaderStream::new(file), state.write_timeout, fingerprint);
    Ok((blob_headers(&fingerprint, size), Body::from_stream(body)).into_response())
}

async fn head_blob(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Response, AppError> {
    let fingerprint = Fingerprint::parse(&hash)?;
    let stat = state.blobs.stat(&fingerprint).await?;
    if !stat.exists {
        return Err(AppError::NotFound("Blob not found".into()));
    }
    Ok((blob_headers(&fingerprint, stat.size), Body::empty()).into_response())
}

async fn stat_blob(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<BlobResponse>, AppError> {
    let fingerprint = Fingerprint::parse(&hash)?;
    let stat = state.blobs.stat(&fingerprint).await?;
    Ok(Json(BlobResponse {
        hash: fingerprint.to_hex(),
        size: stat.size,
        exists: Some(stat.exists),
    }))
}

fn blob_headers(fingerprint: &Fingerprint, size: u64) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    headers.insert(header::CONTENT_LENGTH, HeaderValue::from(size));
    if let Ok(etag) = HeaderValue::from_str(&format!("\"{fingerprint}\"")) {
        headers.insert(header::ETAG, etag);
    }
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static(CACHE_CONTROL));
    headers
}

/// End `stream` with a `TimedOut` error once `limit` has elapsed since the
/// response started.
fn with_deadline<S>(
    stream: S,
    limit: Duration,
    fingerprint: Fingerprint,
) -> impl Stream<Item = io::Result<Bytes>> + Send + 'static
where
    S: Stream<Item = io::Result<Bytes>> + Send + Unpin + 'static,
{
    let deadline = Instant::now() + limit;
    futures_util::stream::unfold(Some(stream), move |state| async move {
        let mut stream = state?;
        match tokio::time::timeout_at(deadline, stream.next()).await {
            Ok(Some(item)) => Some((item, Some(stream))),
            Ok(None) => None,
            Err(_) => {
                tracing::warn!(hash = %fingerprint.short(), "blob response exceeded write timeout");
                let err = io::Error::new(io::ErrorKind::TimedOut, "write timeout");
                Some((Err(err), None))
            }
        }
    })
}

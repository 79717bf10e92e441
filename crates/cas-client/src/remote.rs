//! HTTP client for a remote CAS server.
//!
//! ## Paths
//!
//! | Method | Path | Operation |
//! |--------|------|-----------|
//! | POST   | `/blobs` | Upload (streamed body) |
//! | GET    | `/blobs/{hash}` | Download (streamed body) |
//! | HEAD   | `/blobs/{hash}` | Exists |
//! | GET    | `/blobs/{hash}/stat` | Stat |
//! | GET    | `/catalog` | Full catalog, or one entry with `?filepath=` |
//! | POST   | `/catalog` | Upsert entry |
//!
//! Requests carry no client-side timeout: uploads and downloads may stream
//! for as long as the payload needs. Callers bound them with their
//! cancellation token instead.

use std::io;
use std::time::Duration;

use cas_core::protocol::{AddEntryRequest, BlobResponse, ErrorBody};
use cas_core::{BlobStat, CancellableReader, CatalogEntry, Fingerprint};
use futures_util::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Response, StatusCode};
use tokio::io::AsyncRead;
use tokio_util::io::{ReaderStream, StreamReader};
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::error::ClientError;
use crate::{cancellable, BlobOperations, BlobReader, CatalogOperations};

/// Upper bound on how much of an error body is read into a message.
const MAX_ERROR_BODY: usize = 1024;

/// Client for a remote CAS server.
#[derive(Debug, Clone)]
pub struct HttpClient {
    http: reqwest::Client,
    base_url: Url,
}

impl HttpClient {
    /// Client for the server at `base_url`. When `auth_token` is given it is
    /// sent as `Authorization: Bearer <token>` on every request.
    pub fn new(mut base_url: Url, auth_token: Option<&str>) -> Result<Self, ClientError> {
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        let mut headers = HeaderMap::new();
        if let Some(token) = auth_token {
            let mut value = HeaderValue::from_str(&format!("Bearer {token}"))
                .map_err(|e| ClientError::InvalidToken(e.to_string()))?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }

        let http = reqwest::Client::builder()
            .default_headers(headers)
            .pool_max_idle_per_host(10)
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ClientError::Http {
                endpoint: "client_init".into(),
                source: e,
            })?;
        Ok(Self { http, base_url })
    }

    /// Server base URL.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, ClientError> {
        self.base_url
            .join(path)
            .map_err(|e| ClientError::InvalidUrl {
                url: format!("{}{path}", self.base_url),
                reason: e.to_string(),
            })
    }

    async fn send(
        &self,
        endpoint: &Url,
        request: reqwest::RequestBuilder,
    ) -> Result<Response, ClientError> {
        request.send().await.map_err(|e| ClientError::Http {
            endpoint: endpoint.to_string(),
            source: e,
        })
    }

    async fn upload_inner<R>(&self, reader: R) -> Result<Fingerprint, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let endpoint = self.endpoint("blobs")?;
        let body = reqwest::Body::wrap_stream(ReaderStream::new(reader));
        let request = self
            .http
            .post(endpoint.clone())
            .header(CONTENT_TYPE, "application/octet-stream")
            .body(body);
        let resp = self.send(&endpoint, request).await?;
        match resp.status() {
            StatusCode::CREATED | StatusCode::OK => {}
            _ => return Err(api_error(&endpoint, resp).await),
        }
        let blob: BlobResponse = decode(&endpoint, resp).await?;
        Ok(Fingerprint::parse(&blob.hash)?)
    }

    async fn download_inner(
        &self,
        fingerprint: Fingerprint,
        cancel: &CancellationToken,
    ) -> Result<BlobReader, ClientError> {
        let endpoint = self.endpoint(&format!("blobs/{fingerprint}"))?;
        let resp = self.send(&endpoint, self.http.get(endpoint.clone())).await?;
        match resp.status() {
            StatusCode::OK => {}
            StatusCode::NOT_FOUND => return Err(ClientError::BlobNotFound(fingerprint.to_hex())),
            _ => return Err(api_error(&endpoint, resp).await),
        }
        let stream = resp.bytes_stream().map_err(io::Error::other);
        Ok(Box::pin(CancellableReader::new(
            StreamReader::new(stream),
            cancel.clone(),
        )))
    }

    async fn stat_inner(&self, fingerprint: Fingerprint) -> Result<BlobStat, ClientError> {
        let endpoint = self.endpoint(&format!("blobs/{fingerprint}/stat"))?;
        let resp = self.send(&endpoint, self.http.get(endpoint.clone())).await?;
        if resp.status() != StatusCode::OK {
            return Err(api_error(&endpoint, resp).await);
        }
        let blob: BlobResponse = decode(&endpoint, resp).await?;
        Ok(BlobStat {
            fingerprint,
            size: blob.size,
            exists: blob.exists.unwrap_or(false),
        })
    }

    async fn exists_inner(&self, fingerprint: Fingerprint) -> Result<bool, ClientError> {
        let endpoint = self.endpoint(&format!("blobs/{fingerprint}"))?;
        let resp = self.send(&endpoint, self.http.head(endpoint.clone())).await?;
        match resp.status() {
            StatusCode::OK => Ok(true),
            StatusCode::NOT_FOUND => Ok(false),
            _ => Err(api_error(&endpoint, resp).await),
        }
    }

    async fn get_catalog_inner(&self) -> Result<Vec<CatalogEntry>, ClientError> {
        let endpoint = self.endpoint("catalog")?;
        let resp = self.send(&endpoint, self.http.get(endpoint.clone())).await?;
        match resp.status() {
            StatusCode::OK => decode(&endpoint, resp).await,
            StatusCode::NOT_FOUND | StatusCode::METHOD_NOT_ALLOWED => {
                Err(ClientError::CatalogNotSupported)
            }
            _ => Err(api_error(&endpoint, resp).await),
        }
    }

    async fn get_entry_inner(&self, filepath: &str) -> Result<CatalogEntry, ClientError> {
        let endpoint = self.endpoint("catalog")?;
        let request = self
            .http
            .get(endpoint.clone())
            .query(&[("filepath", filepath)]);
        let resp = self.send(&endpoint, request).await?;
        match resp.status() {
            StatusCode::OK => decode(&endpoint, resp).await,
            StatusCode::NOT_FOUND => Err(ClientError::EntryNotFound(filepath.to_string())),
            StatusCode::METHOD_NOT_ALLOWED => Err(ClientError::CatalogNotSupported),
            _ => Err(api_error(&endpoint, resp).await),
        }
    }

    async fn add_entry_inner(&self, entry: CatalogEntry) -> Result<(), ClientError> {
        let endpoint = self.endpoint("catalog")?;
        let body = AddEntryRequest {
            filepath: entry.filepath,
            hash: entry.hash,
            size: entry.file_size,
            modified: entry.modification_time,
        };
        let request = self.http.post(endpoint.clone()).json(&body);
        let resp = self.send(&endpoint, request).await?;
        match resp.status() {
            StatusCode::CREATED => Ok(()),
            StatusCode::NOT_FOUND => Err(ClientError::BlobNotFound(body.hash)),
            StatusCode::METHOD_NOT_ALLOWED => Err(ClientError::CatalogNotSupported),
            _ => Err(api_error(&endpoint, resp).await),
        }
    }
}

impl BlobOperations for HttpClient {
    async fn upload<R>(&self, cancel: &CancellationToken, reader: R) -> Result<Fingerprint, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        cancellable(cancel, self.upload_inner(reader)).await
    }

    async fn download(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobReader, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        cancellable(cancel, self.download_inner(fingerprint, cancel)).await
    }

    async fn stat(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobStat, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        cancellable(cancel, self.stat_inner(fingerprint)).await
    }

    async fn exists(&self, cancel: &CancellationToken, hash: &str) -> Result<bool, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        cancellable(cancel, self.exists_inner(fingerprint)).await
    }
}

impl CatalogOperations for HttpClient {
    async fn get_catalog(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>, ClientError> {
        cancellable(cancel, self.get_catalog_inner()).await
    }

    async fn get_entry(&self, cancel: &CancellationToken, filepath: &str) -> Result<CatalogEntry, ClientError> {
        cancellable(cancel, self.get_entry_inner(filepath)).await
    }

    async fn add_entry(&self, cancel: &CancellationToken, entry: CatalogEntry) -> Result<(), ClientError> {
        cancellable(cancel, self.add_entry_inner(entry)).await
    }

    /// The server persists every upsert itself.
    async fn save_catalog(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        cancellable(cancel, async { Ok::<(), ClientError>(()) }).await
    }
}

async fn decode<T: serde::de::DeserializeOwned>(
    endpoint: &Url,
    resp: Response,
) -> Result<T, ClientError> {
    resp.json().await.map_err(|e| ClientError::Deserialization {
        endpoint: endpoint.to_string(),
        source: e,
    })
}

/// Build a [`ClientError::Api`] from a non-success response, reading at
/// most [`MAX_ERROR_BODY`] bytes of its body.
async fn api_error(endpoint: &Url, mut resp: Response) -> ClientError {
    let status = resp.status().as_u16();
    let mut buf = Vec::new();
    while buf.len() < MAX_ERROR_BODY {
        match resp.chunk().await {
            Ok(Some(chunk)) => buf.extend_from_slice(&chunk),
            Ok(None) | Err(_) => break,
        }
    }
    buf.truncate(MAX_ERROR_BODY);
    let message = match serde_json::from_slice::<ErrorBody>(&buf) {
        Ok(body) => body.message,
        Err(_) => String::from_utf8_lossy(&buf).trim().to_string(),
    };
    tracing::debug!(endpoint = %endpoint, status, %message, "server rejected request");
    ClientError::Api {
        endpoint: endpoint.to_string(),
        status,
        message,
    }
}

//! # cas-client — One API over Local and Remote Stores
//!
//! Front ends (the CLI, tests, embedding programs) talk to a CAS through
//! [`BlobOperations`] and [`CatalogOperations`]. [`Client`] implements both
//! by dispatching to one of two back ends:
//!
//! - [`LocalClient`] opens a repository directory directly.
//! - [`HttpClient`] speaks the server's HTTP protocol.
//!
//! [`ClientConfig::from_env`] picks the back end: `CAS_SERVER_URL` selects
//! remote mode, otherwise `CAS_DIR` (default `.cas`) is opened locally.
//!
//! Every operation takes a [`CancellationToken`]. A token that is already
//! cancelled fails the call with [`ClientError::Cancelled`] before any work
//! starts; cancelling during the call aborts it at the next await point.

pub mod config;
pub mod error;
pub mod local;
pub mod remote;

use std::future::Future;
use std::pin::Pin;

use cas_core::{BlobStat, CatalogEntry, Fingerprint};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

pub use config::ClientConfig;
pub use error::ClientError;
pub use local::LocalClient;
pub use remote::HttpClient;

/// Streaming handle returned by [`BlobOperations::download`].
pub type BlobReader = Pin<Box<dyn AsyncRead + Send>>;

/// Blob upload and retrieval.
#[allow(async_fn_in_trait)]
pub trait BlobOperations {
    /// Stream `reader` into the store and return its fingerprint.
    async fn upload<R>(&self, cancel: &CancellationToken, reader: R) -> Result<Fingerprint, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static;

    /// Open a blob for streaming reads.
    async fn download(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobReader, ClientError>;

    /// Size and presence of a blob. Absence is not an error.
    async fn stat(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobStat, ClientError>;

    /// Whether a blob is stored.
    async fn exists(&self, cancel: &CancellationToken, hash: &str) -> Result<bool, ClientError>;
}

/// Catalog access.
#[allow(async_fn_in_trait)]
pub trait CatalogOperations {
    /// Every entry, ascending by path.
    async fn get_catalog(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>, ClientError>;

    /// Entry for one path.
    async fn get_entry(&self, cancel: &CancellationToken, filepath: &str) -> Result<CatalogEntry, ClientError>;

    /// Insert or replace the entry for `entry.filepath`.
    async fn add_entry(&self, cancel: &CancellationToken, entry: CatalogEntry) -> Result<(), ClientError>;

    /// Persist pending catalog changes.
    async fn save_catalog(&self, cancel: &CancellationToken) -> Result<(), ClientError>;
}

/// A client bound to one back end.
#[derive(Debug, Clone)]
pub enum Client {
    /// Direct repository access.
    Local(LocalClient),
    /// HTTP access to a running server.
    Remote(HttpClient),
}

impl Client {
    /// Build the back end described by `config`.
    pub async fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        match &config.server_url {
            Some(url) => {
                let token = config.auth_token.as_ref().map(|t| t.as_str());
                tracing::debug!(server = %url, "using remote CAS");
                Ok(Self::Remote(HttpClient::new(url.clone(), token)?))
            }
            None => {
                tracing::debug!(dir = %config.cas_dir.display(), "using local CAS");
                Ok(Self::Local(LocalClient::open(&config.cas_dir).await?))
            }
        }
    }

    /// [`ClientConfig::from_env`] followed by [`Client::new`].
    pub async fn from_env() -> Result<Self, ClientError> {
        Self::new(&ClientConfig::from_env()?).await
    }

    /// True when talking to a server.
    pub fn is_remote(&self) -> bool {
        matches!(self, Self::Remote(_))
    }

    /// Release back-end resources.
    pub async fn close(&self) {
        if let Self::Local(c) = self {
            c.close().await;
        }
    }
}

impl BlobOperations for Client {
    async fn upload<R>(&self, cancel: &CancellationToken, reader: R) -> Result<Fingerprint, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        match self {
            Self::Local(c) => c.upload(cancel, reader).await,
            Self::Remote(c) => c.upload(cancel, reader).await,
        }
    }

    async fn download(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobReader, ClientError> {
        match self {
            Self::Local(c) => c.download(cancel, hash).await,
            Self::Remote(c) => c.download(cancel, hash).await,
        }
    }

    async fn stat(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobStat, ClientError> {
        match self {
            Self::Local(c) => c.stat(cancel, hash).await,
            Self::Remote(c) => c.stat(cancel, hash).await,
        }
    }

    async fn exists(&self, cancel: &CancellationToken, hash: &str) -> Result<bool, ClientError> {
        match self {
            Self::Local(c) => c.exists(cancel, hash).await,
            Self::Remote(c) => c.exists(cancel, hash).await,
        }
    }
}

impl CatalogOperations for Client {
    async fn get_catalog(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>, ClientError> {
        match self {
            Self::Local(c) => c.get_catalog(cancel).await,
            Self::Remote(c) => c.get_catalog(cancel).await,
        }
    }

    async fn get_entry(&self, cancel: &CancellationToken, filepath: &str) -> Result<CatalogEntry, ClientError> {
        match self {
            Self::Local(c) => c.get_entry(cancel, filepath).await,
            Self::Remote(c) => c.get_entry(cancel, filepath).await,
        }
    }

    async fn add_entry(&self, cancel: &CancellationToken, entry: CatalogEntry) -> Result<(), ClientError> {
        match self {
            Self::Local(c) => c.add_entry(cancel, entry).await,
            Self::Remote(c) => c.add_entry(cancel, entry).await,
        }
    }

    async fn save_catalog(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        match self {
            Self::Local(c) => c.save_catalog(cancel).await,
            Self::Remote(c) => c.save_catalog(cancel).await,
        }
    }
}

/// Run `fut` unless `cancel` fires first.
pub(crate) async fn cancellable<T, E, F>(cancel: &CancellationToken, fut: F) -> Result<T, ClientError>
where
    F: Future<Output = Result<T, E>>,
    ClientError: From<E>,
{
    if cancel.is_cancelled() {
        return Err(ClientError::Cancelled);
    }
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ClientError::Cancelled),
        res = fut => res.map_err(ClientError::from),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn cancellable_short_circuits() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let res: Result<(), _> =
            cancellable(&cancel, async { Ok::<(), ClientError>(()) }).await;
        assert!(matches!(res, Err(ClientError::Cancelled)));
    }

    #[tokio::test]
    async fn cancellable_passes_result_through() {
        let cancel = CancellationToken::new();
        let res = cancellable(&cancel, async { Ok::<u8, ClientError>(7) }).await;
        assert_eq!(res.unwrap(), 7);
    }

    #[tokio::test]
    async fn new_without_server_opens_local_dir() {
        let tmp = tempfile::tempdir().unwrap();
        cas_core::Repository::init(tmp.path()).unwrap();
        let config = ClientConfig::local(tmp.path().join(".cas"));
        let client = Client::new(&config).await.unwrap();
        assert!(!client.is_remote());
        client.close().await;
    }

    #[tokio::test]
    async fn new_with_server_is_remote() {
        let url = url::Url::parse("http://127.0.0.1:9").unwrap();
        let client = Client::new(&ClientConfig::remote(url, None)).await.unwrap();
        assert!(client.is_remote());
    }
}

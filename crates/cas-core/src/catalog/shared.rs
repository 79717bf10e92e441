use std::sync::Arc;

use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::RwLock;

use super::{Catalog, CatalogBackend, CatalogEntry};
use crate::error::CasError;
use crate::repo::Repository;

/// A [`Catalog`] behind a reader-writer lock.
///
/// Reads (`get_entry`, `list_entries`, `write_to`) share the lock; upserts,
/// `save`, and `load` take it exclusively. The lock is async so it may be
/// held across the SQLite round trip.
#[derive(Debug, Clone)]
pub struct SharedCatalog {
    inner: Arc<RwLock<Catalog>>,
}

impl SharedCatalog {
    /// Wrap an opened catalog.
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: Arc::new(RwLock::new(catalog)),
        }
    }

    /// Open the repository's catalog and load its persisted state.
    pub async fn open(repo: &Repository) -> Result<Self, CasError> {
        let mut catalog = Catalog::open(repo).await?;
        catalog.load().await?;
        Ok(Self::new(catalog))
    }

    /// Back end in use.
    pub async fn backend(&self) -> CatalogBackend {
        self.inner.read().await.backend()
    }

    /// Upsert under the writer lock.
    pub async fn add_entry(&self, entry: CatalogEntry) -> Result<(), CasError> {
        self.inner.write().await.add_entry(entry).await
    }

    /// Look up under the reader lock.
    pub async fn get_entry(&self, filepath: &str) -> Result<CatalogEntry, CasError> {
        self.inner.read().await.get_entry(filepath).await
    }

    /// Sorted listing under the reader lock.
    pub async fn list_entries(&self) -> Result<Vec<CatalogEntry>, CasError> {
        self.inner.read().await.list_entries().await
    }

    /// Persist under the writer lock.
    pub async fn save(&self) -> Result<(), CasError> {
        self.inner.write().await.save().await
    }

    /// Reload under the writer lock.
    pub async fn load(&self) -> Result<(), CasError> {
        self.inner.write().await.load().await
    }

    /// Upsert a JSON document under the writer lock.
    pub async fn read_from<R>(&self, reader: &mut R) -> Result<usize, CasError>
    where
        R: AsyncRead + Unpin + ?Sized,
    {
        self.inner.write().await.read_from(reader).await
    }

    /// Export as JSON under the reader lock.
    pub async fn write_to<W>(&self, writer: &mut W) -> Result<u64, CasError>
    where
        W: AsyncWrite + Unpin + ?Sized,
    {
        self.inner.read().await.write_to(writer).await
    }

    /// Release back-end resources.
    pub async fn close(&self) {
        self.inner.read().await.close().await;
    }
}

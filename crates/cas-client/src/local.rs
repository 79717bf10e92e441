//! Direct repository access.

use std::path::Path;

use cas_core::{
    BlobStat, BlobStore, CancellableReader, CatalogEntry, Fingerprint, Repository, SharedCatalog,
};
use tokio::io::AsyncRead;
use tokio_util::sync::CancellationToken;

use crate::error::ClientError;
use crate::{cancellable, BlobOperations, BlobReader, CatalogOperations};

/// Client over a repository on the local filesystem.
///
/// Catalog reads share a reader lock and writes take the writer lock, so
/// an [`add_entry`](CatalogOperations::add_entry) is visible to the next
/// [`get_entry`](CatalogOperations::get_entry) from any clone of this client.
#[derive(Debug, Clone)]
pub struct LocalClient {
    blobs: BlobStore,
    catalog: SharedCatalog,
}

impl LocalClient {
    /// Open the `.cas` directory at `cas_dir` and load its catalog.
    pub async fn open(cas_dir: impl AsRef<Path>) -> Result<Self, ClientError> {
        let repo = Repository::at(cas_dir)?;
        let catalog = SharedCatalog::open(&repo).await?;
        Ok(Self {
            blobs: repo.blob_store(),
            catalog,
        })
    }

    /// Release the catalog back end.
    pub async fn close(&self) {
        self.catalog.close().await;
    }
}

impl BlobOperations for LocalClient {
    async fn upload<R>(&self, cancel: &CancellationToken, reader: R) -> Result<Fingerprint, ClientError>
    where
        R: AsyncRead + Send + Unpin + 'static,
    {
        let ingested = cancellable(cancel, self.blobs.ingest(reader, cancel)).await?;
        Ok(ingested.fingerprint)
    }

    async fn download(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobReader, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        let file = cancellable(cancel, self.blobs.open(&fingerprint)).await?;
        Ok(Box::pin(CancellableReader::new(file, cancel.clone())))
    }

    async fn stat(&self, cancel: &CancellationToken, hash: &str) -> Result<BlobStat, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        cancellable(cancel, self.blobs.stat(&fingerprint)).await
    }

    async fn exists(&self, cancel: &CancellationToken, hash: &str) -> Result<bool, ClientError> {
        let fingerprint = Fingerprint::parse(hash)?;
        cancellable(cancel, self.blobs.exists(&fingerprint)).await
    }
}

impl CatalogOperations for LocalClient {
    async fn get_catalog(&self, cancel: &CancellationToken) -> Result<Vec<CatalogEntry>, ClientError> {
        cancellable(cancel, self.catalog.list_entries()).await
    }

    async fn get_entry(&self, cancel: &CancellationToken, filepath: &str) -> Result<CatalogEntry, ClientError> {
        cancellable(cancel, self.catalog.get_entry(filepath)).await
    }

    async fn add_entry(&self, cancel: &CancellationToken, entry: CatalogEntry) -> Result<(), ClientError> {
        cancellable(cancel, self.catalog.add_entry(entry)).await
    }

    async fn save_catalog(&self, cancel: &CancellationToken) -> Result<(), ClientError> {
        cancellable(cancel, self.catalog.save()).await
    }
}

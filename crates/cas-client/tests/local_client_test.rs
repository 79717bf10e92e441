//! LocalClient against a scratch repository.

use cas_client::{BlobOperations, CatalogOperations, Client, ClientConfig, ClientError, LocalClient};
use cas_core::{CatalogEntry, Fingerprint, Repository};
use chrono::Utc;
use tokio::io::AsyncReadExt;
use tokio_util::sync::CancellationToken;

const HELLO: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

async fn client() -> (tempfile::TempDir, LocalClient) {
    let tmp = tempfile::tempdir().unwrap();
    let repo = Repository::init(tmp.path()).unwrap();
    let client = LocalClient::open(repo.cas_dir()).await.unwrap();
    (tmp, client)
}

#[tokio::test]
async fn upload_download_round_trip() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();

    let fp = client.upload(&cancel, &b"hello"[..]).await.unwrap();
    assert_eq!(fp.to_hex(), HELLO);

    let mut reader = client.download(&cancel, HELLO).await.unwrap();
    let mut body = Vec::new();
    reader.read_to_end(&mut body).await.unwrap();
    assert_eq!(body, b"hello");
}

#[tokio::test]
async fn exists_checks_storage_directory() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();
    assert!(!client.exists(&cancel, HELLO).await.unwrap());
    client.upload(&cancel, &b"hello"[..]).await.unwrap();
    assert!(client.exists(&cancel, HELLO).await.unwrap());
}

#[tokio::test]
async fn stat_reports_size_and_absence() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();
    client.upload(&cancel, &b"hello"[..]).await.unwrap();

    let stat = client.stat(&cancel, HELLO).await.unwrap();
    assert!(stat.exists);
    assert_eq!(stat.size, 5);

    let missing = Fingerprint::of(b"missing").to_hex();
    let stat = client.stat(&cancel, &missing).await.unwrap();
    assert!(!stat.exists);
}

#[tokio::test]
async fn invalid_hash_is_rejected_before_io() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();
    for bad in ["", "abc", &HELLO.to_uppercase(), "../../etc/passwd"] {
        assert!(matches!(
            client.download(&cancel, bad).await,
            Err(ClientError::InvalidHash(_))
        ));
        assert!(matches!(
            client.exists(&cancel, bad).await,
            Err(ClientError::InvalidHash(_))
        ));
    }
}

#[tokio::test]
async fn download_missing_blob() {
    let (_tmp, client) = client().await;
    let missing = Fingerprint::of(b"missing").to_hex();
    assert!(matches!(
        client.download(&CancellationToken::new(), &missing).await,
        Err(ClientError::BlobNotFound(h)) if h == missing
    ));
}

#[tokio::test]
async fn catalog_operations_and_persistence() {
    let (tmp, client) = client().await;
    let cancel = CancellationToken::new();
    let fp = client.upload(&cancel, &b"hello"[..]).await.unwrap();

    client
        .add_entry(&cancel, CatalogEntry::new("greeting.txt", &fp, 5, Utc::now()))
        .await
        .unwrap();
    assert_eq!(client.get_entry(&cancel, "greeting.txt").await.unwrap().hash, HELLO);
    assert!(matches!(
        client.get_entry(&cancel, "nope.txt").await,
        Err(ClientError::EntryNotFound(_))
    ));
    client.save_catalog(&cancel).await.unwrap();
    client.close().await;

    let reopened = LocalClient::open(tmp.path().join(".cas")).await.unwrap();
    let entries = reopened.get_catalog(&cancel).await.unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].filepath, "greeting.txt");
}

#[tokio::test]
async fn cancelled_token_fails_every_operation() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();
    cancel.cancel();
    assert!(matches!(
        client.upload(&cancel, &b"hello"[..]).await,
        Err(ClientError::Cancelled)
    ));
    assert!(matches!(
        client.get_catalog(&cancel).await,
        Err(ClientError::Cancelled)
    ));
    assert!(matches!(
        client.save_catalog(&cancel).await,
        Err(ClientError::Cancelled)
    ));
}

#[tokio::test]
async fn cancel_mid_download_fails_the_read() {
    let (_tmp, client) = client().await;
    let cancel = CancellationToken::new();
    let payload = vec![0xabu8; 4 * 1024 * 1024];
    let fp = client.upload(&cancel, std::io::Cursor::new(payload)).await.unwrap();

    let mut reader = client.download(&cancel, &fp.to_hex()).await.unwrap();
    let mut head = [0u8; 1024];
    reader.read_exact(&mut head).await.unwrap();
    cancel.cancel();

    let mut rest = Vec::new();
    let err = reader.read_to_end(&mut rest).await.unwrap_err();
    assert_eq!(err.kind(), std::io::ErrorKind::Interrupted);
}

#[tokio::test]
async fn open_without_repository_fails() {
    let tmp = tempfile::tempdir().unwrap();
    let err = Client::new(&ClientConfig::local(tmp.path().join(".cas")))
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Store(_)));
}

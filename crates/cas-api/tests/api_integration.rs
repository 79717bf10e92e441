//! Router-level tests: every request goes through the full middleware
//! pipeline via `tower::ServiceExt::oneshot`.

use std::io;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{header, Request, StatusCode};
use axum::response::Response;
use axum::Router;
use cas_api::{Server, ServerConfig};
use cas_core::{Fingerprint, Repository};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

const HELLO_HASH: &str = "2cf24dba5fb0a30e26e83b2ac5b9e29e1b161e5c1fa7425e73043362938b9824";

async fn setup(config: ServerConfig) -> (TempDir, Router) {
    let tmp = tempfile::tempdir().unwrap();
    Repository::init(tmp.path()).unwrap();
    let config = ServerConfig {
        repo_path: tmp.path().to_path_buf(),
        ..config
    };
    let server = Server::open(config).await.unwrap();
    let router = server.router();
    (tmp, router)
}

async fn app() -> (TempDir, Router) {
    setup(ServerConfig::default()).await
}

async fn send(app: &Router, request: Request<Body>) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

fn post(uri: &str, body: impl Into<Body>) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .body(body.into())
        .unwrap()
}

async fn body_bytes(response: Response) -> Vec<u8> {
    response.into_body().collect().await.unwrap().to_bytes().to_vec()
}

async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}

async fn upload(app: &Router, content: &'static [u8]) -> String {
    let response = send(app, post("/blobs", content)).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    body_json(response).await["hash"].as_str().unwrap().to_string()
}

fn entry_body(filepath: &str, hash: &str) -> String {
    json!({
        "filepath": filepath,
        "hash": hash,
        "size": 5,
        "modified": "2024-05-01T12:00:00.123456789Z",
    })
    .to_string()
}

#[tokio::test]
async fn health_reports_counts() {
    let (_tmp, app) = app().await;
    let response = send(&app, get("/health")).await;
    assert_eq!(response.status(), StatusCode::OK);
    let body = body_json(response).await;
    assert_eq!(body, json!({"status": "ok", "total_files": 0, "unique_blobs": 0}));
}

#[tokio::test]
async fn upload_then_download() {
    let (tmp, app) = app().await;

    let response = send(&app, post("/blobs", "hello")).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let body = body_json(response).await;
    assert_eq!(body, json!({"hash": HELLO_HASH, "size": 5}));

    let stored = tmp
        .path()
        .join(".cas/storage/2c/f2")
        .join(HELLO_HASH);
    assert!(stored.is_file());

    let response = send(&app, get(&format!("/blobs/{HELLO_HASH}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers().clone();
    assert_eq!(headers[header::CONTENT_TYPE], "application/octet-stream");
    assert_eq!(headers[header::CONTENT_LENGTH], "5");
    assert_eq!(headers[header::ETAG], format!("\"{HELLO_HASH}\"").as_str());
    assert_eq!(
        headers[header::CACHE_CONTROL],
        "public, max-age=31536000, immutable"
    );
    assert_eq!(body_bytes(response).await, b"hello");
}

#[tokio::test]
async fn duplicate_upload_returns_same_hash() {
    let (_tmp, app) = app().await;
    let first = upload(&app, b"same bytes").await;
    let second = upload(&app, b"same bytes").await;
    assert_eq!(first, second);
    assert_eq!(first, Fingerprint::of(b"same bytes").to_hex());
}

#[tokio::test]
async fn head_has_headers_and_no_body() {
    let (_tmp, app) = app().await;
    upload(&app, b"hello").await;

    let request = Request::builder()
        .method("HEAD")
        .uri(format!("/blobs/{HELLO_HASH}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[header::CONTENT_LENGTH], "5");
    assert!(body_bytes(response).await.is_empty());

    let request = Request::builder()
        .method("HEAD")
        .uri(format!("/blobs/{}", "0".repeat(64)))
        .body(Body::empty())
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn missing_blob_is_404() {
    let (_tmp, app) = app().await;
    let response = send(&app, get(&format!("/blobs/{}", "a".repeat(64)))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "Not Found", "code": 404, "message": "Blob not found"})
    );
}

#[tokio::test]
async fn invalid_hash_is_400() {
    let (_tmp, app) = app().await;
    for uri in [
        "/blobs/xyz".to_string(),
        format!("/blobs/{}", "A".repeat(64)),
        "/blobs/xyz/stat".to_string(),
    ] {
        let response = send(&app, get(&uri)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let body = body_json(response).await;
        assert_eq!(
            body["message"],
            "Invalid hash format: must be 64 hex characters"
        );
    }
}

#[tokio::test]
async fn stat_reports_presence() {
    let (_tmp, app) = app().await;
    let missing = "b".repeat(64);
    let response = send(&app, get(&format!("/blobs/{missing}/stat"))).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({"hash": missing, "size": 0, "exists": false})
    );

    upload(&app, b"hello").await;
    let response = send(&app, get(&format!("/blobs/{HELLO_HASH}/stat"))).await;
    assert_eq!(
        body_json(response).await,
        json!({"hash": HELLO_HASH, "size": 5, "exists": true})
    );
}

#[tokio::test]
async fn catalog_entry_requires_uploaded_blob() {
    let (tmp, app) = app().await;

    let response = send(&app, post("/catalog", entry_body("a.txt", HELLO_HASH))).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(
        body_json(response).await["message"],
        "Blob 2cf24dba not found - upload blob first"
    );

    upload(&app, b"hello").await;
    let response = send(&app, post("/catalog", entry_body("a.txt", HELLO_HASH))).await;
    assert_eq!(response.status(), StatusCode::CREATED);
    let entry = body_json(response).await;
    assert_eq!(entry["filepath"], "a.txt");
    assert_eq!(entry["hash"], HELLO_HASH);
    assert_eq!(entry["file_size"], 5);
    assert_eq!(entry["modification_time"], "2024-05-01T12:00:00.123456789Z");

    let saved = std::fs::read_to_string(tmp.path().join(".cas/catalog.json")).unwrap();
    assert!(saved.contains("a.txt"));

    let response = send(&app, get("/catalog?filepath=a.txt")).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["hash"], HELLO_HASH);

    let response = send(&app, get("/catalog")).await;
    let list = body_json(response).await;
    assert_eq!(list.as_array().unwrap().len(), 1);

    let response = send(&app, get("/health")).await;
    assert_eq!(body_json(response).await["total_files"], 1);
}

#[tokio::test]
async fn catalog_lookup_miss_is_404() {
    let (_tmp, app) = app().await;
    let response = send(&app, get("/catalog?filepath=ghost.txt")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["message"], "Entry not found");
}

#[tokio::test]
async fn catalog_post_validation() {
    let (_tmp, app) = app().await;
    upload(&app, b"hello").await;

    let cases = [
        ("{oops".to_string(), "Invalid JSON"),
        (json!({"hash": HELLO_HASH}).to_string(), "filepath and hash are required"),
        (
            entry_body("a.txt", "not-a-hash"),
            "Invalid hash format: must be 64 hex characters",
        ),
        (entry_body("../etc/passwd", HELLO_HASH), "Path traversal not allowed"),
    ];
    for (body, message) in cases {
        let response = send(&app, post("/catalog", body)).await;
        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{message}");
        let err = body_json(response).await;
        assert_eq!(err["code"], 400);
        assert_eq!(err["error"], "Bad Request");
        assert_eq!(err["message"], message);
    }
}

#[tokio::test]
async fn auth_guards_writes_only() {
    let config = ServerConfig::default().with_auth_token(Some("s3cret".into()));
    let (_tmp, app) = setup(config).await;

    let response = send(&app, post("/blobs", "hello")).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        body_json(response).await["message"],
        "Missing Authorization header"
    );

    let request = Request::builder()
        .method("POST")
        .uri("/blobs")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::from("hello"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(body_json(response).await["message"], "Invalid token");

    let request = Request::builder()
        .method("POST")
        .uri("/blobs")
        .header(header::AUTHORIZATION, "Bearer s3cret")
        .body(Body::from("hello"))
        .unwrap();
    assert_eq!(send(&app, request).await.status(), StatusCode::CREATED);

    let response = send(&app, get(&format!("/blobs/{HELLO_HASH}"))).await;
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn preflight_bypasses_auth() {
    let config = ServerConfig::default().with_auth_token(Some("s3cret".into()));
    let (_tmp, app) = setup(config).await;

    let request = Request::builder()
        .method("OPTIONS")
        .uri("/blobs")
        .header(header::ORIGIN, "https://ui.example")
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);
    let headers = response.headers();
    assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
    assert_eq!(
        headers[header::ACCESS_CONTROL_ALLOW_METHODS],
        "GET, POST, HEAD, OPTIONS"
    );
    assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
}

#[tokio::test]
async fn cors_headers_on_rejected_requests() {
    let config = ServerConfig {
        cors_origins: vec!["https://ui.example".into()],
        ..ServerConfig::default()
    }
    .with_auth_token(Some("s3cret".into()));
    let (_tmp, app) = setup(config).await;

    let request = Request::builder()
        .method("POST")
        .uri("/blobs")
        .header(header::ORIGIN, "https://ui.example")
        .body(Body::from("x"))
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(
        response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
        "https://ui.example"
    );
}

#[tokio::test]
async fn unknown_routes_and_methods_are_json_404() {
    let (_tmp, app) = app().await;

    let response = send(&app, get("/nope")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["code"], 404);

    let response = send(&app, get("/blobs")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, post("/health", "")).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let request = Request::builder()
        .method("DELETE")
        .uri(format!("/blobs/{HELLO_HASH}"))
        .body(Body::empty())
        .unwrap();
    let response = send(&app, request).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert_eq!(body_json(response).await["error"], "Not Found");
}

#[tokio::test]
async fn stalled_upload_times_out_with_json_body() {
    let config = ServerConfig {
        read_timeout: Duration::from_millis(100),
        ..ServerConfig::default()
    };
    let (tmp, app) = setup(config).await;

    let first = futures_util::stream::once(async { Ok::<_, io::Error>(Bytes::from_static(b"partial")) });
    let stalled = futures_util::StreamExt::chain(first, futures_util::stream::pending());
    let response = send(&app, post("/blobs", Body::from_stream(stalled))).await;

    assert_eq!(response.status(), StatusCode::REQUEST_TIMEOUT);
    let body = body_json(response).await;
    assert_eq!(
        body,
        json!({"error": "Request Timeout", "code": 408, "message": "Request timed out"})
    );

    let leftovers: Vec<_> = std::fs::read_dir(tmp.path().join(".cas/storage"))
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.starts_with("tmp-"))
        .collect();
    assert!(leftovers.is_empty(), "temp files left behind: {leftovers:?}");
}

//! # CORS
//!
//! Origin allow-list with preflight handling. A request whose `Origin`
//! matches a configured entry (or any origin, when `*` is configured) gets
//! the CORS headers; every `OPTIONS` request is answered with 204 here and
//! never reaches auth or the router.

use axum::extract::Request;
use axum::http::{header, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

const ALLOW_METHODS: &str = "GET, POST, HEAD, OPTIONS";
const ALLOW_HEADERS: &str = "Content-Type, Authorization";
const MAX_AGE: &str = "3600";

/// Allowed origins, injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct CorsConfig {
    origins: Vec<String>,
}

impl CorsConfig {
    /// `origins` may contain `*`.
    pub fn new(origins: Vec<String>) -> Self {
        Self { origins }
    }

    /// The configured entry matching `origin`, echoed back as
    /// `Access-Control-Allow-Origin`. A request without `Origin` matches
    /// only `*`.
    pub fn allowed_origin(&self, origin: Option<&str>) -> Option<&str> {
        self.origins
            .iter()
            .map(String::as_str)
            .find(|allowed| *allowed == "*" || Some(*allowed) == origin)
    }
}

/// Apply CORS headers and short-circuit preflight requests.
pub async fn cors_middleware(request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<CorsConfig>()
        .cloned()
        .unwrap_or_default();
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|v| v.to_str().ok());
    let allow = config
        .allowed_origin(origin)
        .and_then(|o| HeaderValue::from_str(o).ok());

    let mut response = if request.method() == Method::OPTIONS {
        StatusCode::NO_CONTENT.into_response()
    } else {
        next.run(request).await
    };

    if let Some(allow) = allow {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, allow);
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static(ALLOW_METHODS),
        );
        headers.insert(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static(ALLOW_HEADERS),
        );
        headers.insert(header::ACCESS_CONTROL_MAX_AGE, HeaderValue::from_static(MAX_AGE));
    }
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::middleware::from_fn;
    use axum::routing::get;
    use axum::Router;
    use tower::ServiceExt;

    fn test_app(origins: &[&str]) -> Router {
        let config = CorsConfig::new(origins.iter().map(|s| s.to_string()).collect());
        Router::new()
            .route("/test", get(|| async { "ok" }))
            .layer(from_fn(cors_middleware))
            .layer(axum::Extension(config))
    }

    fn request(method: &str, origin: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().method(method).uri("/test");
        if let Some(origin) = origin {
            builder = builder.header("Origin", origin);
        }
        builder.body(Body::empty()).unwrap()
    }

    #[test]
    fn wildcard_and_exact_matching() {
        let cfg = CorsConfig::new(vec!["https://a.example".into()]);
        assert_eq!(cfg.allowed_origin(Some("https://a.example")), Some("https://a.example"));
        assert_eq!(cfg.allowed_origin(Some("https://b.example")), None);
        assert_eq!(cfg.allowed_origin(None), None);

        let cfg = CorsConfig::new(vec!["*".into()]);
        assert_eq!(cfg.allowed_origin(Some("https://b.example")), Some("*"));
        assert_eq!(cfg.allowed_origin(None), Some("*"));
    }

    #[tokio::test]
    async fn preflight_is_no_content() {
        let response = test_app(&["*"])
            .oneshot(request("OPTIONS", Some("https://x.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NO_CONTENT);
        let headers = response.headers();
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_ORIGIN], "*");
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_METHODS], ALLOW_METHODS);
        assert_eq!(headers[header::ACCESS_CONTROL_ALLOW_HEADERS], ALLOW_HEADERS);
        assert_eq!(headers[header::ACCESS_CONTROL_MAX_AGE], "3600");
    }

    #[tokio::test]
    async fn exact_origin_is_echoed() {
        let response = test_app(&["https://a.example"])
            .oneshot(request("GET", Some("https://a.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()[header::ACCESS_CONTROL_ALLOW_ORIGIN],
            "https://a.example"
        );
    }

    #[tokio::test]
    async fn unknown_origin_gets_no_headers() {
        let response = test_app(&["https://a.example"])
            .oneshot(request("GET", Some("https://evil.example")))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response
            .headers()
            .get(header::ACCESS_CONTROL_ALLOW_ORIGIN)
            .is_none());
    }
}

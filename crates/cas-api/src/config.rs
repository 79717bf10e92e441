//! Server configuration.
//!
//! The binary binds these fields to `--port`/`CAS_PORT`, `--host`/`CAS_HOST`,
//! `--auth-token`/`CAS_AUTH_TOKEN`, and `--cors-origins`/`CAS_CORS_ORIGINS`.

use std::path::PathBuf;
use std::time::Duration;

use zeroize::Zeroizing;

/// Default listen port.
pub const DEFAULT_PORT: u16 = 8080;
/// Default listen address.
pub const DEFAULT_HOST: &str = "0.0.0.0";
/// Default read and write timeout.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// How long in-flight requests may drain after shutdown is requested.
pub const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

/// Settings for [`Server`](crate::Server).
///
/// Custom `Debug` implementation redacts the `auth_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub host: String,
    /// Listen port.
    pub port: u16,
    /// Bearer token required for non-read requests; `None` disables auth.
    pub auth_token: Option<Zeroizing<String>>,
    /// Allowed CORS origins; `*` allows any.
    pub cors_origins: Vec<String>,
    /// Bound on receiving a request and producing response headers.
    pub read_timeout: Duration,
    /// Bound on streaming a blob response body.
    pub write_timeout: Duration,
    /// Working directory containing `.cas/`.
    pub repo_path: PathBuf,
}

impl std::fmt::Debug for ServerConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServerConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("cors_origins", &self.cors_origins)
            .field("read_timeout", &self.read_timeout)
            .field("write_timeout", &self.write_timeout)
            .field("repo_path", &self.repo_path)
            .finish()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            auth_token: None,
            cors_origins: vec!["*".to_string()],
            read_timeout: DEFAULT_TIMEOUT,
            write_timeout: DEFAULT_TIMEOUT,
            repo_path: PathBuf::from("."),
        }
    }
}

impl ServerConfig {
    /// `host:port` for binding.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Set the auth token; an empty string disables auth.
    pub fn with_auth_token(mut self, token: Option<String>) -> Self {
        self.auth_token = token.filter(|t| !t.is_empty()).map(Zeroizing::new);
        self
    }
}

/// Split a comma-separated origin list, trimming whitespace and dropping
/// empty items.
pub fn parse_cors_origins(csv: &str) -> Vec<String> {
    csv.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = ServerConfig::default();
        assert_eq!(cfg.bind_addr(), "0.0.0.0:8080");
        assert_eq!(cfg.cors_origins, ["*"]);
        assert_eq!(cfg.read_timeout, Duration::from_secs(30));
        assert_eq!(cfg.write_timeout, Duration::from_secs(30));
        assert!(cfg.auth_token.is_none());
    }

    #[test]
    fn cors_origins_are_trimmed() {
        assert_eq!(
            parse_cors_origins(" https://a.example , https://b.example,,"),
            ["https://a.example", "https://b.example"]
        );
        assert_eq!(parse_cors_origins("*"), ["*"]);
        assert!(parse_cors_origins("").is_empty());
    }

    #[test]
    fn empty_token_disables_auth() {
        let cfg = ServerConfig::default().with_auth_token(Some(String::new()));
        assert!(cfg.auth_token.is_none());
        let cfg = ServerConfig::default().with_auth_token(Some("t".into()));
        assert!(cfg.auth_token.is_some());
    }

    #[test]
    fn debug_redacts_token() {
        let cfg = ServerConfig::default().with_auth_token(Some("hunter2".into()));
        let debug = format!("{cfg:?}");
        assert!(!debug.contains("hunter2"));
    }
}

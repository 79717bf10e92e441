//! Client configuration.
//!
//! `CAS_SERVER_URL` switches the client to remote mode; `CAS_AUTH_TOKEN`
//! is sent as a bearer token on every remote request; `CAS_DIR` names the
//! local `.cas` directory when no server is configured. Empty values count
//! as unset.

use std::path::PathBuf;

use url::Url;
use zeroize::Zeroizing;

use crate::error::ClientError;

/// Default local repository directory.
pub const DEFAULT_CAS_DIR: &str = ".cas";

/// Where the client should send its operations.
///
/// Custom `Debug` implementation redacts the `auth_token` field
/// to prevent credential leakage in log output.
#[derive(Clone)]
pub struct ClientConfig {
    /// Remote server base URL; `None` means local mode.
    pub server_url: Option<Url>,
    /// Bearer token for remote writes.
    pub auth_token: Option<Zeroizing<String>>,
    /// Local `.cas` directory.
    pub cas_dir: PathBuf,
}

impl std::fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientConfig")
            .field("server_url", &self.server_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("cas_dir", &self.cas_dir)
            .finish()
    }
}

impl ClientConfig {
    /// Local mode against `cas_dir`.
    pub fn local(cas_dir: impl Into<PathBuf>) -> Self {
        Self {
            server_url: None,
            auth_token: None,
            cas_dir: cas_dir.into(),
        }
    }

    /// Remote mode against `server_url`.
    pub fn remote(server_url: Url, auth_token: Option<String>) -> Self {
        Self {
            server_url: Some(server_url),
            auth_token: auth_token.map(Zeroizing::new),
            cas_dir: PathBuf::from(DEFAULT_CAS_DIR),
        }
    }

    /// Load from `CAS_SERVER_URL`, `CAS_AUTH_TOKEN`, and `CAS_DIR`.
    pub fn from_env() -> Result<Self, ClientError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ClientError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        let server_url = match get("CAS_SERVER_URL") {
            Some(raw) => Some(Url::parse(&raw).map_err(|e| ClientError::InvalidUrl {
                url: raw.clone(),
                reason: e.to_string(),
            })?),
            None => None,
        };
        Ok(Self {
            server_url,
            auth_token: get("CAS_AUTH_TOKEN").map(Zeroizing::new),
            cas_dir: get("CAS_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_CAS_DIR)),
        })
    }
}

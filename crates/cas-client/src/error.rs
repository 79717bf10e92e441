//! Client error type.

use cas_core::CasError;
use thiserror::Error;

/// Errors surfaced by [`BlobOperations`](crate::BlobOperations) and
/// [`CatalogOperations`](crate::CatalogOperations), whichever back end
/// served the call.
#[derive(Error, Debug)]
pub enum ClientError {
    /// Hash string is not 64 lowercase hex characters.
    #[error("invalid hash format {0:?}: must be 64 hex characters")]
    InvalidHash(String),

    /// No such blob.
    #[error("blob not found: {0}")]
    BlobNotFound(String),

    /// No catalog entry for this path.
    #[error("entry not found: {0}")]
    EntryNotFound(String),

    /// The back end does not offer catalog operations.
    #[error("catalog operations are not supported by this backend")]
    CatalogNotSupported,

    /// The caller's cancellation token fired.
    #[error("operation cancelled")]
    Cancelled,

    /// The request never produced a response.
    #[error("HTTP request to {endpoint} failed: {source}")]
    Http {
        /// URL that was requested.
        endpoint: String,
        /// Transport failure.
        #[source]
        source: reqwest::Error,
    },

    /// The server answered with an unexpected status.
    #[error("server returned {status} for {endpoint}: {message}")]
    Api {
        /// URL that was requested.
        endpoint: String,
        /// HTTP status code.
        status: u16,
        /// Server-provided detail (at most 1 KiB of the body).
        message: String,
    },

    /// A success response could not be decoded.
    #[error("failed to decode response from {endpoint}: {source}")]
    Deserialization {
        /// URL that was requested.
        endpoint: String,
        /// Decoding failure.
        #[source]
        source: reqwest::Error,
    },

    /// `CAS_SERVER_URL` (or an explicit URL) did not parse.
    #[error("invalid server URL {url:?}: {reason}")]
    InvalidUrl {
        /// The offending value.
        url: String,
        /// Parser message.
        reason: String,
    },

    /// The auth token cannot be sent as an HTTP header value.
    #[error("auth token is not a valid header value: {0}")]
    InvalidToken(String),

    /// Local storage failure.
    #[error(transparent)]
    Store(CasError),
}

impl From<CasError> for ClientError {
    fn from(err: CasError) -> Self {
        match err {
            CasError::InvalidHash(h) => Self::InvalidHash(h),
            CasError::BlobNotFound(h) => Self::BlobNotFound(h),
            CasError::EntryNotFound(p) => Self::EntryNotFound(p),
            CasError::Cancelled => Self::Cancelled,
            other => Self::Store(other),
        }
    }
}

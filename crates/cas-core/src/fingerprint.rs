//! # Fingerprint — SHA-256 Content Identifiers
//!
//! A [`Fingerprint`] is the 32-byte SHA-256 digest of a blob, rendered as
//! 64 lowercase hex characters on every external surface (paths, JSON,
//! HTTP). Parsing is strict: uppercase hex, prefixes, and whitespace are
//! all rejected, because the hex form doubles as a file name.
//!
//! [`HashingWriter`] is the streaming tee used by ingest: every byte
//! written to it is forwarded to the inner writer and fed to the digest,
//! so a payload is hashed and persisted in one pass without buffering.

use std::fmt;
use std::io;
use std::pin::Pin;
use std::str::FromStr;
use std::task::{ready, Context, Poll};

use serde::{de, Deserialize, Deserializer, Serialize, Serializer};
use sha2::{Digest, Sha256};
use tokio::io::{AsyncRead, AsyncWrite};

use crate::error::CasError;

/// Number of hex characters in a rendered fingerprint.
pub const HEX_LEN: usize = 64;

/// Number of hex characters shown in abbreviated output.
pub const SHORT_LEN: usize = 8;

/// SHA-256 digest identifying a blob.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    /// Fingerprint of an in-memory buffer.
    pub fn of(data: &[u8]) -> Self {
        Self(Sha256::digest(data).into())
    }

    /// Parse the 64-character lowercase hex form.
    pub fn parse(hex: &str) -> Result<Self, CasError> {
        let raw = hex.as_bytes();
        if raw.len() != HEX_LEN {
            return Err(CasError::InvalidHash(hex.to_string()));
        }
        let mut bytes = [0u8; 32];
        for (out, pair) in bytes.iter_mut().zip(raw.chunks_exact(2)) {
            match (nibble(pair[0]), nibble(pair[1])) {
                (Some(hi), Some(lo)) => *out = (hi << 4) | lo,
                _ => return Err(CasError::InvalidHash(hex.to_string())),
            }
        }
        Ok(Self(bytes))
    }

    /// True if `hex` would parse.
    pub fn is_valid(hex: &str) -> bool {
        hex.len() == HEX_LEN && hex.bytes().all(|c| nibble(c).is_some())
    }

    /// Lowercase hex rendering.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{b:02x}")).collect()
    }

    /// First eight hex characters, for human-facing output.
    pub fn short(&self) -> String {
        self.0[..SHORT_LEN / 2]
            .iter()
            .map(|b| format!("{b:02x}"))
            .collect()
    }
}

fn nibble(c: u8) -> Option<u8> {
    match c {
        b'0'..=b'9' => Some(c - b'0'),
        b'a'..=b'f' => Some(c - b'a' + 10),
        _ => None,
    }
}

/// Abbreviate a hex string that may not be a valid fingerprint.
pub fn short_hex(hex: &str) -> &str {
    hex.get(..SHORT_LEN).unwrap_or(hex)
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_hex())
    }
}

impl fmt::Debug for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fingerprint({})", self.to_hex())
    }
}

impl FromStr for Fingerprint {
    type Err = CasError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for Fingerprint {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for Fingerprint {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let hex = String::deserialize(deserializer)?;
        Self::parse(&hex).map_err(de::Error::custom)
    }
}

/// Async writer that hashes everything passing through it.
#[derive(Debug)]
pub struct HashingWriter<W> {
    inner: W,
    hasher: Sha256,
    written: u64,
}

impl<W> HashingWriter<W> {
    /// Wrap `inner`.
    pub fn new(inner: W) -> Self {
        Self {
            inner,
            hasher: Sha256::new(),
            written: 0,
        }
    }

    /// Bytes accepted so far.
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    /// Consume the tee, returning the inner writer and the final digest.
    pub fn finalize(self) -> (W, Fingerprint) {
        let digest = Fingerprint(self.hasher.finalize().into());
        (self.inner, digest)
    }
}

impl<W: AsyncWrite + Unpin> AsyncWrite for HashingWriter<W> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        let n = ready!(Pin::new(&mut this.inner).poll_write(cx, buf))?;
        this.hasher.update(&buf[..n]);
        this.written += n as u64;
        Poll::Ready(Ok(n))
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_flush(cx)
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }
}

/// Hash a stream without storing it. Returns the digest and byte count.
pub async fn hash_reader<R>(reader: &mut R) -> io::Result<(Fingerprint, u64)>
where
    R: AsyncRead + Unpin + ?Sized,
{
    let mut tee = HashingWriter::new(tokio::io::sink());
    let size = tokio::io::copy(reader, &mut tee).await?;
    let (_, digest) = tee.finalize();
    Ok((digest, size))
}

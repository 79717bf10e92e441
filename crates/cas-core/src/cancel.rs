//! Cancellation-aware reads.
//!
//! [`CancellableReader`] checks its token before every read and is woken
//! when the token fires, so a stalled or long stream stops at the next
//! chunk boundary with [`io::ErrorKind::Interrupted`].

use std::fmt;
use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::io::{AsyncRead, ReadBuf};
use tokio_util::sync::{CancellationToken, WaitForCancellationFutureOwned};

/// Wraps a reader so that cancelling `token` fails the next read.
pub struct CancellableReader<R> {
    inner: R,
    token: CancellationToken,
    cancelled: Pin<Box<WaitForCancellationFutureOwned>>,
}

impl<R> CancellableReader<R> {
    /// Wrap `inner`, watching `token`.
    pub fn new(inner: R, token: CancellationToken) -> Self {
        Self {
            inner,
            cancelled: Box::pin(token.clone().cancelled_owned()),
            token,
        }
    }
}

impl<R> fmt::Debug for CancellableReader<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CancellableReader")
            .field("cancelled", &self.token.is_cancelled())
            .finish_non_exhaustive()
    }
}

fn interrupted() -> io::Error {
    io::Error::new(io::ErrorKind::Interrupted, "operation cancelled")
}

impl<R: AsyncRead + Unpin> AsyncRead for CancellableReader<R> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        let this = &mut *self;
        if this.token.is_cancelled() {
            return Poll::Ready(Err(interrupted()));
        }
        // Registers the waker so a pending read is woken on cancellation.
        if this.cancelled.as_mut().poll(cx).is_ready() {
            return Poll::Ready(Err(interrupted()));
        }
        Pin::new(&mut this.inner).poll_read(cx, buf)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn reads_through_until_cancelled() {
        let token = CancellationToken::new();
        let data = vec![7u8; 64 * 1024];
        let mut reader = CancellableReader::new(data.as_slice(), token.clone());

        let mut head = [0u8; 1024];
        reader.read_exact(&mut head).await.unwrap();
        token.cancel();

        let mut rest = Vec::new();
        let err = reader.read_to_end(&mut rest).await.unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert!(rest.is_empty());
    }

    #[tokio::test]
    async fn pending_read_wakes_on_cancel() {
        let token = CancellationToken::new();
        let (mut tx, rx) = tokio::io::duplex(64);
        tx.write_all(b"abc").await.unwrap();
        let mut reader = CancellableReader::new(rx, token.clone());

        let trigger = token.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let mut out = Vec::new();
        let err = tokio::time::timeout(Duration::from_secs(5), reader.read_to_end(&mut out))
            .await
            .expect("read should be interrupted, not hang")
            .unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::Interrupted);
        assert_eq!(out, b"abc");
        drop(tx);
    }
}

//! Socket wrapper enforcing a per-write deadline
//!
//! A viewer that stops reading eventually fills its socket buffer and leaves
//! the writer pending forever. `TimedStream` turns a write that makes no
//! progress for `write_timeout` into a `TimedOut` error, which ends that
//! connection and nothing else.

use std::future::Future;
use std::io;
use std::pin::Pin;
use std::task::{Context, Poll};
use std::time::Duration;

use tokio::io::{AsyncRead, AsyncWrite, ReadBuf};
use tokio::time::{sleep, Sleep};

/// Stream whose writes fail after stalling for longer than a deadline
#[derive(Debug)]
pub struct TimedStream<T> {
    inner: T,
    write_timeout: Option<Duration>,
    deadline: Option<Pin<Box<Sleep>>>,
}

impl<T> TimedStream<T> {
    /// Wrap `inner`; `None` disables the deadline
    pub fn new(inner: T, write_timeout: Option<Duration>) -> Self {
        Self {
            inner,
            write_timeout,
            deadline: None,
        }
    }

    /// Arm the deadline on first stall and check it
    fn poll_stalled(&mut self, cx: &mut Context<'_>) -> Poll<io::Error> {
        let Some(limit) = self.write_timeout else {
            return Poll::Pending;
        };

        let deadline = self.deadline.get_or_insert_with(|| Box::pin(sleep(limit)));
        match deadline.as_mut().poll(cx) {
            Poll::Ready(()) => {
                self.deadline = None;
                Poll::Ready(io::Error::new(io::ErrorKind::TimedOut, "write timed out"))
            }
            Poll::Pending => Poll::Pending,
        }
    }
}

impl<T: AsyncRead + Unpin> AsyncRead for TimedStream<T> {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_read(cx, buf)
    }
}

impl<T: AsyncWrite + Unpin> AsyncWrite for TimedStream<T> {
    fn poll_write(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &[u8],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write(cx, buf) {
            Poll::Ready(result) => {
                this.deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_stalled(cx).map(Err),
        }
    }

    fn poll_flush(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_flush(cx) {
            Poll::Ready(result) => {
                this.deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_stalled(cx).map(Err),
        }
    }

    fn poll_shutdown(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<io::Result<()>> {
        Pin::new(&mut self.inner).poll_shutdown(cx)
    }

    fn poll_write_vectored(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        bufs: &[io::IoSlice<'_>],
    ) -> Poll<io::Result<usize>> {
        let this = &mut *self;
        match Pin::new(&mut this.inner).poll_write_vectored(cx, bufs) {
            Poll::Ready(result) => {
                this.deadline = None;
                Poll::Ready(result)
            }
            Poll::Pending => this.poll_stalled(cx).map(Err),
        }
    }

    fn is_write_vectored(&self) -> bool {
        self.inner.is_write_vectored()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    #[tokio::test]
    async fn test_reads_pass_through() {
        let mock = tokio_test::io::Builder::new().read(b"GET / HTTP/1.1\r\n").build();
        let mut stream = TimedStream::new(mock, Some(Duration::from_millis(50)));

        let mut buf = Vec::new();
        stream.read_to_end(&mut buf).await.unwrap();

        assert_eq!(buf, b"GET / HTTP/1.1\r\n");
    }

    #[tokio::test]
    async fn test_write_completes_when_peer_reads() {
        let (tx, mut rx) = tokio::io::duplex(64);
        let mut stream = TimedStream::new(tx, Some(Duration::from_millis(50)));

        stream.write_all(b"frame").await.unwrap();

        let mut buf = [0u8; 5];
        rx.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"frame");
    }

    #[tokio::test]
    async fn test_stalled_write_times_out() {
        // Nobody reads the other end, so the write stalls once the pipe is full
        let (tx, _rx) = tokio::io::duplex(8);
        let mut stream = TimedStream::new(tx, Some(Duration::from_millis(50)));

        let err = stream.write_all(&[0u8; 64]).await.unwrap_err();

        assert_eq!(err.kind(), io::ErrorKind::TimedOut);
    }

    #[tokio::test]
    async fn test_no_deadline_waits() {
        let (tx, _rx) = tokio::io::duplex(8);
        let mut stream = TimedStream::new(tx, None);

        let write = stream.write_all(&[0u8; 64]);
        assert!(tokio::time::timeout(Duration::from_millis(100), write)
            .await
            .is_err());
    }
}

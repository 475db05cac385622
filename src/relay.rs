//! Bidirectional relay between two byte streams
//!
//! Each direction runs as its own task with a pooled buffer. When a
//! direction sees EOF (or fails) it half-closes the opposite endpoint, so the
//! other direction keeps flowing until its own source is done. The caller
//! only returns once both directions have reported.

use crate::pool::BufferPool;
use std::fmt;
use std::io;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tracing::debug;

/// Direction of a single copy task
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    /// From the first endpoint to the second
    Forward,
    /// From the second endpoint to the first
    Backward,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Forward => write!(f, "A->B"),
            Direction::Backward => write!(f, "B->A"),
        }
    }
}

/// Bytes moved by a finished relay
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RelayStats {
    /// Bytes copied from the first endpoint to the second
    pub forward: u64,
    /// Bytes copied from the second endpoint to the first
    pub backward: u64,
}

type DirectionResult = (Direction, io::Result<u64>);

/// Relay data between `a` and `b` until both directions are finished
///
/// Returns the first error reported by either direction, after both
/// directions have completed. Both endpoints are dropped (closed) once their
/// copy tasks end.
pub async fn relay<A, B>(a: A, b: B, pool: &BufferPool) -> io::Result<RelayStats>
where
    A: AsyncRead + AsyncWrite + Send + 'static,
    B: AsyncRead + AsyncWrite + Send + 'static,
{
    let (a_read, a_write) = tokio::io::split(a);
    let (b_read, b_write) = tokio::io::split(b);

    // One slot per direction; neither sender ever waits
    let (tx, mut rx) = mpsc::channel::<DirectionResult>(2);

    tokio::spawn(copy_direction(
        Direction::Forward,
        a_read,
        b_write,
        pool.clone(),
        tx.clone(),
    ));
    tokio::spawn(copy_direction(
        Direction::Backward,
        b_read,
        a_write,
        pool.clone(),
        tx,
    ));

    let mut stats = RelayStats::default();
    let mut first_error = None;

    while let Some((direction, result)) = rx.recv().await {
        match result {
            Ok(bytes) => {
                debug!("{} finished: {} bytes", direction, bytes);
                match direction {
                    Direction::Forward => stats.forward = bytes,
                    Direction::Backward => stats.backward = bytes,
                }
            }
            Err(e) => {
                debug!("{} error: {}", direction, e);
                if first_error.is_none() {
                    first_error = Some(e);
                }
            }
        }
    }

    match first_error {
        Some(e) => Err(e),
        None => Ok(stats),
    }
}

/// Copy one direction, then half-close the destination
async fn copy_direction<R, W>(
    direction: Direction,
    mut reader: ReadHalf<R>,
    mut writer: WriteHalf<W>,
    pool: BufferPool,
    tx: mpsc::Sender<DirectionResult>,
) where
    R: AsyncRead,
    W: AsyncWrite,
{
    let mut buf = pool.get();
    let result = copy_with_buffer(&mut reader, &mut writer, &mut buf).await;

    // The peer may already be gone; nothing useful to do with this error
    let _ = writer.shutdown().await;

    // Release the buffer before reporting, so the pool sees it back first
    drop(buf);

    if tx.send((direction, result)).await.is_err() {
        debug!("{} result dropped: relay owner gone", direction);
    }
}

async fn copy_with_buffer<R, W>(reader: &mut R, writer: &mut W, buf: &mut [u8]) -> io::Result<u64>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut total = 0u64;
    loop {
        let n = reader.read(buf).await?;
        if n == 0 {
            return Ok(total);
        }
        writer.write_all(&buf[..n]).await?;
        total += n as u64;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use tokio::io::{duplex, ReadBuf};

    /// Stream that fails every read and write
    struct BrokenStream;

    impl AsyncRead for BrokenStream {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::ConnectionReset, "reset")))
        }
    }

    impl AsyncWrite for BrokenStream {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &[u8],
        ) -> Poll<io::Result<usize>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::BrokenPipe, "broken")))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(io::ErrorKind::NotConnected, "gone")))
        }
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::Forward.to_string(), "A->B");
        assert_eq!(Direction::Backward.to_string(), "B->A");
    }

    #[tokio::test]
    async fn test_relay_both_directions() {
        let pool = BufferPool::new(16);
        let (mut client, relay_a) = duplex(64);
        let (relay_b, mut target) = duplex(64);

        let handle = tokio::spawn({
            let pool = pool.clone();
            async move { relay(relay_a, relay_b, &pool).await }
        });

        client.write_all(b"hello from client").await.unwrap();
        let mut buf = [0u8; 17];
        target.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"hello from client");

        target.write_all(b"reply").await.unwrap();
        let mut buf = [0u8; 5];
        client.read_exact(&mut buf).await.unwrap();
        assert_eq!(&buf, b"reply");

        drop(client);
        drop(target);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.forward, 17);
        assert_eq!(stats.backward, 5);
    }

    #[tokio::test]
    async fn test_relay_half_close_keeps_other_direction() {
        let pool = BufferPool::default();
        let (mut client, relay_a) = duplex(1024);
        let (relay_b, mut target) = duplex(1024);

        let handle = tokio::spawn({
            let pool = pool.clone();
            async move { relay(relay_a, relay_b, &pool).await }
        });

        // Client finishes sending; target sees EOF
        client.write_all(b"request").await.unwrap();
        client.shutdown().await.unwrap();

        let mut received = Vec::new();
        target.read_to_end(&mut received).await.unwrap();
        assert_eq!(received, b"request");

        // The target can still answer after the client's half-close
        target.write_all(b"late response").await.unwrap();
        target.shutdown().await.unwrap();

        let mut response = Vec::new();
        client.read_to_end(&mut response).await.unwrap();
        assert_eq!(response, b"late response");

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats.forward, 7);
        assert_eq!(stats.backward, 13);
    }

    #[tokio::test]
    async fn test_relay_completes_when_idle_peer_closes() {
        let pool = BufferPool::default();
        let (client, relay_a) = duplex(1024);
        let (relay_b, target) = duplex(1024);

        let handle = tokio::spawn({
            let pool = pool.clone();
            async move { relay(relay_a, relay_b, &pool).await }
        });

        // Neither side ever sends a byte
        drop(client);
        drop(target);

        let stats = handle.await.unwrap().unwrap();
        assert_eq!(stats, RelayStats::default());
    }

    #[tokio::test]
    async fn test_relay_reports_error_after_both_directions() {
        let pool = BufferPool::default();
        let (client, relay_a) = duplex(1024);

        let handle = tokio::spawn({
            let pool = pool.clone();
            async move { relay(relay_a, BrokenStream, &pool).await }
        });

        // The broken side fails at once; the client side ends when it closes
        drop(client);

        let result = handle.await.unwrap();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_relay_returns_buffers_to_pool() {
        let pool = BufferPool::new(32);
        let (client, relay_a) = duplex(64);
        let (relay_b, target) = duplex(64);
        drop(client);
        drop(target);

        relay(relay_a, relay_b, &pool).await.unwrap();

        // Directions may reuse each other's buffer, but none stays checked out
        let idle = pool.idle();
        assert!((1..=2).contains(&idle));
    }
}

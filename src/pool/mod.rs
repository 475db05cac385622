//! Buffer pool for relay copies
//!
//! Relay directions check out a fixed-size buffer for the lifetime of the
//! copy and hand it back when they finish, so long-running servers do not
//! allocate a fresh buffer for every connection.

mod guard;

pub use guard::PooledBuffer;

use bytes::BytesMut;
use std::sync::{Arc, Mutex};

/// Default relay buffer size in bytes
pub const DEFAULT_BUFFER_SIZE: usize = 1024;

/// Default number of idle buffers kept around
pub const DEFAULT_MAX_IDLE: usize = 1024;

/// A shared pool of fixed-size byte buffers
///
/// Cloning the pool is cheap; all clones share the same free list.
#[derive(Debug, Clone)]
pub struct BufferPool {
    inner: Arc<Inner>,
}

#[derive(Debug)]
pub(crate) struct Inner {
    buffer_size: usize,
    max_idle: usize,
    free: Mutex<Vec<BytesMut>>,
}

impl Default for BufferPool {
    fn default() -> Self {
        Self::new(DEFAULT_BUFFER_SIZE)
    }
}

impl BufferPool {
    /// Create a pool handing out buffers of `buffer_size` bytes
    pub fn new(buffer_size: usize) -> Self {
        Self::with_max_idle(buffer_size, DEFAULT_MAX_IDLE)
    }

    /// Create a pool that keeps at most `max_idle` returned buffers
    pub fn with_max_idle(buffer_size: usize, max_idle: usize) -> Self {
        BufferPool {
            inner: Arc::new(Inner {
                buffer_size: buffer_size.max(1),
                max_idle,
                free: Mutex::new(Vec::new()),
            }),
        }
    }

    /// Number of buffers currently waiting in the free list
    pub fn idle(&self) -> usize {
        self.inner.free.lock().map(|free| free.len()).unwrap_or(0)
    }

    /// Check out a buffer, allocating one if the free list is empty
    pub fn get(&self) -> PooledBuffer {
        let reused = self.inner.free.lock().ok().and_then(|mut free| free.pop());
        let buf = reused.unwrap_or_else(|| BytesMut::zeroed(self.inner.buffer_size));
        PooledBuffer::new(buf, Arc::clone(&self.inner))
    }
}

impl Inner {
    /// Put a buffer back, dropping it when the pool is full
    pub(crate) fn put(&self, mut buf: BytesMut) {
        // A relay never shrinks its buffer, but restore the length anyway so
        // the next user always sees a full-size slice.
        buf.resize(self.buffer_size, 0);

        if let Ok(mut free) = self.free.lock() {
            if free.len() < self.max_idle {
                free.push(buf);
            }
        }
    }
}

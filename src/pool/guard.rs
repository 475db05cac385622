//! RAII guard for pooled buffers
//!
//! Provides automatic return of buffers to the pool when dropped.

use super::Inner;
use bytes::BytesMut;
use std::fmt;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

/// RAII guard that returns the buffer to the pool on drop
pub struct PooledBuffer {
    /// `Some` until the guard is dropped
    buf: Option<BytesMut>,
    /// Pool the buffer goes back to
    pool: Arc<Inner>,
}

impl PooledBuffer {
    pub(crate) fn new(buf: BytesMut, pool: Arc<Inner>) -> Self {
        PooledBuffer {
            buf: Some(buf),
            pool,
        }
    }
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        self.buf.as_deref().unwrap_or_default()
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut Self::Target {
        match self.buf.as_mut() {
            Some(buf) => buf,
            None => &mut [],
        }
    }
}

impl fmt::Debug for PooledBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledBuffer")
            .field("len", &self.len())
            .finish()
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        if let Some(buf) = self.buf.take() {
            self.pool.put(buf);
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pool::BufferPool;

    #[test]
    fn test_guard_drop_returns_to_pool() {
        let pool = BufferPool::new(8);
        {
            let mut guard = pool.get();
            guard[..3].copy_from_slice(b"abc");
        }
        assert_eq!(pool.idle(), 1);
    }

    #[test]
    fn test_guard_deref_mut() {
        let pool = BufferPool::new(4);
        let mut guard = pool.get();
        guard.copy_from_slice(&[1, 2, 3, 4]);
        assert_eq!(&guard[..], &[1, 2, 3, 4]);
    }

    #[test]
    fn test_guard_debug() {
        let pool = BufferPool::new(4);
        let guard = pool.get();
        assert_eq!(format!("{:?}", guard), "PooledBuffer { len: 4 }");
    }
}

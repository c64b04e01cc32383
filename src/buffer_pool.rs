//! Reusable fixed-size scratch buffers for response body relays
//!
//! A relay borrows one buffer through [`BufferPool::acquire`] and gives it
//! back when the returned [`PooledBuffer`] is dropped, so every exit path of
//! the relay (end of stream, read error, client gone) releases it.

use std::ops::{Deref, DerefMut};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

pub struct BufferPool {
    buffer_size: usize,
    max_idle: usize,
    idle: Mutex<Vec<Box<[u8]>>>,
    allocated: AtomicU64,
    reused: AtomicU64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferPoolStats {
    pub buffer_size: usize,
    pub idle: usize,
    pub allocated: u64,
    pub reused: u64,
}

impl BufferPool {
    pub fn new(buffer_size: usize, max_idle: usize) -> Arc<Self> {
        Arc::new(Self {
            buffer_size,
            max_idle,
            idle: Mutex::new(Vec::new()),
            allocated: AtomicU64::new(0),
            reused: AtomicU64::new(0),
        })
    }

    pub fn buffer_size(&self) -> usize {
        self.buffer_size
    }

    /// Borrows a buffer, reusing an idle one when available.
    ///
    /// The contents are whatever the previous borrower left behind.
    pub fn acquire(self: &Arc<Self>) -> PooledBuffer {
        let reused = self.lock_idle().pop();
        let buf = match reused {
            Some(buf) => {
                self.reused.fetch_add(1, Ordering::Relaxed);
                buf
            }
            None => {
                self.allocated.fetch_add(1, Ordering::Relaxed);
                vec![0u8; self.buffer_size].into_boxed_slice()
            }
        };

        PooledBuffer {
            pool: Arc::clone(self),
            buf,
        }
    }

    fn release(&self, buf: Box<[u8]>) {
        let mut idle = self.lock_idle();
        if idle.len() < self.max_idle {
            idle.push(buf);
        }
    }

    pub fn stats(&self) -> BufferPoolStats {
        BufferPoolStats {
            buffer_size: self.buffer_size,
            idle: self.lock_idle().len(),
            allocated: self.allocated.load(Ordering::Relaxed),
            reused: self.reused.load(Ordering::Relaxed),
        }
    }

    // A panic while holding the lock cannot leave the Vec half-updated.
    fn lock_idle(&self) -> std::sync::MutexGuard<'_, Vec<Box<[u8]>>> {
        self.idle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// A borrowed buffer, returned to its pool on drop.
pub struct PooledBuffer {
    pool: Arc<BufferPool>,
    buf: Box<[u8]>,
}

impl Deref for PooledBuffer {
    type Target = [u8];

    fn deref(&self) -> &[u8] {
        &self.buf
    }
}

impl DerefMut for PooledBuffer {
    fn deref_mut(&mut self) -> &mut [u8] {
        &mut self.buf
    }
}

impl Drop for PooledBuffer {
    fn drop(&mut self) {
        let buf = std::mem::take(&mut self.buf);
        self.pool.release(buf);
    }
}

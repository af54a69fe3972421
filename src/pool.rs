//! A process-wide, size-classed pool of reusable byte buffers.
//!
//! `Writer`s and readers don't use this directly — it exists for callers
//! that encode/decode at a high rate and want to amortize allocation
//! across buffers of similar size. One free list per size class, each
//! behind its own coarse mutex; acquiring a size outside the class range
//! bypasses the pool and just allocates.

use std::sync::Mutex;

const SIZE_CLASSES: [usize; 10] = [64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768];

fn class_for(size: usize) -> Option<usize> {
    SIZE_CLASSES.iter().position(|&class| class >= size)
}

/// Pool of reusable `Vec<u8>` buffers, one free list per size class in
/// `{64, 128, 256, 512, 1024, 2048, 4096, 8192, 16384, 32768}`.
#[derive(Debug)]
pub struct BufferPool {
    classes: Vec<Mutex<Vec<Vec<u8>>>>,
}

impl BufferPool {
    /// An empty pool; free lists fill up as buffers are released.
    pub fn new() -> Self {
        BufferPool {
            classes: SIZE_CLASSES.iter().map(|_| Mutex::new(Vec::new())).collect(),
        }
    }

    /// A buffer with capacity at least `size` and `len() == 0`. Requests
    /// larger than the biggest size class bypass the pool entirely.
    pub fn acquire(&self, size: usize) -> Vec<u8> {
        match class_for(size) {
            Some(class) => {
                let mut free = self.classes[class].lock().unwrap();
                free.pop().unwrap_or_else(|| Vec::with_capacity(SIZE_CLASSES[class]))
            }
            None => Vec::with_capacity(size),
        }
    }

    /// Like [`BufferPool::acquire`], but the buffer comes back zero-filled
    /// with `len() == size`.
    pub fn acquire_zeroed(&self, size: usize) -> Vec<u8> {
        let mut buffer = self.acquire(size);
        buffer.clear();
        buffer.resize(size, 0);
        buffer
    }

    /// Return `buffer` to its size class's free list. Ignored (buffer is
    /// simply dropped) if its capacity isn't exactly one of the
    /// recognized size classes.
    pub fn release(&self, mut buffer: Vec<u8>) {
        let Some(class) = SIZE_CLASSES.iter().position(|&c| c == buffer.capacity()) else {
            return;
        };
        buffer.clear();
        self.classes[class].lock().unwrap().push(buffer);
    }
}

impl Default for BufferPool {
    fn default() -> Self {
        BufferPool::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_rounds_up_to_size_class() {
        let pool = BufferPool::new();
        let buf = pool.acquire(100);
        assert_eq!(buf.capacity(), 128);
        assert_eq!(buf.len(), 0);
    }

    #[test]
    fn release_then_acquire_reuses_buffer() {
        let pool = BufferPool::new();
        let buf = pool.acquire(64);
        let ptr = buf.as_ptr();
        pool.release(buf);
        let reused = pool.acquire(64);
        assert_eq!(reused.as_ptr(), ptr);
    }

    #[test]
    fn oversized_acquire_bypasses_pool() {
        let pool = BufferPool::new();
        let buf = pool.acquire(100_000);
        assert!(buf.capacity() >= 100_000);
        pool.release(buf);
        assert!(pool.classes.iter().all(|c| c.lock().unwrap().is_empty()));
    }

    #[test]
    fn acquire_zeroed_fills_with_zero_bytes() {
        let pool = BufferPool::new();
        let buf = pool.acquire_zeroed(64);
        assert_eq!(buf.len(), 64);
        assert!(buf.iter().all(|&b| b == 0));
    }

    #[test]
    fn release_with_non_class_capacity_is_dropped() {
        let pool = BufferPool::new();
        let odd = Vec::<u8>::with_capacity(100);
        pool.release(odd);
        assert!(pool.classes.iter().all(|c| c.lock().unwrap().is_empty()));
    }
}

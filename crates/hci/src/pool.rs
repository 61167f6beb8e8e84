//! Fixed-size outbound buffer pools.
//!
//! Every buffer is allocated when the pool is created. Taking one never
//! allocates and never blocks: an empty pool is reported to the caller, who
//! decides whether to retry later or drop the packet.

use std::sync::Arc;

use parking_lot::Mutex;

/// Usage counters for a buffer pool.
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub total: usize,
    pub free: usize,
    pub used: usize,
    /// Lowest `free` ever observed.
    pub min_free: usize,
}

impl PoolStats {
    pub const fn new(total: usize) -> Self {
        Self {
            total,
            free: total,
            used: 0,
            min_free: total,
        }
    }

    fn on_alloc(&mut self) {
        self.used += 1;
        self.free -= 1;
        self.min_free = self.min_free.min(self.free);
    }

    fn on_release(&mut self) {
        self.used -= 1;
        self.free += 1;
    }

    pub const fn is_exhausted(&self) -> bool {
        self.free == 0
    }

    /// Percentage of buffers in use.
    pub fn utilization(&self) -> u8 {
        if self.total == 0 {
            0
        } else {
            ((self.used * 100) / self.total) as u8
        }
    }
}

struct PoolState {
    free: Vec<Vec<u8>>,
    stats: PoolStats,
}

struct PoolInner {
    name: &'static str,
    buffer_size: usize,
    state: Mutex<PoolState>,
}

/// A pool of `count` buffers of `buffer_size` bytes each.
#[derive(Clone)]
pub struct BufferPool {
    inner: Arc<PoolInner>,
}

impl BufferPool {
    pub fn new(name: &'static str, count: usize, buffer_size: usize) -> Self {
        let free = (0..count).map(|_| Vec::with_capacity(buffer_size)).collect();
        Self {
            inner: Arc::new(PoolInner {
                name,
                buffer_size,
                state: Mutex::new(PoolState {
                    free,
                    stats: PoolStats::new(count),
                }),
            }),
        }
    }

    pub fn name(&self) -> &'static str {
        self.inner.name
    }

    pub fn buffer_size(&self) -> usize {
        self.inner.buffer_size
    }

    /// Takes a free buffer, or `None` if all are in use.
    pub fn try_alloc(&self) -> Option<PoolBuffer> {
        let mut state = self.inner.state.lock();
        let data = state.free.pop()?;
        state.stats.on_alloc();
        Some(PoolBuffer {
            data,
            pool: Arc::clone(&self.inner),
        })
    }

    pub fn available(&self) -> usize {
        self.inner.state.lock().stats.free
    }

    pub fn stats(&self) -> PoolStats {
        self.inner.state.lock().stats
    }
}

/// A buffer on loan from a [`BufferPool`]; returns itself when dropped.
pub struct PoolBuffer {
    data: Vec<u8>,
    pool: Arc<PoolInner>,
}

impl PoolBuffer {
    /// Appends as much of `bytes` as fits, returning the number copied.
    pub fn append(&mut self, bytes: &[u8]) -> usize {
        let room = self.pool.buffer_size - self.data.len();
        let take = room.min(bytes.len());
        self.data.extend_from_slice(&bytes[..take]);
        take
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.pool.buffer_size
    }

    pub fn pool_name(&self) -> &'static str {
        self.pool.name
    }
}

impl Drop for PoolBuffer {
    fn drop(&mut self) {
        let mut data = std::mem::take(&mut self.data);
        data.clear();
        let mut state = self.pool.state.lock();
        state.free.push(data);
        state.stats.on_release();
    }
}

impl core::fmt::Debug for PoolBuffer {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("PoolBuffer")
            .field("pool", &self.pool.name)
            .field("len", &self.data.len())
            .finish()
    }
}

//! In-process cache backend.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::time::Instant;

use super::Cache;
use crate::error::CacheResult;

/// Expired entries are swept after this many writes.
const SWEEP_INTERVAL: u64 = 256;

/// Only key presence is ever read back, so values are not retained.
struct Entry {
    expires_at: Instant,
}

#[derive(Default)]
struct Inner {
    entries: HashMap<String, Entry>,
    writes: u64,
}

impl Inner {
    fn live(&self, key: &str, now: Instant) -> bool {
        self.entries.get(key).is_some_and(|e| e.expires_at > now)
    }

    fn insert(&mut self, key: &str, ttl: Duration, now: Instant) {
        self.writes = self.writes.wrapping_add(1);
        if self.writes % SWEEP_INTERVAL == 0 {
            self.entries.retain(|_, e| e.expires_at > now);
        }
        self.entries.insert(
            key.to_string(),
            Entry {
                expires_at: now + ttl,
            },
        );
    }
}

/// A cache held in process memory.
///
/// Every operation runs under one lock, which makes [`Cache::take`] atomic.
/// Entries are only visible to this process, so this backend suits tests and
/// single-instance deployments.
#[derive(Default)]
pub struct MemoryCache {
    inner: Mutex<Inner>,
}

impl MemoryCache {
    /// Create an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Cache for MemoryCache {
    async fn set(&self, key: &str, _value: &str, ttl: Duration) -> CacheResult<()> {
        let now = Instant::now();
        self.inner.lock().insert(key, ttl, now);
        Ok(())
    }

    async fn set_if_absent(&self, key: &str, _value: &str, ttl: Duration) -> CacheResult<bool> {
        let now = Instant::now();
        let mut inner = self.inner.lock();
        if inner.live(key, now) {
            return Ok(false);
        }
        inner.insert(key, ttl, now);
        Ok(true)
    }

    async fn exists(&self, key: &str) -> CacheResult<bool> {
        Ok(self.inner.lock().live(key, Instant::now()))
    }

    async fn delete(&self, key: &str) -> CacheResult<()> {
        self.inner.lock().entries.remove(key);
        Ok(())
    }

    async fn take(&self, key: &str) -> CacheResult<bool> {
        let now = Instant::now();
        let removed = self.inner.lock().entries.remove(key);
        Ok(removed.is_some_and(|e| e.expires_at > now))
    }
}

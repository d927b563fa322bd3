//! Short-lived key storage.
//!
//! The cache holds nonces and token revocations. Both are plain keys with a
//! TTL; only their presence matters. Every backend must implement
//! [`Cache::take`] as a single atomic step so a key can be consumed by at most
//! one caller.

mod memory;
mod redis_cache;

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;

use crate::error::CacheResult;

pub use self::memory::MemoryCache;
pub use self::redis_cache::RedisCache;

/// Key/value cache with per-key expiry.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Store `value` under `key`, replacing any existing value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the deadline passes.
    async fn set(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<()>;

    /// Store `value` under `key` only if the key is absent.
    ///
    /// Returns `true` if this call created the key.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the deadline passes.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Duration) -> CacheResult<bool>;

    /// Check whether `key` is present and unexpired.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the deadline passes.
    async fn exists(&self, key: &str) -> CacheResult<bool>;

    /// Remove `key` if present.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the deadline passes.
    async fn delete(&self, key: &str) -> CacheResult<()>;

    /// Atomically remove `key`, returning whether it was present.
    ///
    /// Of any number of concurrent callers, at most one observes `true`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backend is unreachable or the deadline passes.
    async fn take(&self, key: &str) -> CacheResult<bool>;
}

/// Cache backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL. When unset, an in-process cache is used.
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Deadline for a single cache operation in milliseconds.
    #[serde(default = "CacheConfig::default_op_timeout_ms")]
    pub op_timeout_ms: u64,
}

impl CacheConfig {
    const fn default_op_timeout_ms() -> u64 {
        500
    }

    /// Get the per-operation deadline as a `Duration`.
    #[must_use]
    pub const fn op_timeout(&self) -> Duration {
        Duration::from_millis(self.op_timeout_ms)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            op_timeout_ms: Self::default_op_timeout_ms(),
        }
    }
}

/// Build the cache backend described by `config`.
///
/// # Errors
///
/// Returns an error if a Redis URL is configured but the connection fails.
pub async fn from_config(config: &CacheConfig) -> CacheResult<Arc<dyn Cache>> {
    match &config.redis_url {
        Some(url) => {
            let cache = RedisCache::connect(url, config.op_timeout()).await?;
            tracing::info!(timeout_ms = config.op_timeout_ms, "Connected to Redis cache");
            Ok(Arc::new(cache))
        }
        None => {
            tracing::warn!("No REDIS_URL set - using in-process cache (single instance only)");
            Ok(Arc::new(MemoryCache::new()))
        }
    }
}

/// Convert a TTL to whole milliseconds, never less than one.
pub(crate) fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

//! Test doubles for the storage layer.

use std::time::Duration;

use async_trait::async_trait;

use crate::cache::Cache;
use crate::error::{CacheError, CacheResult};

/// A cache whose every operation fails as if the backend were down.
///
/// Writes fail with [`CacheError::Backend`]; reads and `take` fail with
/// [`CacheError::Timeout`].
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableCache;

#[async_trait]
impl Cache for UnavailableCache {
    async fn set(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn set_if_absent(&self, _key: &str, _value: &str, _ttl: Duration) -> CacheResult<bool> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn exists(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Timeout(Duration::from_millis(500)))
    }

    async fn delete(&self, _key: &str) -> CacheResult<()> {
        Err(CacheError::Backend("connection refused".into()))
    }

    async fn take(&self, _key: &str) -> CacheResult<bool> {
        Err(CacheError::Timeout(Duration::from_millis(500)))
    }
}

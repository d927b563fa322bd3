//! Single-use nonces.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tollgate_store::Cache;

use crate::error::Result;

/// Issues nonces and consumes each at most once.
#[async_trait]
pub trait NonceStore: Send + Sync {
    /// Generate a fresh nonce and record it as unused.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the backing cache fails.
    async fn issue(&self) -> Result<String>;

    /// Consume `nonce`.
    ///
    /// Returns `Ok(false)` when the nonce is unknown, expired, or already
    /// consumed. Concurrent calls for the same nonce return `true` at most once.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the backing cache fails.
    async fn consume(&self, nonce: &str) -> Result<bool>;
}

/// Cache key for a nonce.
fn nonce_key(nonce: &str) -> String {
    format!("nonce:{nonce}")
}

/// A [`NonceStore`] backed by the shared cache.
pub struct CacheNonceStore {
    cache: Arc<dyn Cache>,
    ttl: Duration,
}

impl CacheNonceStore {
    /// Create a store whose nonces live for `ttl`.
    #[must_use]
    pub fn new(cache: Arc<dyn Cache>, ttl: Duration) -> Self {
        Self { cache, ttl }
    }
}

#[async_trait]
impl NonceStore for CacheNonceStore {
    async fn issue(&self) -> Result<String> {
        let nonce = uuid::Uuid::new_v4().to_string();
        self.cache.set(&nonce_key(&nonce), "1", self.ttl).await?;
        tracing::debug!(ttl_secs = self.ttl.as_secs(), "Issued nonce");
        Ok(nonce)
    }

    async fn consume(&self, nonce: &str) -> Result<bool> {
        if nonce.is_empty() {
            return Ok(false);
        }
        Ok(self.cache.take(&nonce_key(nonce)).await?)
    }
}

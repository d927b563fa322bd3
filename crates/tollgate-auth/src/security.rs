//! The replay-protection service.
//!
//! Combines the nonce store, timestamp window and signature check behind one
//! trait so the HTTP layer can hold a single `Arc<dyn SecurityService>`.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tollgate_store::Cache;

use crate::config::SecurityConfig;
use crate::error::{AuthError, Result};
use crate::nonce::{CacheNonceStore, NonceStore};
use crate::signature::{Params, SignatureValidator};
use crate::timestamp::TimestampValidator;

/// Checks that a request is fresh, unique and untampered.
#[async_trait]
pub trait SecurityService: Send + Sync {
    /// Issue a new single-use nonce.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the nonce cannot be recorded.
    async fn generate_nonce(&self) -> Result<String>;

    /// Check a millisecond timestamp against `window` (zero means default).
    ///
    /// # Errors
    ///
    /// Returns `InvalidFormat` or `OutOfWindow`.
    fn validate_timestamp(&self, timestamp: &str, window: Duration) -> Result<()>;

    /// Consume `nonce`.
    ///
    /// # Errors
    ///
    /// Returns `NonceInvalidOrExpired` if it was not outstanding, or
    /// `Unavailable` if the store cannot be reached.
    async fn validate_nonce(&self, nonce: &str) -> Result<()>;

    /// Check `signature` against the canonical form of `params`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidSignature` on mismatch.
    fn validate_signature(&self, params: &Params, signature: &str) -> Result<()>;

    /// Compute the signature for `params`.
    fn sign(&self, params: &Params) -> String;
}

/// Default [`SecurityService`] implementation.
pub struct DefaultSecurityService<N: NonceStore = CacheNonceStore> {
    nonces: N,
    timestamps: TimestampValidator,
    signatures: SignatureValidator,
}

impl DefaultSecurityService<CacheNonceStore> {
    /// Create a service whose nonces live in `cache`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the configuration is invalid.
    pub fn new(config: &SecurityConfig, cache: Arc<dyn Cache>) -> Result<Self> {
        let nonces = CacheNonceStore::new(cache, config.nonce_ttl());
        Self::with_nonce_store(config, nonces)
    }
}

impl<N: NonceStore> DefaultSecurityService<N> {
    /// Create a service with a custom nonce store.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the configuration is invalid.
    pub fn with_nonce_store(config: &SecurityConfig, nonces: N) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            nonces,
            timestamps: TimestampValidator::new(config.timestamp_window()),
            signatures: SignatureValidator::new(config.signing_secret.as_bytes())?,
        })
    }
}

#[async_trait]
impl<N: NonceStore> SecurityService for DefaultSecurityService<N> {
    async fn generate_nonce(&self) -> Result<String> {
        self.nonces.issue().await
    }

    fn validate_timestamp(&self, timestamp: &str, window: Duration) -> Result<()> {
        self.timestamps.validate(timestamp, window)
    }

    async fn validate_nonce(&self, nonce: &str) -> Result<()> {
        if self.nonces.consume(nonce).await? {
            Ok(())
        } else {
            Err(AuthError::NonceInvalidOrExpired)
        }
    }

    fn validate_signature(&self, params: &Params, signature: &str) -> Result<()> {
        self.signatures.validate(params, signature)
    }

    fn sign(&self, params: &Params) -> String {
        self.signatures.sign(params)
    }
}

//! Request replay protection and token lifecycle for tollgate.
//!
//! This crate provides the two security services the gateway depends on:
//!
//! - [`SecurityService`]: timestamp window, single-use nonces and HMAC request
//!   signatures
//! - [`TokenService`]: HS256 access/refresh token pairs with rotation and
//!   revocation
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────┐     ┌──────────────────────┐
//! │   Gateway        │────▶│   SecurityService    │
//! │   (HTTP)         │     │   (trait)            │
//! └────────┬─────────┘     └──────────┬───────────┘
//!          │                          │
//!          │               ┌──────────▼───────────┐
//!          │               │   NonceStore         │
//!          │               └──────────┬───────────┘
//!          │                          │
//! ┌────────▼─────────┐     ┌──────────▼───────────┐
//! │   TokenService   │────▶│   Cache              │
//! │   (trait)        │     │   (Redis / memory)   │
//! └──────────────────┘     └──────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tollgate_auth::{JwtTokenService, TokenConfig, TokenService, TokenType};
//! use tollgate_core::UserId;
//! use tollgate_store::MemoryCache;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let tokens = JwtTokenService::new(
//!     TokenConfig::new("access-secret", "refresh-secret"),
//!     Arc::new(MemoryCache::new()),
//! )?;
//!
//! let pair = tokens.issue_pair(&UserId::generate(), "u1@example.com", "user")?;
//! let claims = tokens.validate(&pair.access_token, TokenType::Access).await?;
//!
//! println!("User: {}", claims.user_id);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod config;
pub mod error;
pub mod nonce;
pub mod security;
pub mod signature;
pub mod timestamp;
pub mod token;

pub use config::{SecurityConfig, TokenConfig};
pub use error::{AuthError, Result};
pub use nonce::{CacheNonceStore, NonceStore};
pub use security::{DefaultSecurityService, SecurityService};
pub use signature::{Params, SignatureValidator, SIGN_FIELD};
pub use timestamp::TimestampValidator;
pub use token::{Claims, JwtTokenService, TokenPair, TokenService, TokenType};

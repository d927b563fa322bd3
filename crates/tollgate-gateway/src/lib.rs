//! HTTP gateway for tollgate.
//!
//! This crate exposes the account API under `/api/v1`. Every request there
//! carries a millisecond timestamp, a single-use nonce and an HMAC signature
//! over its parameters; routes that need an identity additionally require a
//! bearer access token.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Clients                            │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      tollgate-gateway                       │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │  Security   │ │    Auth     │ │  Router + Handlers  │    │
//! │  │ (ts/nonce/  │ │  (bearer,   │ │                     │    │
//! │  │  signature) │ │  role gate) │ │                     │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!               ┌──────────────┼──────────────┐
//!               ▼              ▼              ▼
//!        ┌──────────┐   ┌──────────┐   ┌──────────┐
//!        │ Accounts │   │  Tokens  │   │  Cache   │
//!        │ (RocksDB)│   │  (JWT)   │   │ (Redis)  │
//!        └──────────┘   └──────────┘   └──────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use tollgate_accounts::{Accounts, AccountsConfig};
//! use tollgate_auth::{
//!     DefaultSecurityService, JwtTokenService, SecurityConfig, SecurityService, TokenConfig,
//!     TokenService,
//! };
//! use tollgate_gateway::{create_router, GatewayConfig, GatewayState};
//! use tollgate_store::{MemoryCache, RocksStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/tollgate")?);
//! let cache = Arc::new(MemoryCache::new());
//!
//! let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
//!     TokenConfig::new("access-secret", "refresh-secret"),
//!     cache.clone(),
//! )?);
//! let security: Arc<dyn SecurityService> = Arc::new(DefaultSecurityService::new(
//!     &SecurityConfig::new("signing-secret"),
//!     cache,
//! )?);
//! let accounts = Arc::new(Accounts::new(
//!     store,
//!     Arc::clone(&tokens),
//!     AccountsConfig::default(),
//! ));
//!
//! let state = GatewayState::new(accounts, security, tokens, GatewayConfig::default());
//! let app = create_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
//! axum::serve(listener, app).await?;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod routes;
pub mod state;

#[cfg(test)]
mod testing;

pub use config::{AdminBootstrap, ConfigError, GatewayConfig, Settings};
pub use error::ApiError;
pub use middleware::AuthUser;
pub use routes::create_router;
pub use state::GatewayState;

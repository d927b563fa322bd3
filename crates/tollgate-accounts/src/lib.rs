//! User accounts for tollgate.
//!
//! This crate provides the business logic behind the gateway's auth and user
//! routes: registration, login, token refresh and logout, profile updates and
//! administration. It coordinates the user store with the token service.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Gateway (HTTP)                         │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         Accounts                            │
//! │  ┌─────────────┐ ┌─────────────┐ ┌─────────────────────┐    │
//! │  │ Credentials │ │  Profile    │ │   Administration    │    │
//! │  └─────────────┘ └─────────────┘ └─────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                ┌─────────────┴─────────────┐
//!                ▼                           ▼
//!         ┌──────────────┐           ┌──────────────┐
//!         │    Store     │           │ TokenService │
//!         │  (RocksDB)   │           │    (JWT)     │
//!         └──────────────┘           └──────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use tollgate_accounts::{AccountService, Accounts, AccountsConfig, CreateUserRequest};
//! use tollgate_auth::{JwtTokenService, TokenConfig};
//! use tollgate_store::{MemoryCache, RocksStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = Arc::new(RocksStore::open("/tmp/tollgate")?);
//! let tokens = Arc::new(JwtTokenService::new(
//!     TokenConfig::new("access-secret", "refresh-secret"),
//!     Arc::new(MemoryCache::new()),
//! )?);
//!
//! let accounts = Accounts::new(store, tokens, AccountsConfig::default());
//!
//! let request = CreateUserRequest::new("u1@example.com", "u1", "password123");
//! let user = accounts.register(request).await?;
//! let login = accounts.login("u1@example.com", "password123").await?;
//!
//! println!("{} logged in, token expires in {}s", user.user_id, login.tokens.expires_in);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod error;
pub mod password;
pub mod service;
pub mod types;

pub use error::{AccountError, Result};
pub use service::{AccountService, Accounts};
pub use types::{
    AccountsConfig, AdminUpdateRequest, CreateUserRequest, LoginResult, UpdateProfileRequest,
};

// Re-export commonly used types from dependencies for convenience
pub use tollgate_core::UserId;
pub use tollgate_store::User;

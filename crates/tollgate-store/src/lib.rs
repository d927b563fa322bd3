//! Storage layer for tollgate.
//!
//! This crate provides the two backends the service talks to:
//!
//! - a [`Store`] for user accounts, implemented on `RocksDB` with column
//!   families for the unique email and username indexes;
//! - a [`Cache`] for short-lived keys (nonces, token revocations), implemented
//!   on Redis and, for single-process deployments and tests, in memory.
//!
//! # Architecture
//!
//! The `RocksDB` store uses the following column families:
//!
//! - `users`: Primary user records, keyed by `user_id`
//! - `users_by_email`: Index from lowercased email to `user_id`
//! - `users_by_username`: Index from username to `user_id`
//!
//! # Example
//!
//! ```no_run
//! use tollgate_store::{RocksStore, Store};
//!
//! let store = RocksStore::open("/tmp/tollgate-db").unwrap();
//!
//! // Look a user up by email
//! let user = store.get_user_by_email("u1@example.com").unwrap();
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod cache;
pub mod error;
pub mod keys;
pub mod rocks;
pub mod schema;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod testing;

pub use cache::{Cache, CacheConfig, MemoryCache, RedisCache};
pub use error::{CacheError, CacheResult, Result, StoreError};
pub use rocks::RocksStore;
pub use types::User;

use tollgate_core::UserId;

/// The storage trait defining all user database operations.
///
/// This trait abstracts the storage layer, allowing for different implementations
/// (e.g., `RocksDB`, in-memory for testing).
pub trait Store: Send + Sync {
    // =========================================================================
    // User Operations
    // =========================================================================

    /// Insert a new user record.
    ///
    /// The email and username indexes are checked and written in the same
    /// critical section, so two concurrent inserts cannot claim the same email.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::EmailTaken` or `StoreError::UsernameTaken` if either
    /// value already belongs to another user.
    fn insert_user(&self, user: &User) -> Result<()>;

    /// Update an existing user record.
    ///
    /// Index entries are moved if the email or username changed.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist, or a
    /// uniqueness error if the new email or username is taken.
    fn put_user(&self, user: &User) -> Result<()>;

    /// Re-read a user and apply `apply` to it under the write lock.
    ///
    /// Changes decided after an `.await` go through here so they apply to the
    /// current record rather than a stale copy. Nothing is written if `apply`
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist, a uniqueness
    /// error if the new email or username is taken, or the closure's error.
    fn update_user<F, E>(&self, user_id: &UserId, apply: F) -> std::result::Result<User, E>
    where
        F: FnOnce(&mut User) -> std::result::Result<(), E>,
        E: From<StoreError>,
        Self: Sized;

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user(&self, user_id: &UserId) -> Result<Option<User>>;

    /// Get a user by email (case-insensitive).
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_email(&self, email: &str) -> Result<Option<User>>;

    /// Get a user by username.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails.
    fn get_user_by_username(&self, username: &str) -> Result<Option<User>>;

    /// Delete a user by ID.
    ///
    /// This also removes the user from all indexes.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the user doesn't exist.
    fn delete_user(&self, user_id: &UserId) -> Result<()>;
}

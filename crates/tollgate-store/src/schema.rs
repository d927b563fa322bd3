//! Database schema definitions and column families.
//!
//! This module defines the column families used in `RocksDB` storage.

/// Column family names for the `RocksDB` database.
pub mod cf {
    /// Primary user records, keyed by `user_id`.
    pub const USERS: &str = "users";

    /// Index: user ID by lowercased email.
    pub const USERS_BY_EMAIL: &str = "users_by_email";

    /// Index: user ID by username.
    pub const USERS_BY_USERNAME: &str = "users_by_username";
}

/// Returns all column family names for database initialization.
#[must_use]
pub fn all_column_families() -> Vec<&'static str> {
    vec![cf::USERS, cf::USERS_BY_EMAIL, cf::USERS_BY_USERNAME]
}

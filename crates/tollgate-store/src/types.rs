//! Record types stored in the database.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tollgate_core::UserId;

/// A user account record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Unique identifier for the user.
    pub user_id: UserId,
    /// Login email, unique across all users (stored lowercased).
    pub email: String,
    /// Display handle, unique across all users.
    pub username: String,
    /// bcrypt hash of the password.
    pub password_hash: String,
    /// Role name (see `tollgate_core::role`).
    pub role: String,
    /// Inactive accounts cannot log in.
    pub active: bool,
    /// Optional avatar URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Time of the last successful login.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

impl User {
    /// Normalize an email address for storage and lookup.
    #[must_use]
    pub fn normalize_email(email: &str) -> String {
        email.trim().to_ascii_lowercase()
    }
}

//! Key encoding utilities for `RocksDB`.
//!
//! Primary records are keyed by the raw user ID bytes. The secondary indexes
//! map a normalized lookup value to those same bytes.

use tollgate_core::UserId;

/// Encode a user key (just the user ID bytes).
#[must_use]
pub fn user_key(user_id: &UserId) -> Vec<u8> {
    user_id.as_bytes().to_vec()
}

/// Encode an email index key.
///
/// Emails are compared case-insensitively, so the key is lowercased.
#[must_use]
pub fn email_key(email: &str) -> Vec<u8> {
    email.trim().to_ascii_lowercase().into_bytes()
}

/// Encode a username index key.
#[must_use]
pub fn username_key(username: &str) -> Vec<u8> {
    username.as_bytes().to_vec()
}

/// Decode a user ID from an index value.
///
/// Returns `None` if the value is not 16 bytes long.
#[must_use]
pub fn decode_user_id(value: &[u8]) -> Option<UserId> {
    let bytes: [u8; 16] = value.try_into().ok()?;
    Some(UserId::from_bytes(bytes))
}

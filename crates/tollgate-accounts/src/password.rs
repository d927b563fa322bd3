//! Password hashing via bcrypt.
//!
//! bcrypt is deliberately slow, so both operations run on the blocking pool.

use crate::error::{AccountError, Result};

/// Hash a password with bcrypt at `cost`.
///
/// # Errors
///
/// Returns `AccountError::Internal` if hashing fails.
pub async fn hash_password(password: &str, cost: u32) -> Result<String> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(|e| AccountError::Internal(format!("hash task: {e}")))?
        .map_err(|e| AccountError::Internal(format!("bcrypt hash: {e}")))
}

/// Verify a password against a bcrypt hash.
///
/// # Errors
///
/// Returns `AccountError::Internal` if the stored hash is malformed.
pub async fn verify_password(password: &str, hash: &str) -> Result<bool> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AccountError::Internal(format!("verify task: {e}")))?
        .map_err(|e| AccountError::Internal(format!("bcrypt verify: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    const COST: u32 = 4;

    #[tokio::test]
    async fn hash_then_verify() {
        let hash = hash_password("correct horse", COST).await.unwrap();
        assert!(hash.starts_with("$2"));
        assert!(verify_password("correct horse", &hash).await.unwrap());
        assert!(!verify_password("wrong horse", &hash).await.unwrap());
    }

    #[tokio::test]
    async fn hashes_are_salted() {
        let a = hash_password("same", COST).await.unwrap();
        let b = hash_password("same", COST).await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn malformed_hash_is_internal_error() {
        let result = verify_password("x", "not-a-bcrypt-hash").await;
        assert!(matches!(result, Err(AccountError::Internal(_))));
    }
}

//! Authentication error types.

use thiserror::Error;
use tollgate_store::CacheError;

use crate::token::TokenType;

/// A result type using `AuthError`.
pub type Result<T> = std::result::Result<T, AuthError>;

/// Errors raised by request validation and the token lifecycle.
///
/// Each failure mode has its own variant so the HTTP layer can choose a status
/// code and a log level per kind.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required request field is missing or malformed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The request timestamp lies outside the accepted window.
    #[error("timestamp out of window: skew {skew_ms}ms exceeds {window_ms}ms")]
    OutOfWindow {
        /// Server time minus request time.
        skew_ms: i64,
        /// The window that was applied.
        window_ms: i64,
    },

    /// The nonce was never issued, already used, or has expired.
    #[error("nonce invalid or expired")]
    NonceInvalidOrExpired,

    /// The request signature does not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// The token header names an algorithm other than HS256.
    #[error("unexpected signing algorithm: {0}")]
    SigningMismatch(String),

    /// The token is of the wrong type for this use.
    #[error("token type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        /// The type the caller asked for.
        expected: TokenType,
        /// The type embedded in the token.
        found: TokenType,
    },

    /// The token has expired.
    #[error("token expired")]
    TokenExpired,

    /// The token's not-before time is in the future.
    #[error("token not yet valid")]
    NotYetValid,

    /// The token has been revoked.
    #[error("token revoked")]
    Revoked,

    /// The token could not be decoded or verified.
    #[error("invalid token: {0}")]
    InvalidToken(String),

    /// The cache backing nonces and revocations could not be reached.
    #[error("security store unavailable: {0}")]
    Unavailable(#[from] CacheError),

    /// An internal error occurred.
    #[error("internal error: {0}")]
    Internal(String),
}

impl AuthError {
    /// Returns `true` if the failure says nothing about the request itself.
    ///
    /// Transient failures must not be treated as rejections.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Unavailable(_))
    }

    /// Returns `true` if this failure is worth a security log entry.
    #[must_use]
    pub const fn is_security_event(&self) -> bool {
        matches!(
            self,
            Self::InvalidSignature | Self::SigningMismatch(_) | Self::Revoked
        )
    }

    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::InvalidFormat(_)
            | Self::OutOfWindow { .. }
            | Self::NonceInvalidOrExpired
            | Self::InvalidSignature => 400,
            Self::SigningMismatch(_)
            | Self::TypeMismatch { .. }
            | Self::TokenExpired
            | Self::NotYetValid
            | Self::Revoked
            | Self::InvalidToken(_) => 401,
            Self::Unavailable(_) => 503,
            Self::Internal(_) => 500,
        }
    }
}

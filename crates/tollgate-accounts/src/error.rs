//! Error types for account operations.

use thiserror::Error;
use tollgate_auth::AuthError;
use tollgate_core::UserId;
use tollgate_store::StoreError;

/// A result type using `AccountError`.
pub type Result<T> = std::result::Result<T, AccountError>;

/// Errors that can occur in account operations.
#[derive(Debug, Error)]
pub enum AccountError {
    /// The requested user was not found.
    #[error("user not found: {0}")]
    UserNotFound(UserId),

    /// The email address is already registered.
    #[error("email already registered")]
    EmailTaken,

    /// The username is already taken.
    #[error("username already taken")]
    UsernameTaken,

    /// Unknown email or wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// The account has been deactivated.
    #[error("account is disabled")]
    AccountDisabled,

    /// Self-service registration is turned off.
    #[error("registration is disabled")]
    RegistrationDisabled,

    /// A request field failed validation.
    #[error("validation failed: {0}")]
    Validation(String),

    /// Storage layer error.
    #[error("storage error: {0}")]
    Store(StoreError),

    /// Token or replay-protection error.
    #[error("authentication error: {0}")]
    Auth(#[from] AuthError),

    /// Internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl From<StoreError> for AccountError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::EmailTaken => Self::EmailTaken,
            StoreError::UsernameTaken => Self::UsernameTaken,
            other => Self::Store(other),
        }
    }
}

impl AccountError {
    /// Returns the appropriate HTTP status code for this error.
    #[must_use]
    pub const fn http_status_code(&self) -> u16 {
        match self {
            Self::UserNotFound(_) => 404,
            Self::EmailTaken | Self::UsernameTaken => 409,
            Self::InvalidCredentials => 401,
            Self::AccountDisabled | Self::RegistrationDisabled => 403,
            Self::Validation(_) => 400,
            Self::Store(StoreError::Database(_)) => 503,
            Self::Store(StoreError::NotFound) => 404,
            Self::Store(_) | Self::Internal(_) => 500,
            Self::Auth(e) => e.http_status_code(),
        }
    }

    /// Returns true if this error might be resolved by retrying.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Store(StoreError::Database(_)) => true,
            Self::Auth(e) => e.is_transient(),
            _ => false,
        }
    }
}

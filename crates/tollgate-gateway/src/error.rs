//! API error types and responses.
//!
//! This module defines the standard error format for all API responses and is
//! the only place where service errors are translated into HTTP.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use thiserror::Error;

use tollgate_accounts::AccountError;
use tollgate_auth::AuthError;
use tollgate_store::StoreError;

/// API error type that implements `IntoResponse`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// A required security field is missing or malformed.
    #[error("invalid format: {0}")]
    InvalidFormat(String),

    /// The request timestamp is too far from server time.
    #[error("timestamp out of window")]
    OutOfWindow,

    /// The nonce was never issued, already used, or expired.
    #[error("nonce invalid or expired")]
    NonceInvalid,

    /// The request signature does not match.
    #[error("invalid signature")]
    InvalidSignature,

    /// Missing or invalid access token.
    #[error("unauthenticated: {0}")]
    Unauthenticated(String),

    /// The presented token has been revoked.
    #[error("token revoked")]
    Revoked,

    /// Wrong email or password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User does not have permission to access this resource.
    #[error("forbidden")]
    Forbidden,

    /// The account has been deactivated.
    #[error("account disabled")]
    AccountDisabled,

    /// Self-service registration is turned off.
    #[error("registration disabled")]
    RegistrationDisabled,

    /// The requested resource was not found.
    #[error("not found: {0}")]
    NotFound(String),

    /// The request conflicts with existing data.
    #[error("conflict: {0}")]
    Conflict(String),

    /// Invalid request body or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// The request body is larger than the configured limit.
    #[error("payload too large")]
    PayloadTooLarge,

    /// A backing service could not be reached.
    #[error("service unavailable")]
    Unavailable,

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

/// Error response body.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: ErrorBody,
}

/// Error details.
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: &'static str,
    message: String,
}

impl ApiError {
    /// Get the HTTP status code for this error.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidFormat(_)
            | Self::OutOfWindow
            | Self::NonceInvalid
            | Self::InvalidSignature
            | Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::Unauthenticated(_) | Self::Revoked | Self::InvalidCredentials => {
                StatusCode::UNAUTHORIZED
            }
            Self::Forbidden | Self::AccountDisabled | Self::RegistrationDisabled => {
                StatusCode::FORBIDDEN
            }
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            Self::Unavailable => StatusCode::SERVICE_UNAVAILABLE,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Get the error code string for this error.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat(_) => "invalid_format",
            Self::OutOfWindow => "timestamp_out_of_window",
            Self::NonceInvalid => "nonce_invalid",
            Self::InvalidSignature => "invalid_signature",
            Self::Unauthenticated(_) => "unauthenticated",
            Self::Revoked => "token_revoked",
            Self::InvalidCredentials => "invalid_credentials",
            Self::Forbidden => "forbidden",
            Self::AccountDisabled => "account_disabled",
            Self::RegistrationDisabled => "registration_disabled",
            Self::NotFound(_) => "not_found",
            Self::Conflict(_) => "conflict",
            Self::BadRequest(_) => "bad_request",
            Self::PayloadTooLarge => "payload_too_large",
            Self::Unavailable => "service_unavailable",
            Self::Internal(_) => "internal_error",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let code = self.code();
        let message = self.to_string();

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        (status, Json(body)).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidFormat(msg) => Self::InvalidFormat(msg),
            AuthError::OutOfWindow { .. } => Self::OutOfWindow,
            AuthError::NonceInvalidOrExpired => Self::NonceInvalid,
            AuthError::InvalidSignature => Self::InvalidSignature,
            AuthError::Revoked => Self::Revoked,
            AuthError::TokenExpired => Self::Unauthenticated("token expired".to_string()),
            AuthError::NotYetValid => Self::Unauthenticated("token not yet valid".to_string()),
            AuthError::SigningMismatch(_)
            | AuthError::TypeMismatch { .. }
            | AuthError::InvalidToken(_) => Self::Unauthenticated("invalid token".to_string()),
            AuthError::Unavailable(cache_err) => {
                tracing::error!(error = %cache_err, "Security store unavailable");
                Self::Unavailable
            }
            AuthError::Internal(msg) => {
                tracing::error!(error = %msg, "Auth internal error");
                Self::Internal("authentication service error".to_string())
            }
        }
    }
}

impl From<AccountError> for ApiError {
    fn from(err: AccountError) -> Self {
        match err {
            AccountError::UserNotFound(id) => Self::NotFound(format!("user {id}")),
            AccountError::EmailTaken => Self::Conflict("email already registered".to_string()),
            AccountError::UsernameTaken => Self::Conflict("username already taken".to_string()),
            AccountError::InvalidCredentials => Self::InvalidCredentials,
            AccountError::AccountDisabled => Self::AccountDisabled,
            AccountError::RegistrationDisabled => Self::RegistrationDisabled,
            AccountError::Validation(msg) => Self::BadRequest(msg),
            AccountError::Auth(auth_err) => Self::from(auth_err),
            AccountError::Store(StoreError::Database(msg)) => {
                tracing::error!(error = %msg, "Store unavailable");
                Self::Unavailable
            }
            AccountError::Store(store_err) => {
                tracing::error!(error = %store_err, "Store error");
                Self::Internal("storage error".to_string())
            }
            AccountError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal error");
                Self::Internal(msg)
            }
        }
    }
}

//! Registration, login and token endpoints.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};

use tollgate_accounts::{AccountService, CreateUserRequest};
use tollgate_auth::{Claims, TokenPair};

use crate::error::ApiError;
use crate::handlers::users::UserResponse;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Response carrying a fresh nonce.
#[derive(Debug, Serialize)]
pub struct NonceResponse {
    /// Single-use nonce for the next signed request.
    pub nonce: String,
}

/// Registration request. A client-supplied role is ignored.
#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    /// Login email.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Plaintext password.
    pub password: String,
}

/// Login request.
#[derive(Debug, Deserialize)]
pub struct LoginBody {
    /// Login email.
    pub email: String,
    /// Plaintext password.
    pub password: String,
}

/// Login response.
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// The authenticated user.
    pub user: UserResponse,
    /// Access token.
    pub access_token: String,
    /// Refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Refresh request.
#[derive(Debug, Deserialize)]
pub struct RefreshBody {
    /// The refresh token to exchange.
    pub refresh_token: String,
}

/// Logout request body. Optional as a whole.
#[derive(Debug, Default, Deserialize)]
pub struct LogoutBody {
    /// A refresh token to revoke along with the access token.
    #[serde(default)]
    pub refresh_token: Option<String>,
}

// =============================================================================
// Handlers
// =============================================================================

/// Issue a nonce.
///
/// # Errors
///
/// Returns `Unavailable` if the nonce cannot be recorded.
pub async fn nonce<A>(
    State(state): State<Arc<GatewayState<A>>>,
) -> Result<Json<NonceResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let nonce = state.security.generate_nonce().await?;
    Ok(Json(NonceResponse { nonce }))
}

/// Register a new user.
///
/// # Errors
///
/// Returns `RegistrationDisabled`, `BadRequest` on validation failure, or
/// `Conflict` if the email or username is taken.
pub async fn register<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Json(body): Json<RegisterBody>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AccountService + 'static,
{
    let request = CreateUserRequest::new(body.email, body.username, body.password);
    let user = state.accounts.register(request).await?;

    Ok((StatusCode::CREATED, Json(UserResponse::from(user))))
}

/// Log in with email and password.
///
/// # Errors
///
/// Returns `InvalidCredentials` or `AccountDisabled`.
pub async fn login<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Json(body): Json<LoginBody>,
) -> Result<Json<LoginResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let result = state.accounts.login(&body.email, &body.password).await?;

    Ok(Json(LoginResponse {
        user: UserResponse::from(result.user),
        access_token: result.tokens.access_token,
        refresh_token: result.tokens.refresh_token,
        expires_in: result.tokens.expires_in,
    }))
}

/// Exchange a refresh token for a new pair.
///
/// # Errors
///
/// Returns `Unauthenticated` for an unusable token and `Revoked` on replay.
pub async fn refresh<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Json(body): Json<RefreshBody>,
) -> Result<Json<TokenPair>, ApiError>
where
    A: AccountService + 'static,
{
    let pair = state.accounts.refresh(&body.refresh_token).await?;
    Ok(Json(pair))
}

/// Revoke the caller's tokens.
///
/// # Errors
///
/// Returns `Unavailable` if the revocation cannot be recorded.
pub async fn logout<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Extension(claims): Extension<Claims>,
    body: Option<Json<LogoutBody>>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AccountService + 'static,
{
    let body = body.map(|Json(b)| b).unwrap_or_default();
    state
        .accounts
        .logout(&claims, body.refresh_token.as_deref())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

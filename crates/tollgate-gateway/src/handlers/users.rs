//! Endpoints for the caller's own account.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use tollgate_accounts::{AccountService, UpdateProfileRequest, User};

use crate::error::ApiError;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

// =============================================================================
// Request/Response Types
// =============================================================================

/// Public view of a user. Never includes the password hash.
#[derive(Debug, Serialize, Deserialize)]
pub struct UserResponse {
    /// User ID.
    pub id: String,
    /// Login email.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Role name.
    pub role: String,
    /// Whether the account can log in.
    pub active: bool,
    /// Avatar URL.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Last successful login.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_login_at: Option<DateTime<Utc>>,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last update timestamp.
    pub updated_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.user_id.to_string(),
            email: user.email,
            username: user.username,
            role: user.role,
            active: user.active,
            avatar_url: user.avatar_url,
            last_login_at: user.last_login_at,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

/// Request to change the caller's password.
#[derive(Debug, Deserialize)]
pub struct ChangePasswordBody {
    /// The current password.
    pub current_password: String,
    /// The replacement password.
    pub new_password: String,
}

// =============================================================================
// Handlers
// =============================================================================

/// Get the caller's profile.
///
/// # Errors
///
/// Returns `NotFound` if the account was deleted after the token was issued.
pub async fn get_me<A>(
    State(state): State<Arc<GatewayState<A>>>,
    user: AuthUser,
) -> Result<Json<UserResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let record = state.accounts.get_user(&user.user_id).await?;
    Ok(Json(UserResponse::from(record)))
}

/// Update the caller's username and avatar.
///
/// # Errors
///
/// Returns `BadRequest` for an invalid username or `Conflict` if it is taken.
pub async fn update_me<A>(
    State(state): State<Arc<GatewayState<A>>>,
    user: AuthUser,
    Json(body): Json<UpdateProfileRequest>,
) -> Result<Json<UserResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let record = state.accounts.update_profile(&user.user_id, body).await?;
    Ok(Json(UserResponse::from(record)))
}

/// Change the caller's password.
///
/// # Errors
///
/// Returns `InvalidCredentials` if the current password is wrong.
pub async fn change_password<A>(
    State(state): State<Arc<GatewayState<A>>>,
    user: AuthUser,
    Json(body): Json<ChangePasswordBody>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AccountService + 'static,
{
    state
        .accounts
        .change_password(&user.user_id, &body.current_password, &body.new_password)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}

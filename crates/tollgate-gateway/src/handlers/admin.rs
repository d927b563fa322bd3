//! Administrator endpoints. Routed behind the `admin` role gate.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;

use tollgate_accounts::{AccountService, AdminUpdateRequest};
use tollgate_core::UserId;

use crate::error::ApiError;
use crate::handlers::users::UserResponse;
use crate::middleware::AuthUser;
use crate::state::GatewayState;

fn parse_user_id(id: &str) -> Result<UserId, ApiError> {
    id.parse()
        .map_err(|_| ApiError::BadRequest(format!("invalid user id: {id}")))
}

/// Get any user.
///
/// # Errors
///
/// Returns `BadRequest` for a malformed ID and `NotFound` for an unknown one.
pub async fn get_user<A>(
    State(state): State<Arc<GatewayState<A>>>,
    Path(id): Path<String>,
) -> Result<Json<UserResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let user_id = parse_user_id(&id)?;
    let user = state.accounts.get_user(&user_id).await?;
    Ok(Json(UserResponse::from(user)))
}

/// Update any user's username, avatar, role or active flag.
///
/// # Errors
///
/// Returns `BadRequest` for invalid values, `NotFound` or `Conflict`.
pub async fn update_user<A>(
    State(state): State<Arc<GatewayState<A>>>,
    admin: AuthUser,
    Path(id): Path<String>,
    Json(body): Json<AdminUpdateRequest>,
) -> Result<Json<UserResponse>, ApiError>
where
    A: AccountService + 'static,
{
    let user_id = parse_user_id(&id)?;
    let user = state.accounts.admin_update(&user_id, body).await?;

    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, "Admin updated user");
    Ok(Json(UserResponse::from(user)))
}

/// Delete any user.
///
/// # Errors
///
/// Returns `BadRequest` for a malformed ID and `NotFound` for an unknown one.
pub async fn delete_user<A>(
    State(state): State<Arc<GatewayState<A>>>,
    admin: AuthUser,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ApiError>
where
    A: AccountService + 'static,
{
    let user_id = parse_user_id(&id)?;
    state.accounts.delete_user(&user_id).await?;

    tracing::info!(admin_id = %admin.user_id, user_id = %user_id, "Admin deleted user");
    Ok(StatusCode::NO_CONTENT)
}

//! Authentication middleware and extractors.
//!
//! `require_auth` validates the `Authorization: Bearer <token>` header and
//! attaches the caller's identity to the request. Handlers read it back with
//! the [`AuthUser`] extractor.

use std::sync::Arc;

use axum::extract::{FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use axum::middleware::Next;
use axum::response::Response;
use chrono::{DateTime, Utc};

use tollgate_accounts::AccountService;
use tollgate_auth::{Claims, TokenType};
use tollgate_core::{role, TokenId, UserId};

use crate::error::ApiError;
use crate::state::GatewayState;

/// An authenticated caller, taken from a validated access token.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// The user the token was issued to.
    pub user_id: UserId,
    /// Email at token issuance.
    pub email: String,
    /// Role at token issuance.
    pub role: String,
    /// ID of the access token.
    pub token_id: TokenId,
    /// When the access token expires.
    pub expires_at: DateTime<Utc>,
}

impl AuthUser {
    /// Create an `AuthUser` from validated claims.
    #[must_use]
    pub fn from_claims(claims: &Claims) -> Self {
        Self {
            user_id: claims.user_id,
            email: claims.email.clone(),
            role: claims.role.clone(),
            token_id: claims.token_id,
            expires_at: claims.expires_at().unwrap_or_default(),
        }
    }

    /// Returns true if the caller holds `role`.
    #[must_use]
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Self>()
            .cloned()
            .ok_or_else(|| ApiError::Unauthenticated("missing credentials".to_string()))
    }
}

/// Extract the bearer token from the `Authorization` header.
#[must_use]
pub fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
}

fn attach(request: &mut Request, claims: Claims) {
    request.extensions_mut().insert(AuthUser::from_claims(&claims));
    request.extensions_mut().insert(claims);
}

/// Middleware requiring a valid access token.
///
/// # Errors
///
/// Returns `Unauthenticated` for a missing or invalid token and `Revoked` for
/// a revoked one.
pub async fn require_auth<A>(
    State(state): State<Arc<GatewayState<A>>>,
    mut request: Request,
    next: Next,
) -> Result<Response, ApiError>
where
    A: AccountService + 'static,
{
    let token = bearer_token(request.headers())
        .ok_or_else(|| ApiError::Unauthenticated("missing bearer token".to_string()))?
        .to_string();

    let claims = state
        .tokens
        .validate(&token, TokenType::Access)
        .await
        .map_err(|e| {
            if e.is_security_event() {
                tracing::warn!(target: "security", error = %e, "Access token rejected");
            }
            ApiError::from(e)
        })?;

    attach(&mut request, claims);
    Ok(next.run(request).await)
}

/// Middleware that attaches the caller's identity when a valid token is
/// present. Never rejects.
pub async fn optional_auth<A>(
    State(state): State<Arc<GatewayState<A>>>,
    mut request: Request,
    next: Next,
) -> Response
where
    A: AccountService + 'static,
{
    if let Some(token) = bearer_token(request.headers()).map(str::to_string) {
        match state.tokens.validate(&token, TokenType::Access).await {
            Ok(claims) => attach(&mut request, claims),
            Err(e) => tracing::debug!(error = %e, "Ignoring unusable optional token"),
        }
    }
    next.run(request).await
}

/// Reject callers whose role is not `required`.
///
/// Must run after [`require_auth`].
///
/// # Errors
///
/// Returns `Unauthenticated` if no identity is attached and `Forbidden` on a
/// role mismatch.
pub async fn require_role(
    required: &'static str,
    request: Request,
    next: Next,
) -> Result<Response, ApiError> {
    let user = request
        .extensions()
        .get::<AuthUser>()
        .ok_or_else(|| ApiError::Unauthenticated("missing credentials".to_string()))?;

    if !user.has_role(required) {
        tracing::warn!(
            target: "security",
            user_id = %user.user_id,
            role = %user.role,
            required,
            "Role check failed"
        );
        return Err(ApiError::Forbidden);
    }

    Ok(next.run(request).await)
}

/// [`require_role`] for the administrator role.
///
/// # Errors
///
/// See [`require_role`].
pub async fn require_admin(request: Request, next: Next) -> Result<Response, ApiError> {
    require_role(role::ADMIN, request, next).await
}

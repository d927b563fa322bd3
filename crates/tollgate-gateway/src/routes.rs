//! Router configuration.
//!
//! Each group of routes is wrapped with `route_layer` so that middleware
//! added later runs first: security, then auth, then the admin role gate.

use std::sync::Arc;
use std::time::Duration;

use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use tollgate_accounts::AccountService;

use crate::handlers::{admin, auth, health, users};
use crate::middleware::{require_admin, require_auth, require_security, require_timestamp};
use crate::state::GatewayState;

/// Create the gateway router with all routes and middleware.
///
/// # Routes
///
/// ## Public
/// - `GET /health` - Health check
///
/// ## Timestamp only
/// - `GET /api/v1/auth/nonce` - Issue a nonce
///
/// ## Signed
/// - `POST /api/v1/auth/register` - Register
/// - `POST /api/v1/auth/login` - Log in
/// - `POST /api/v1/auth/refresh` - Rotate a refresh token
///
/// ## Signed and authenticated
/// - `POST /api/v1/auth/logout` - Revoke tokens
/// - `GET /api/v1/users/me` - Own profile
/// - `PUT /api/v1/users/me` - Update own profile
/// - `POST /api/v1/users/change-password` - Change password
///
/// ## Signed, authenticated, role `admin`
/// - `GET /api/v1/admin/users/:id` - Get a user
/// - `PUT /api/v1/admin/users/:id` - Update a user
/// - `DELETE /api/v1/admin/users/:id` - Delete a user
pub fn create_router<A>(state: GatewayState<A>) -> Router
where
    A: AccountService + 'static,
{
    let cors = build_cors_layer(&state.config.cors_origins);
    let max_body_bytes = state.config.max_body_bytes;
    let request_timeout = state.config.request_timeout();

    let state = Arc::new(state);

    let nonce = Router::new()
        .route("/auth/nonce", get(auth::nonce::<A>))
        .route_layer(from_fn_with_state(
            Arc::clone(&state),
            require_timestamp::<A>,
        ));

    let admin = Router::new()
        .route(
            "/admin/users/:id",
            get(admin::get_user::<A>)
                .put(admin::update_user::<A>)
                .delete(admin::delete_user::<A>),
        )
        .route_layer(from_fn(require_admin));

    let authenticated = Router::new()
        .route("/auth/logout", post(auth::logout::<A>))
        .route(
            "/users/me",
            get(users::get_me::<A>).put(users::update_me::<A>),
        )
        .route("/users/change-password", post(users::change_password::<A>))
        .merge(admin)
        .route_layer(from_fn_with_state(Arc::clone(&state), require_auth::<A>));

    let signed = Router::new()
        .route("/auth/register", post(auth::register::<A>))
        .route("/auth/login", post(auth::login::<A>))
        .route("/auth/refresh", post(auth::refresh::<A>))
        .merge(authenticated)
        .route_layer(from_fn_with_state(
            Arc::clone(&state),
            require_security::<A>,
        ));

    Router::new()
        .route("/health", get(health::health))
        .nest("/api/v1", nonce.merge(signed))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .layer(RequestBodyLimitLayer::new(max_body_bytes))
        .layer(TimeoutLayer::new(request_timeout))
        .with_state(state)
}

/// Build the CORS layer from configured origins.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods(Any)
        .allow_headers(Any)
        .max_age(Duration::from_secs(3600));

    if origins.is_empty() || origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<_> = origins
            .iter()
            .filter_map(|o| match o.parse() {
                Ok(value) => Some(value),
                Err(_) => {
                    tracing::warn!(origin = %o, "Ignoring unparseable CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(origins)
    }
}

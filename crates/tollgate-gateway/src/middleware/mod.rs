//! Request middleware.
//!
//! Layering on `/api/v1`: [`security`] runs first on every route, then
//! [`auth`] on the routes that need a caller identity.

pub mod auth;
pub mod security;

pub use auth::{optional_auth, require_admin, require_auth, require_role, AuthUser};
pub use security::{require_security, require_timestamp};

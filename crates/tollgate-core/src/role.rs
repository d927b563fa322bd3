//! Role names.
//!
//! Roles are plain strings carried in tokens. The role gate compares them for
//! equality only; there is no hierarchy between roles.

/// Role assigned to self-registered accounts.
pub const USER: &str = "user";

/// Role required by the administrative endpoints.
pub const ADMIN: &str = "admin";

/// Returns `true` if `role` is one of the known role names.
#[must_use]
pub fn is_known(role: &str) -> bool {
    matches!(role, USER | ADMIN)
}

//! Request types and configuration for account operations.

use serde::{Deserialize, Serialize};
use tollgate_auth::TokenPair;
use tollgate_core::role;
use tollgate_store::User;

/// Request to register a new user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUserRequest {
    /// Login email.
    pub email: String,
    /// Display handle.
    pub username: String,
    /// Plaintext password, hashed before storage.
    pub password: String,
}

impl CreateUserRequest {
    /// Create a new registration request.
    #[must_use]
    pub fn new(
        email: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            email: email.into(),
            username: username.into(),
            password: password.into(),
        }
    }
}

/// Changes a user may make to their own profile.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateProfileRequest {
    /// New username.
    #[serde(default)]
    pub username: Option<String>,
    /// New avatar URL. An empty string clears it.
    #[serde(default)]
    pub avatar_url: Option<String>,
}

/// Changes an administrator may make to any user.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminUpdateRequest {
    /// New username.
    #[serde(default)]
    pub username: Option<String>,
    /// New avatar URL. An empty string clears it.
    #[serde(default)]
    pub avatar_url: Option<String>,
    /// New role.
    #[serde(default)]
    pub role: Option<String>,
    /// Activate or deactivate the account.
    #[serde(default)]
    pub active: Option<bool>,
}

/// The result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginResult {
    /// The authenticated user.
    pub user: User,
    /// Freshly issued tokens.
    pub tokens: TokenPair,
}

/// Configuration for the account service.
#[derive(Debug, Clone, Deserialize)]
pub struct AccountsConfig {
    /// Whether self-service registration is open.
    #[serde(default = "AccountsConfig::default_enable_registration")]
    pub enable_registration: bool,
    /// bcrypt cost factor.
    #[serde(default = "AccountsConfig::default_bcrypt_cost")]
    pub bcrypt_cost: u32,
    /// Role given to newly registered users.
    #[serde(default = "AccountsConfig::default_role")]
    pub default_role: String,
    /// Minimum password length in characters.
    #[serde(default = "AccountsConfig::default_min_password_len")]
    pub min_password_len: usize,
}

impl Default for AccountsConfig {
    fn default() -> Self {
        Self {
            enable_registration: Self::default_enable_registration(),
            bcrypt_cost: Self::default_bcrypt_cost(),
            default_role: Self::default_role(),
            min_password_len: Self::default_min_password_len(),
        }
    }
}

impl AccountsConfig {
    const fn default_enable_registration() -> bool {
        true
    }

    const fn default_bcrypt_cost() -> u32 {
        bcrypt::DEFAULT_COST
    }

    fn default_role() -> String {
        role::USER.to_string()
    }

    const fn default_min_password_len() -> usize {
        8
    }
}

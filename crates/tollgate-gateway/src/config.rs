//! Gateway configuration types.
//!
//! This module defines the HTTP-level configuration and [`Settings`], which
//! assembles every service's configuration from environment variables.

use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use tollgate_accounts::AccountsConfig;
use tollgate_auth::{SecurityConfig, TokenConfig};
use tollgate_store::CacheConfig;

/// Configuration for the HTTP gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct GatewayConfig {
    /// Listen address (e.g., "0.0.0.0:8080").
    #[serde(default = "GatewayConfig::default_listen_addr")]
    pub listen_addr: String,

    /// Allowed CORS origins.
    #[serde(default)]
    pub cors_origins: Vec<String>,

    /// Maximum request body size in bytes.
    #[serde(default = "GatewayConfig::default_max_body")]
    pub max_body_bytes: usize,

    /// Request timeout in seconds.
    #[serde(default = "GatewayConfig::default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl GatewayConfig {
    fn default_listen_addr() -> String {
        "0.0.0.0:8080".to_string()
    }

    const fn default_max_body() -> usize {
        1024 * 1024 // 1 MB
    }

    const fn default_request_timeout() -> u64 {
        30
    }

    /// Get the request timeout as a `Duration`.
    #[must_use]
    pub const fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            listen_addr: Self::default_listen_addr(),
            cors_origins: vec!["*".to_string()],
            max_body_bytes: Self::default_max_body(),
            request_timeout_seconds: Self::default_request_timeout(),
        }
    }
}

/// Credentials for the administrator created at startup.
#[derive(Clone)]
pub struct AdminBootstrap {
    /// Admin login email.
    pub email: String,
    /// Admin username.
    pub username: String,
    /// Admin password.
    pub password: String,
}

impl std::fmt::Debug for AdminBootstrap {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdminBootstrap")
            .field("email", &self.email)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Errors raised while reading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {reason}")]
    Invalid {
        /// The variable name.
        var: &'static str,
        /// Why the value was rejected.
        reason: String,
    },
}

/// Everything the gateway binary needs to start.
#[derive(Debug, Clone)]
pub struct Settings {
    /// HTTP settings.
    pub gateway: GatewayConfig,
    /// Replay-protection settings.
    pub security: SecurityConfig,
    /// Token settings.
    pub tokens: TokenConfig,
    /// Account settings.
    pub accounts: AccountsConfig,
    /// Cache backend settings.
    pub cache: CacheConfig,
    /// `RocksDB` directory.
    pub data_dir: String,
    /// Optional bootstrap administrator.
    pub admin: Option<AdminBootstrap>,
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a secret is missing or a value is malformed.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Read settings through `lookup`, which maps a variable name to its value.
    ///
    /// # Errors
    ///
    /// Returns a `ConfigError` if a secret is missing or a value is malformed.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let required = |key: &'static str| var(key).ok_or(ConfigError::Missing(key));

        let mut gateway = GatewayConfig::default();
        if let Some(addr) = var("LISTEN_ADDR") {
            gateway.listen_addr = addr;
        }
        if let Some(origins) = var("CORS_ORIGINS") {
            gateway.cors_origins = origins
                .split(',')
                .map(str::trim)
                .filter(|o| !o.is_empty())
                .map(String::from)
                .collect();
        }

        let mut security = SecurityConfig::new(required("SIGNING_SECRET")?);
        if let Some(v) = var("TIMESTAMP_WINDOW_SECS") {
            security.timestamp_window_secs = parse("TIMESTAMP_WINDOW_SECS", &v)?;
        }
        if let Some(v) = var("NONCE_TTL_SECS") {
            security.nonce_ttl_secs = parse("NONCE_TTL_SECS", &v)?;
        }

        let mut tokens = TokenConfig::new(
            required("JWT_ACCESS_SECRET")?,
            required("JWT_REFRESH_SECRET")?,
        );
        if let Some(v) = var("ACCESS_TOKEN_TTL_SECS") {
            tokens.access_ttl_secs = parse("ACCESS_TOKEN_TTL_SECS", &v)?;
        }
        if let Some(v) = var("REFRESH_TOKEN_TTL_SECS") {
            tokens.refresh_ttl_secs = parse("REFRESH_TOKEN_TTL_SECS", &v)?;
        }

        let mut accounts = AccountsConfig::default();
        if let Some(v) = var("ENABLE_REGISTRATION") {
            accounts.enable_registration = parse("ENABLE_REGISTRATION", &v)?;
        }

        let mut cache = CacheConfig {
            redis_url: var("REDIS_URL"),
            ..CacheConfig::default()
        };
        if let Some(v) = var("CACHE_TIMEOUT_MS") {
            cache.op_timeout_ms = parse("CACHE_TIMEOUT_MS", &v)?;
        }

        let admin = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
            (Some(email), Some(password)) => Some(AdminBootstrap {
                username: var("ADMIN_USERNAME").unwrap_or_else(|| "admin".to_string()),
                email,
                password,
            }),
            (None, None) => None,
            (Some(_), None) => return Err(ConfigError::Missing("ADMIN_PASSWORD")),
            (None, Some(_)) => return Err(ConfigError::Missing("ADMIN_EMAIL")),
        };

        Ok(Self {
            gateway,
            security,
            tokens,
            accounts,
            cache,
            data_dir: var("DATA_DIR").unwrap_or_else(|| "/data/tollgate".to_string()),
            admin,
        })
    }
}

fn parse<T>(var: &'static str, value: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
        var,
        reason: e.to_string(),
    })
}

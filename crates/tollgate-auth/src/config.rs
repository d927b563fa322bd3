//! Configuration for request validation and token issuance.

use std::fmt;
use std::time::Duration;

use serde::Deserialize;

use crate::error::{AuthError, Result};

/// Settings for the replay-protection layer.
#[derive(Clone, Deserialize)]
pub struct SecurityConfig {
    /// Shared HMAC secret for request signatures.
    pub signing_secret: String,

    /// Accepted clock skew in either direction, in seconds.
    #[serde(default = "SecurityConfig::default_timestamp_window")]
    pub timestamp_window_secs: u64,

    /// How long an issued nonce stays valid, in seconds.
    #[serde(default = "SecurityConfig::default_nonce_ttl")]
    pub nonce_ttl_secs: u64,
}

impl SecurityConfig {
    const fn default_timestamp_window() -> u64 {
        60
    }

    const fn default_nonce_ttl() -> u64 {
        120
    }

    /// Create a configuration with the given secret and default durations.
    #[must_use]
    pub fn new(signing_secret: impl Into<String>) -> Self {
        Self {
            signing_secret: signing_secret.into(),
            timestamp_window_secs: Self::default_timestamp_window(),
            nonce_ttl_secs: Self::default_nonce_ttl(),
        }
    }

    /// Get the timestamp window as a `Duration`.
    #[must_use]
    pub const fn timestamp_window(&self) -> Duration {
        Duration::from_secs(self.timestamp_window_secs)
    }

    /// Get the nonce validity as a `Duration`.
    #[must_use]
    pub const fn nonce_ttl(&self) -> Duration {
        Duration::from_secs(self.nonce_ttl_secs)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the secret is empty or a duration is zero.
    pub fn validate(&self) -> Result<()> {
        if self.signing_secret.is_empty() {
            return Err(AuthError::Internal("signing secret is empty".into()));
        }
        if self.timestamp_window_secs == 0 || self.nonce_ttl_secs == 0 {
            return Err(AuthError::Internal(
                "timestamp window and nonce ttl must be positive".into(),
            ));
        }
        Ok(())
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("signing_secret", &"<redacted>")
            .field("timestamp_window_secs", &self.timestamp_window_secs)
            .field("nonce_ttl_secs", &self.nonce_ttl_secs)
            .finish()
    }
}

/// Settings for access/refresh token issuance.
#[derive(Clone, Deserialize)]
pub struct TokenConfig {
    /// HMAC secret for access tokens.
    pub access_secret: String,

    /// HMAC secret for refresh tokens. Must differ from `access_secret`.
    pub refresh_secret: String,

    /// Access token lifetime in seconds (default 24h).
    #[serde(default = "TokenConfig::default_access_ttl")]
    pub access_ttl_secs: u64,

    /// Refresh token lifetime in seconds (default 30d).
    #[serde(default = "TokenConfig::default_refresh_ttl")]
    pub refresh_ttl_secs: u64,

    /// Value of the `iss` claim.
    #[serde(default = "TokenConfig::default_issuer")]
    pub issuer: String,

    /// Clock leeway for `exp`/`nbf` checks, in seconds.
    #[serde(default)]
    pub leeway_secs: u64,
}

impl TokenConfig {
    const fn default_access_ttl() -> u64 {
        24 * 60 * 60
    }

    const fn default_refresh_ttl() -> u64 {
        30 * 24 * 60 * 60
    }

    fn default_issuer() -> String {
        "tollgate".to_string()
    }

    /// Create a configuration with the given secrets and default lifetimes.
    #[must_use]
    pub fn new(access_secret: impl Into<String>, refresh_secret: impl Into<String>) -> Self {
        Self {
            access_secret: access_secret.into(),
            refresh_secret: refresh_secret.into(),
            access_ttl_secs: Self::default_access_ttl(),
            refresh_ttl_secs: Self::default_refresh_ttl(),
            issuer: Self::default_issuer(),
            leeway_secs: 0,
        }
    }

    /// Get the access token lifetime as a `Duration`.
    #[must_use]
    pub const fn access_ttl(&self) -> Duration {
        Duration::from_secs(self.access_ttl_secs)
    }

    /// Get the refresh token lifetime as a `Duration`.
    #[must_use]
    pub const fn refresh_ttl(&self) -> Duration {
        Duration::from_secs(self.refresh_ttl_secs)
    }

    /// Check that the configuration is usable.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if a secret is empty, the two secrets are
    /// equal, or a lifetime is zero.
    pub fn validate(&self) -> Result<()> {
        if self.access_secret.is_empty() || self.refresh_secret.is_empty() {
            return Err(AuthError::Internal("token secrets must not be empty".into()));
        }
        if self.access_secret == self.refresh_secret {
            return Err(AuthError::Internal(
                "access and refresh secrets must differ".into(),
            ));
        }
        if self.access_ttl_secs == 0 || self.refresh_ttl_secs == 0 {
            return Err(AuthError::Internal("token lifetimes must be positive".into()));
        }
        Ok(())
    }
}

impl fmt::Debug for TokenConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenConfig")
            .field("access_secret", &"<redacted>")
            .field("refresh_secret", &"<redacted>")
            .field("access_ttl_secs", &self.access_ttl_secs)
            .field("refresh_ttl_secs", &self.refresh_ttl_secs)
            .field("issuer", &self.issuer)
            .field("leeway_secs", &self.leeway_secs)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn security_defaults() {
        let config = SecurityConfig::new("secret");
        assert_eq!(config.timestamp_window(), Duration::from_secs(60));
        assert_eq!(config.nonce_ttl(), Duration::from_secs(120));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn token_defaults() {
        let config = TokenConfig::new("a", "b");
        assert_eq!(config.access_ttl(), Duration::from_secs(86_400));
        assert_eq!(config.refresh_ttl(), Duration::from_secs(2_592_000));
        assert_eq!(config.issuer, "tollgate");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn identical_token_secrets_rejected() {
        let config = TokenConfig::new("same", "same");
        assert!(config.validate().is_err());
    }

    #[test]
    fn debug_redacts_secrets() {
        let rendered = format!("{:?}", TokenConfig::new("top-secret-a", "top-secret-b"));
        assert!(!rendered.contains("top-secret"));
        let rendered = format!("{:?}", SecurityConfig::new("hmac-key"));
        assert!(!rendered.contains("hmac-key"));
    }

    #[test]
    fn deserialize_with_defaults() {
        let config: TokenConfig =
            serde_json::from_str(r#"{"access_secret":"a","refresh_secret":"b"}"#).unwrap();
        assert_eq!(config.access_ttl_secs, 86_400);
        assert_eq!(config.leeway_secs, 0);
    }
}

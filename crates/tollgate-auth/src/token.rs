//! Access/refresh token issuance, validation, rotation and revocation.
//!
//! Tokens are HS256 JWTs. Access and refresh tokens are signed with different
//! secrets and carry their type in the `token_type` claim, so neither can
//! stand in for the other. Revocation is a cache entry keyed by token ID that
//! lives until validation would reject the token anyway, leeway included.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{
    decode, decode_header, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation,
};
use serde::{Deserialize, Serialize};
use tollgate_core::{TokenId, UserId};
use tollgate_store::Cache;

use crate::config::TokenConfig;
use crate::error::{AuthError, Result};

/// The two kinds of token in a pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenType {
    /// Short-lived token that authorizes API calls.
    Access,
    /// Long-lived token used only to obtain a new pair.
    Refresh,
}

impl TokenType {
    /// The wire name of this token type.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl fmt::Display for TokenType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Claims carried by every token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// The user the token was issued to.
    pub user_id: UserId,
    /// The user's email at issuance.
    pub email: String,
    /// The user's role at issuance.
    pub role: String,
    /// Whether this is an access or refresh token.
    pub token_type: TokenType,
    /// Unique ID of this token.
    pub token_id: TokenId,
    /// Issuer.
    pub iss: String,
    /// Subject, always the user ID.
    pub sub: String,
    /// JWT ID, always the token ID.
    pub jti: String,
    /// Issued at (seconds since epoch).
    pub iat: i64,
    /// Not before (seconds since epoch).
    pub nbf: i64,
    /// Expiration (seconds since epoch).
    pub exp: i64,
}

impl Claims {
    /// How long a revocation of this token has to be kept.
    ///
    /// Validation accepts the token until `exp + leeway_secs`, so the entry
    /// must survive that instant by at least a second. `None` once even the
    /// leeway has run out.
    #[must_use]
    pub fn revocation_ttl(&self, leeway_secs: u64) -> Option<Duration> {
        let leeway = i64::try_from(leeway_secs).unwrap_or(i64::MAX);
        let deadline = self.exp.saturating_add(leeway).saturating_add(1);
        let secs = deadline.saturating_sub(Utc::now().timestamp());
        u64::try_from(secs)
            .ok()
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }

    /// Expiration as a timestamp.
    #[must_use]
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        DateTime::from_timestamp(self.exp, 0)
    }
}

/// A freshly issued access/refresh pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TokenPair {
    /// The access token.
    pub access_token: String,
    /// The refresh token.
    pub refresh_token: String,
    /// Access token lifetime in seconds.
    pub expires_in: u64,
}

/// Issues and checks token pairs.
#[async_trait]
pub trait TokenService: Send + Sync {
    /// Issue a new pair for the given identity.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if encoding fails.
    fn issue_pair(&self, user_id: &UserId, email: &str, role: &str) -> Result<TokenPair>;

    /// Validate `token` as a token of type `expected`.
    ///
    /// # Errors
    ///
    /// Returns a distinct error per failure: `SigningMismatch`, `TypeMismatch`,
    /// `InvalidToken`, `TokenExpired`, `NotYetValid`, `Revoked`, or
    /// `Unavailable` if the revocation list cannot be read.
    async fn validate(&self, token: &str, expected: TokenType) -> Result<Claims>;

    /// Exchange a refresh token for a new pair.
    ///
    /// The presented refresh token is revoked; presenting it again fails with
    /// `Revoked`.
    ///
    /// # Errors
    ///
    /// Any error from [`TokenService::validate`], or `Revoked` if the token
    /// was already exchanged.
    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair>;

    /// Revoke a validated token for the rest of its lifetime.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the cache fails.
    async fn revoke(&self, claims: &Claims) -> Result<()>;

    /// Add `token_id` to the revocation list for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the cache fails.
    async fn blacklist(&self, token_id: &TokenId, ttl: Duration) -> Result<()>;

    /// Check whether `token_id` is revoked.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Unavailable` if the cache fails.
    async fn is_blacklisted(&self, token_id: &TokenId) -> Result<bool>;
}

/// Cache key for a revoked token.
fn blacklist_key(token_id: &TokenId) -> String {
    format!("blacklist:token:{token_id}")
}

struct KeyPair {
    encoding: EncodingKey,
    decoding: DecodingKey,
}

impl KeyPair {
    fn from_secret(secret: &str) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
        }
    }
}

/// The only claim read before the signature is checked.
#[derive(Deserialize)]
struct TypeClaim {
    token_type: TokenType,
}

/// JWT-based [`TokenService`] with revocations in the shared cache.
pub struct JwtTokenService {
    config: TokenConfig,
    access: KeyPair,
    refresh: KeyPair,
    validation: Validation,
    cache: Arc<dyn Cache>,
}

impl JwtTokenService {
    /// Create a new token service.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Internal` if the configuration is invalid.
    pub fn new(config: TokenConfig, cache: Arc<dyn Cache>) -> Result<Self> {
        config.validate()?;

        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[config.issuer.as_str()]);
        validation.set_required_spec_claims(&["exp", "nbf", "iss", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = config.leeway_secs;

        Ok(Self {
            access: KeyPair::from_secret(&config.access_secret),
            refresh: KeyPair::from_secret(&config.refresh_secret),
            validation,
            config,
            cache,
        })
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &TokenConfig {
        &self.config
    }

    const fn keys(&self, token_type: TokenType) -> &KeyPair {
        match token_type {
            TokenType::Access => &self.access,
            TokenType::Refresh => &self.refresh,
        }
    }

    const fn ttl_secs(&self, token_type: TokenType) -> u64 {
        match token_type {
            TokenType::Access => self.config.access_ttl_secs,
            TokenType::Refresh => self.config.refresh_ttl_secs,
        }
    }

    fn encode_token(
        &self,
        token_type: TokenType,
        user_id: &UserId,
        email: &str,
        role: &str,
        now: i64,
    ) -> Result<String> {
        let ttl = i64::try_from(self.ttl_secs(token_type)).unwrap_or(i64::MAX);
        let token_id = TokenId::generate();
        let claims = Claims {
            user_id: *user_id,
            email: email.to_string(),
            role: role.to_string(),
            token_type,
            token_id,
            iss: self.config.issuer.clone(),
            sub: user_id.to_string(),
            jti: token_id.to_string(),
            iat: now,
            nbf: now,
            exp: now.saturating_add(ttl),
        };

        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &self.keys(token_type).encoding,
        )
        .map_err(|e| AuthError::Internal(format!("token encode: {e}")))
    }
}

/// Read the `token_type` claim without verifying the signature.
fn peek_token_type(token: &str) -> Result<TokenType> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.insecure_disable_signature_validation();
    validation.validate_exp = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    decode::<TypeClaim>(token, &DecodingKey::from_secret(&[]), &validation)
        .map(|data| data.claims.token_type)
        .map_err(|e| AuthError::InvalidToken(e.to_string()))
}

fn map_jwt_error(err: &jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::NotYetValid,
        ErrorKind::InvalidAlgorithm => AuthError::SigningMismatch(err.to_string()),
        ErrorKind::InvalidSignature => AuthError::InvalidToken("signature mismatch".into()),
        ErrorKind::InvalidIssuer => AuthError::InvalidToken("unexpected issuer".into()),
        _ => AuthError::InvalidToken(err.to_string()),
    }
}

#[async_trait]
impl TokenService for JwtTokenService {
    fn issue_pair(&self, user_id: &UserId, email: &str, role: &str) -> Result<TokenPair> {
        let now = Utc::now().timestamp();
        let access_token = self.encode_token(TokenType::Access, user_id, email, role, now)?;
        let refresh_token = self.encode_token(TokenType::Refresh, user_id, email, role, now)?;

        Ok(TokenPair {
            access_token,
            refresh_token,
            expires_in: self.config.access_ttl_secs,
        })
    }

    async fn validate(&self, token: &str, expected: TokenType) -> Result<Claims> {
        let header = decode_header(token).map_err(|e| AuthError::InvalidToken(e.to_string()))?;
        if header.alg != Algorithm::HS256 {
            return Err(AuthError::SigningMismatch(format!("{:?}", header.alg)));
        }

        let found = peek_token_type(token)?;
        if found != expected {
            return Err(AuthError::TypeMismatch { expected, found });
        }

        let claims = decode::<Claims>(token, &self.keys(expected).decoding, &self.validation)
            .map_err(|e| map_jwt_error(&e))?
            .claims;

        if claims.sub != claims.user_id.to_string() || claims.jti != claims.token_id.to_string()
        {
            return Err(AuthError::InvalidToken("inconsistent identity claims".into()));
        }

        if self.is_blacklisted(&claims.token_id).await? {
            return Err(AuthError::Revoked);
        }

        Ok(claims)
    }

    async fn rotate(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.validate(refresh_token, TokenType::Refresh).await?;
        let ttl = claims
            .revocation_ttl(self.config.leeway_secs)
            .unwrap_or(Duration::from_secs(1));

        // Claiming the revocation entry is the atomic step: of two concurrent
        // rotations of the same token only one creates it.
        let claimed = self
            .cache
            .set_if_absent(&blacklist_key(&claims.token_id), "1", ttl)
            .await?;
        if !claimed {
            tracing::warn!(
                target: "security",
                user_id = %claims.user_id,
                token_id = %claims.token_id,
                "Refresh token replayed"
            );
            return Err(AuthError::Revoked);
        }

        tracing::debug!(user_id = %claims.user_id, token_id = %claims.token_id, "Rotated refresh token");
        self.issue_pair(&claims.user_id, &claims.email, &claims.role)
    }

    async fn revoke(&self, claims: &Claims) -> Result<()> {
        match claims.revocation_ttl(self.config.leeway_secs) {
            Some(ttl) => self.blacklist(&claims.token_id, ttl).await,
            // Past expiry and leeway; validation already rejects it.
            None => Ok(()),
        }
    }

    async fn blacklist(&self, token_id: &TokenId, ttl: Duration) -> Result<()> {
        self.cache.set(&blacklist_key(token_id), "1", ttl).await?;
        Ok(())
    }

    async fn is_blacklisted(&self, token_id: &TokenId) -> Result<bool> {
        Ok(self.cache.exists(&blacklist_key(token_id)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_store::testing::UnavailableCache;
    use tollgate_store::MemoryCache;

    const ACCESS_SECRET: &str = "access-secret";
    const REFRESH_SECRET: &str = "refresh-secret";

    fn service() -> JwtTokenService {
        JwtTokenService::new(
            TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET),
            Arc::new(MemoryCache::new()),
        )
        .unwrap()
    }

    /// Build and sign claims by hand, bypassing the service.
    fn forge(secret: &str, alg: Algorithm, edit: impl FnOnce(&mut Claims)) -> String {
        let now = Utc::now().timestamp();
        let user_id = UserId::generate();
        let token_id = TokenId::generate();
        let mut claims = Claims {
            user_id,
            email: "u1@example.com".into(),
            role: "user".into(),
            token_type: TokenType::Access,
            token_id,
            iss: "tollgate".into(),
            sub: user_id.to_string(),
            jti: token_id.to_string(),
            iat: now,
            nbf: now,
            exp: now + 3600,
        };
        edit(&mut claims);
        encode(
            &Header::new(alg),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn access_token_round_trip() {
        let svc = service();
        let user_id = UserId::generate();
        let pair = svc.issue_pair(&user_id, "u1@example.com", "user").unwrap();

        assert!(!pair.access_token.is_empty());
        assert!(!pair.refresh_token.is_empty());
        assert_eq!(pair.expires_in, 86_400);

        let claims = svc.validate(&pair.access_token, TokenType::Access).await.unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.email, "u1@example.com");
        assert_eq!(claims.role, "user");
        assert_eq!(claims.token_type, TokenType::Access);
        assert_eq!(claims.iss, "tollgate");
        assert_eq!(claims.exp - claims.iat, 86_400);
    }

    #[tokio::test]
    async fn pair_tokens_have_distinct_ids() {
        let svc = service();
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();

        let access = svc.validate(&pair.access_token, TokenType::Access).await.unwrap();
        let refresh = svc.validate(&pair.refresh_token, TokenType::Refresh).await.unwrap();
        assert_ne!(access.token_id, refresh.token_id);
        assert_eq!(refresh.exp - refresh.iat, 30 * 86_400);
    }

    #[tokio::test]
    async fn wrong_type_is_type_mismatch() {
        let svc = service();
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();

        let result = svc.validate(&pair.access_token, TokenType::Refresh).await;
        assert!(matches!(
            result,
            Err(AuthError::TypeMismatch {
                expected: TokenType::Refresh,
                found: TokenType::Access
            })
        ));

        let result = svc.validate(&pair.refresh_token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TypeMismatch { .. })));
    }

    #[tokio::test]
    async fn refresh_typed_token_signed_with_access_secret_is_rejected() {
        let svc = service();
        let token = forge(ACCESS_SECRET, Algorithm::HS256, |c| {
            c.token_type = TokenType::Refresh;
        });

        let result = svc.validate(&token, TokenType::Refresh).await;
        assert!(matches!(result, Err(AuthError::InvalidToken(_))));
    }

    #[tokio::test]
    async fn unexpected_algorithm_is_signing_mismatch() {
        let svc = service();
        let token = forge(ACCESS_SECRET, Algorithm::HS512, |_| {});

        let result = svc.validate(&token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::SigningMismatch(_))));
    }

    #[tokio::test]
    async fn expired_token() {
        let svc = service();
        let token = forge(ACCESS_SECRET, Algorithm::HS256, |c| {
            c.iat -= 7200;
            c.nbf -= 7200;
            c.exp = c.iat + 60;
        });

        let result = svc.validate(&token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::TokenExpired)));
    }

    #[tokio::test]
    async fn not_yet_valid_token() {
        let svc = service();
        let token = forge(ACCESS_SECRET, Algorithm::HS256, |c| {
            c.nbf += 600;
        });

        let result = svc.validate(&token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::NotYetValid)));
    }

    #[tokio::test]
    async fn foreign_secret_or_issuer_is_invalid() {
        let svc = service();

        let token = forge("someone-else", Algorithm::HS256, |_| {});
        assert!(matches!(
            svc.validate(&token, TokenType::Access).await,
            Err(AuthError::InvalidToken(_))
        ));

        let token = forge(ACCESS_SECRET, Algorithm::HS256, |c| c.iss = "other".into());
        assert!(matches!(
            svc.validate(&token, TokenType::Access).await,
            Err(AuthError::InvalidToken(_))
        ));
    }

    #[tokio::test]
    async fn garbage_is_invalid_token() {
        let svc = service();
        for bad in ["", "abc", "a.b.c", "Bearer xyz"] {
            assert!(matches!(
                svc.validate(bad, TokenType::Access).await,
                Err(AuthError::InvalidToken(_))
            ));
        }
    }

    #[tokio::test]
    async fn rotation_is_not_replayable() {
        let svc = service();
        let user_id = UserId::generate();
        let pair = svc.issue_pair(&user_id, "u1@example.com", "admin").unwrap();

        let rotated = svc.rotate(&pair.refresh_token).await.unwrap();
        let claims = svc.validate(&rotated.access_token, TokenType::Access).await.unwrap();
        assert_eq!(claims.user_id, user_id);
        assert_eq!(claims.role, "admin");

        let replay = svc.rotate(&pair.refresh_token).await;
        assert!(matches!(replay, Err(AuthError::Revoked)));

        // The new refresh token still works
        assert!(svc.rotate(&rotated.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn rotation_rejects_access_token() {
        let svc = service();
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();

        let result = svc.rotate(&pair.access_token).await;
        assert!(matches!(result, Err(AuthError::TypeMismatch { .. })));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_rotation_has_one_winner() {
        let svc = Arc::new(service());
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();

        let attempts = (0..4).map(|_| {
            let svc = Arc::clone(&svc);
            let token = pair.refresh_token.clone();
            tokio::spawn(async move { svc.rotate(&token).await })
        });
        let results = futures::future::join_all(attempts).await;

        let ok = results.iter().filter(|r| r.as_ref().unwrap().is_ok()).count();
        assert_eq!(ok, 1);
        for result in results {
            match result.unwrap() {
                Ok(_) | Err(AuthError::Revoked) => {}
                Err(other) => panic!("unexpected error: {other}"),
            }
        }
    }

    #[tokio::test]
    async fn revoked_access_token_is_rejected() {
        let svc = service();
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();
        let claims = svc.validate(&pair.access_token, TokenType::Access).await.unwrap();

        svc.revoke(&claims).await.unwrap();

        assert!(svc.is_blacklisted(&claims.token_id).await.unwrap());
        assert!(matches!(
            svc.validate(&pair.access_token, TokenType::Access).await,
            Err(AuthError::Revoked)
        ));
    }

    #[tokio::test]
    async fn blacklist_pass_through() {
        let svc = service();
        let token_id = TokenId::generate();

        assert!(!svc.is_blacklisted(&token_id).await.unwrap());
        svc.blacklist(&token_id, Duration::from_secs(30)).await.unwrap();
        assert!(svc.is_blacklisted(&token_id).await.unwrap());
    }

    #[tokio::test]
    async fn unreachable_cache_is_not_revocation() {
        let svc = JwtTokenService::new(
            TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET),
            Arc::new(UnavailableCache),
        )
        .unwrap();
        let pair = svc.issue_pair(&UserId::generate(), "a@b.c", "user").unwrap();

        let result = svc.validate(&pair.access_token, TokenType::Access).await;
        assert!(matches!(result, Err(AuthError::Unavailable(_))));
    }

    #[test]
    fn token_type_wire_names() {
        assert_eq!(serde_json::to_string(&TokenType::Access).unwrap(), "\"access\"");
        assert_eq!(TokenType::Refresh.to_string(), "refresh");
    }

    fn lenient_service() -> JwtTokenService {
        JwtTokenService::new(
            TokenConfig {
                leeway_secs: 5,
                ..TokenConfig::new(ACCESS_SECRET, REFRESH_SECRET)
            },
            Arc::new(MemoryCache::new()),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn token_at_expiry_cannot_rotate_twice_within_leeway() {
        let svc = lenient_service();
        let token = forge(REFRESH_SECRET, Algorithm::HS256, |c| {
            c.token_type = TokenType::Refresh;
            c.exp = c.iat;
        });

        assert!(svc.rotate(&token).await.is_ok());
        assert!(matches!(svc.rotate(&token).await, Err(AuthError::Revoked)));
    }

    #[tokio::test]
    async fn token_at_expiry_is_still_revocable() {
        let svc = lenient_service();
        let token = forge(ACCESS_SECRET, Algorithm::HS256, |c| c.exp = c.iat);
        let claims = svc.validate(&token, TokenType::Access).await.unwrap();

        svc.revoke(&claims).await.unwrap();

        assert!(svc.is_blacklisted(&claims.token_id).await.unwrap());
        assert!(matches!(
            svc.validate(&token, TokenType::Access).await,
            Err(AuthError::Revoked)
        ));
    }

    #[test]
    fn revocation_ttl_covers_leeway() {
        let now = Utc::now().timestamp();
        let user_id = UserId::generate();
        let token_id = TokenId::generate();
        let claims = Claims {
            user_id,
            email: String::new(),
            role: String::new(),
            token_type: TokenType::Access,
            token_id,
            iss: String::new(),
            sub: user_id.to_string(),
            jti: token_id.to_string(),
            iat: now - 100,
            nbf: now - 100,
            exp: now - 1,
        };
        assert_eq!(claims.revocation_ttl(0), None);
        let ttl = claims.revocation_ttl(5).unwrap();
        assert!(ttl >= Duration::from_secs(4) && ttl <= Duration::from_secs(5));
    }
}

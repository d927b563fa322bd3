//! Account service implementation.
//!
//! This module provides the `AccountService` trait and the `Accounts`
//! implementation that ties user storage to token issuance.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::OnceCell;
use tollgate_auth::{AuthError, Claims, TokenPair, TokenService, TokenType};
use tollgate_core::{role, UserId};
use tollgate_store::{Store, StoreError, User};

use crate::error::{AccountError, Result};
use crate::password;
use crate::types::{
    AccountsConfig, AdminUpdateRequest, CreateUserRequest, LoginResult, UpdateProfileRequest,
};

const MAX_USERNAME_LEN: usize = 32;
const MIN_USERNAME_LEN: usize = 3;
const MAX_EMAIL_LEN: usize = 254;
/// bcrypt only reads the first 72 bytes.
const MAX_PASSWORD_BYTES: usize = 72;
/// Checked against on unknown-email logins so they cost one bcrypt verify too.
const DUMMY_PASSWORD: &str = "tollgate-dummy-password";

/// Trait defining the account operations.
#[async_trait]
pub trait AccountService: Send + Sync {
    // =========================================================================
    // Registration & Credentials
    // =========================================================================

    /// Register a new user with the default role.
    ///
    /// # Errors
    ///
    /// Returns `RegistrationDisabled`, `Validation`, `EmailTaken` or
    /// `UsernameTaken`.
    async fn register(&self, request: CreateUserRequest) -> Result<User>;

    /// Check credentials and issue a token pair.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` for an unknown email or a wrong password,
    /// and `AccountDisabled` if the account is inactive.
    async fn login(&self, email: &str, password: &str) -> Result<LoginResult>;

    /// Exchange a refresh token for a new pair.
    ///
    /// # Errors
    ///
    /// Returns any token validation error, `Revoked` on replay, or
    /// `AccountDisabled` if the owner has been deactivated.
    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair>;

    /// Revoke the caller's access token and, optionally, a refresh token.
    ///
    /// A refresh token that is invalid or belongs to someone else is ignored.
    async fn logout(&self, access: &Claims, refresh_token: Option<&str>) -> Result<()>;

    /// Change a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns `InvalidCredentials` if `current` is wrong.
    async fn change_password(&self, user_id: &UserId, current: &str, new: &str) -> Result<()>;

    // =========================================================================
    // Profile
    // =========================================================================

    /// Get a user by ID.
    ///
    /// # Errors
    ///
    /// Returns `UserNotFound` if the user doesn't exist.
    async fn get_user(&self, user_id: &UserId) -> Result<User>;

    /// Update the caller's own username and avatar.
    async fn update_profile(&self, user_id: &UserId, request: UpdateProfileRequest)
        -> Result<User>;

    // =========================================================================
    // Administration
    // =========================================================================

    /// Update any field an administrator may change.
    async fn admin_update(&self, user_id: &UserId, request: AdminUpdateRequest) -> Result<User>;

    /// Delete a user.
    async fn delete_user(&self, user_id: &UserId) -> Result<()>;

    /// Create the bootstrap administrator if no user holds `email`.
    ///
    /// Calling this again with the same email returns the existing user.
    async fn ensure_admin(&self, email: &str, username: &str, password: &str) -> Result<User>;
}

/// The main account service implementation.
pub struct Accounts<S: Store> {
    store: Arc<S>,
    tokens: Arc<dyn TokenService>,
    config: AccountsConfig,
    dummy_hash: OnceCell<String>,
}

impl<S: Store> Accounts<S> {
    /// Create a new account service.
    #[must_use]
    pub fn new(store: Arc<S>, tokens: Arc<dyn TokenService>, config: AccountsConfig) -> Self {
        Self {
            store,
            tokens,
            config,
            dummy_hash: OnceCell::new(),
        }
    }

    /// Get a reference to the store.
    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    /// Get the configuration.
    #[must_use]
    pub const fn config(&self) -> &AccountsConfig {
        &self.config
    }

    fn load(&self, user_id: &UserId) -> Result<User> {
        self.store
            .get_user(user_id)?
            .ok_or(AccountError::UserNotFound(*user_id))
    }

    /// Apply `apply` to the current stored record.
    fn mutate<F>(&self, user_id: &UserId, apply: F) -> Result<User>
    where
        F: FnOnce(&mut User) -> Result<()>,
    {
        self.store
            .update_user(user_id, apply)
            .map_err(|e| match e {
                AccountError::Store(StoreError::NotFound) => AccountError::UserNotFound(*user_id),
                other => other,
            })
    }

    /// Spend one bcrypt verification against a throwaway hash.
    async fn verify_dummy(&self, password: &str) -> Result<()> {
        let hash = self
            .dummy_hash
            .get_or_try_init(|| password::hash_password(DUMMY_PASSWORD, self.config.bcrypt_cost))
            .await?;
        password::verify_password(password, hash).await?;
        Ok(())
    }

    fn validate_password(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.config.min_password_len {
            return Err(AccountError::Validation(format!(
                "password must be at least {} characters",
                self.config.min_password_len
            )));
        }
        if password.len() > MAX_PASSWORD_BYTES {
            return Err(AccountError::Validation(format!(
                "password must be at most {MAX_PASSWORD_BYTES} bytes"
            )));
        }
        Ok(())
    }

    async fn create(&self, request: CreateUserRequest, role: &str) -> Result<User> {
        let email = User::normalize_email(&request.email);
        validate_email(&email)?;
        let username = request.username.trim().to_string();
        validate_username(&username)?;
        self.validate_password(&request.password)?;

        let password_hash = password::hash_password(&request.password, self.config.bcrypt_cost).await?;

        let now = Utc::now();
        let user = User {
            user_id: UserId::generate(),
            email,
            username,
            password_hash,
            role: role.to_string(),
            active: true,
            avatar_url: None,
            last_login_at: None,
            created_at: now,
            updated_at: now,
        };

        self.store.insert_user(&user)?;
        Ok(user)
    }
}

fn validate_email(email: &str) -> Result<()> {
    let valid = email.len() <= MAX_EMAIL_LEN
        && email
            .split_once('@')
            .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty())
        && !email.chars().any(char::is_whitespace);
    if valid {
        Ok(())
    } else {
        Err(AccountError::Validation("invalid email address".into()))
    }
}

fn validate_username(username: &str) -> Result<()> {
    let len = username.chars().count();
    if !(MIN_USERNAME_LEN..=MAX_USERNAME_LEN).contains(&len) {
        return Err(AccountError::Validation(format!(
            "username must be {MIN_USERNAME_LEN}-{MAX_USERNAME_LEN} characters"
        )));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.'))
    {
        return Err(AccountError::Validation(
            "username may only contain letters, digits, '_', '-' and '.'".into(),
        ));
    }
    Ok(())
}

/// Apply an avatar change. An empty string clears the avatar.
fn apply_avatar(user: &mut User, avatar_url: Option<String>) {
    if let Some(url) = avatar_url {
        let url = url.trim().to_string();
        user.avatar_url = if url.is_empty() { None } else { Some(url) };
    }
}

fn apply_username(user: &mut User, username: Option<String>) -> Result<()> {
    if let Some(name) = username {
        let name = name.trim().to_string();
        validate_username(&name)?;
        user.username = name;
    }
    Ok(())
}

/// A login verified against `verified_hash` may only proceed if the stored
/// record still carries that hash and is active.
fn check_login(user: &User, verified_hash: &str) -> Result<()> {
    if user.password_hash != verified_hash {
        return Err(AccountError::InvalidCredentials);
    }
    if !user.active {
        return Err(AccountError::AccountDisabled);
    }
    Ok(())
}

#[async_trait]
impl<S: Store + 'static> AccountService for Accounts<S> {
    async fn register(&self, request: CreateUserRequest) -> Result<User> {
        if !self.config.enable_registration {
            return Err(AccountError::RegistrationDisabled);
        }

        let user = self.create(request, &self.config.default_role).await?;
        tracing::info!(user_id = %user.user_id, "Registered user");
        Ok(user)
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult> {
        let Some(found) = self.store.get_user_by_email(email)? else {
            self.verify_dummy(password).await?;
            tracing::info!(target: "security", "Login failed: unknown email");
            return Err(AccountError::InvalidCredentials);
        };
        let user_id = found.user_id;

        if !password::verify_password(password, &found.password_hash).await? {
            tracing::info!(target: "security", user_id = %user_id, "Login failed: wrong password");
            return Err(AccountError::InvalidCredentials);
        }
        let verified_hash = found.password_hash;

        let now = Utc::now();
        let recorded = self.store.update_user(&user_id, |u| {
            check_login(u, &verified_hash)?;
            u.last_login_at = Some(now);
            u.updated_at = now;
            Ok::<_, AccountError>(())
        });
        let user = match recorded {
            Ok(user) => user,
            Err(AccountError::Store(StoreError::NotFound)) => {
                return Err(AccountError::InvalidCredentials);
            }
            Err(AccountError::Store(e)) => {
                tracing::warn!(user_id = %user_id, error = %e, "Failed to record last login");
                let current = self
                    .store
                    .get_user(&user_id)?
                    .ok_or(AccountError::InvalidCredentials)?;
                check_login(&current, &verified_hash)?;
                current
            }
            Err(e) => return Err(e),
        };

        let tokens = self
            .tokens
            .issue_pair(&user.user_id, &user.email, &user.role)?;

        tracing::info!(user_id = %user.user_id, "User logged in");
        Ok(LoginResult { user, tokens })
    }

    async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let claims = self.tokens.validate(refresh_token, TokenType::Refresh).await?;

        let user = self
            .store
            .get_user(&claims.user_id)?
            .ok_or_else(|| AuthError::InvalidToken("user no longer exists".into()))?;
        if !user.active {
            return Err(AccountError::AccountDisabled);
        }

        Ok(self.tokens.rotate(refresh_token).await?)
    }

    async fn logout(&self, access: &Claims, refresh_token: Option<&str>) -> Result<()> {
        self.tokens.revoke(access).await?;

        if let Some(token) = refresh_token {
            match self.tokens.validate(token, TokenType::Refresh).await {
                Ok(claims) if claims.user_id == access.user_id => {
                    self.tokens.revoke(&claims).await?;
                }
                Ok(claims) => {
                    tracing::warn!(
                        target: "security",
                        user_id = %access.user_id,
                        other_user_id = %claims.user_id,
                        "Logout presented another user's refresh token"
                    );
                }
                Err(e) if e.is_transient() => return Err(e.into()),
                Err(e) => {
                    tracing::debug!(error = %e, "Ignoring unusable refresh token on logout");
                }
            }
        }

        tracing::info!(user_id = %access.user_id, "User logged out");
        Ok(())
    }

    async fn change_password(&self, user_id: &UserId, current: &str, new: &str) -> Result<()> {
        let user = self.load(user_id)?;

        if !password::verify_password(current, &user.password_hash).await? {
            return Err(AccountError::InvalidCredentials);
        }
        self.validate_password(new)?;

        let new_hash = password::hash_password(new, self.config.bcrypt_cost).await?;
        let verified_hash = user.password_hash;
        self.mutate(user_id, |u| {
            // Another change landed while hashing; `current` no longer applies.
            if u.password_hash != verified_hash {
                return Err(AccountError::InvalidCredentials);
            }
            u.password_hash = new_hash;
            u.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(user_id = %user_id, "Password changed");
        Ok(())
    }

    async fn get_user(&self, user_id: &UserId) -> Result<User> {
        self.load(user_id)
    }

    async fn update_profile(
        &self,
        user_id: &UserId,
        request: UpdateProfileRequest,
    ) -> Result<User> {
        self.mutate(user_id, |u| {
            apply_username(u, request.username)?;
            apply_avatar(u, request.avatar_url);
            u.updated_at = Utc::now();
            Ok(())
        })
    }

    async fn admin_update(&self, user_id: &UserId, request: AdminUpdateRequest) -> Result<User> {
        if let Some(new_role) = &request.role {
            if !role::is_known(new_role) {
                return Err(AccountError::Validation(format!("unknown role: {new_role}")));
            }
        }

        let user = self.mutate(user_id, |u| {
            apply_username(u, request.username)?;
            apply_avatar(u, request.avatar_url);
            if let Some(new_role) = request.role {
                u.role = new_role;
            }
            if let Some(active) = request.active {
                u.active = active;
            }
            u.updated_at = Utc::now();
            Ok(())
        })?;

        tracing::info!(user_id = %user_id, role = %user.role, active = user.active, "Admin updated user");
        Ok(user)
    }

    async fn delete_user(&self, user_id: &UserId) -> Result<()> {
        match self.store.delete_user(user_id) {
            Ok(()) => {
                tracing::info!(user_id = %user_id, "Deleted user");
                Ok(())
            }
            Err(StoreError::NotFound) => Err(AccountError::UserNotFound(*user_id)),
            Err(e) => Err(e.into()),
        }
    }

    async fn ensure_admin(&self, email: &str, username: &str, password: &str) -> Result<User> {
        if let Some(existing) = self.store.get_user_by_email(email)? {
            tracing::debug!(user_id = %existing.user_id, "Bootstrap admin already exists");
            return Ok(existing);
        }

        let user = self
            .create(CreateUserRequest::new(email, username, password), role::ADMIN)
            .await?;
        tracing::info!(user_id = %user.user_id, "Created bootstrap admin");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tollgate_auth::{JwtTokenService, TokenConfig};
    use tollgate_store::{MemoryCache, RocksStore};
    use tempfile::TempDir;

    fn setup_with(config: AccountsConfig) -> (Accounts<RocksStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(RocksStore::open(dir.path()).unwrap());
        let tokens = JwtTokenService::new(
            TokenConfig::new("access-secret", "refresh-secret"),
            Arc::new(MemoryCache::new()),
        )
        .unwrap();
        (Accounts::new(store, Arc::new(tokens), config), dir)
    }

    fn setup() -> (Accounts<RocksStore>, TempDir) {
        setup_with(AccountsConfig {
            bcrypt_cost: 4,
            ..Default::default()
        })
    }

    fn u1() -> CreateUserRequest {
        CreateUserRequest::new("U1@Example.com", "u1", "password123")
    }

    /// Store whose email lookup lets another writer change the record right
    /// after it has been read, before the login's bcrypt check finishes.
    struct RacingStore {
        inner: RocksStore,
        after_lookup: Box<dyn Fn(&RocksStore, &UserId) + Send + Sync>,
    }

    impl Store for RacingStore {
        fn insert_user(&self, user: &User) -> tollgate_store::Result<()> {
            self.inner.insert_user(user)
        }

        fn put_user(&self, user: &User) -> tollgate_store::Result<()> {
            self.inner.put_user(user)
        }

        fn update_user<F, E>(&self, user_id: &UserId, apply: F) -> std::result::Result<User, E>
        where
            F: FnOnce(&mut User) -> std::result::Result<(), E>,
            E: From<StoreError>,
        {
            self.inner.update_user(user_id, apply)
        }

        fn get_user(&self, user_id: &UserId) -> tollgate_store::Result<Option<User>> {
            self.inner.get_user(user_id)
        }

        fn get_user_by_email(&self, email: &str) -> tollgate_store::Result<Option<User>> {
            let found = self.inner.get_user_by_email(email)?;
            if let Some(user) = &found {
                (self.after_lookup)(&self.inner, &user.user_id);
            }
            Ok(found)
        }

        fn get_user_by_username(&self, username: &str) -> tollgate_store::Result<Option<User>> {
            self.inner.get_user_by_username(username)
        }

        fn delete_user(&self, user_id: &UserId) -> tollgate_store::Result<()> {
            self.inner.delete_user(user_id)
        }
    }

    fn racing_setup(
        after_lookup: impl Fn(&RocksStore, &UserId) + Send + Sync + 'static,
    ) -> (Accounts<RacingStore>, TempDir) {
        let dir = TempDir::new().unwrap();
        let store = RacingStore {
            inner: RocksStore::open(dir.path()).unwrap(),
            after_lookup: Box::new(after_lookup),
        };
        let tokens = JwtTokenService::new(
            TokenConfig::new("access-secret", "refresh-secret"),
            Arc::new(MemoryCache::new()),
        )
        .unwrap();
        let config = AccountsConfig {
            bcrypt_cost: 4,
            ..Default::default()
        };
        (Accounts::new(Arc::new(store), Arc::new(tokens), config), dir)
    }

    #[tokio::test]
    async fn register_success() {
        let (service, _dir) = setup();

        let user = service.register(u1()).await.unwrap();

        assert_eq!(user.email, "u1@example.com");
        assert_eq!(user.username, "u1");
        assert_eq!(user.role, role::USER);
        assert!(user.active);
        assert_ne!(user.password_hash, "password123");
        assert!(service.store.get_user(&user.user_id).unwrap().is_some());
    }

    #[tokio::test]
    async fn register_rejects_duplicates() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();

        let same_email = CreateUserRequest::new("u1@example.com", "other", "password123");
        assert!(matches!(
            service.register(same_email).await,
            Err(AccountError::EmailTaken)
        ));

        let same_name = CreateUserRequest::new("u2@example.com", "u1", "password123");
        assert!(matches!(
            service.register(same_name).await,
            Err(AccountError::UsernameTaken)
        ));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let (service, _dir) = setup();

        for request in [
            CreateUserRequest::new("u1@example.com", "u1", "short"),
            CreateUserRequest::new("not-an-email", "u1", "password123"),
            CreateUserRequest::new("u1@example.com", "x", "password123"),
            CreateUserRequest::new("u1@example.com", "bad name", "password123"),
            CreateUserRequest::new("u1@example.com", "u1", "a".repeat(73)),
        ] {
            assert!(matches!(
                service.register(request).await,
                Err(AccountError::Validation(_))
            ));
        }
    }

    #[tokio::test]
    async fn register_disabled() {
        let (service, _dir) = setup_with(AccountsConfig {
            enable_registration: false,
            bcrypt_cost: 4,
            ..Default::default()
        });

        assert!(matches!(
            service.register(u1()).await,
            Err(AccountError::RegistrationDisabled)
        ));
    }

    #[tokio::test]
    async fn login_issues_tokens_and_records_time() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();

        let result = service.login("u1@example.com", "password123").await.unwrap();
        assert_eq!(result.user.user_id, user.user_id);
        assert!(result.user.last_login_at.is_some());

        let claims = service
            .tokens
            .validate(&result.tokens.access_token, TokenType::Access)
            .await
            .unwrap();
        assert_eq!(claims.user_id, user.user_id);

        let stored = service.store.get_user(&user.user_id).unwrap().unwrap();
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn login_failures_are_indistinguishable() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();

        let unknown = service.login("nobody@example.com", "password123").await;
        let wrong = service.login("u1@example.com", "password124").await;

        assert!(matches!(unknown, Err(AccountError::InvalidCredentials)));
        assert!(matches!(wrong, Err(AccountError::InvalidCredentials)));
    }

    #[tokio::test]
    async fn login_unknown_email_still_runs_bcrypt() {
        let (service, _dir) = setup();
        assert!(service.dummy_hash.get().is_none());

        assert!(matches!(
            service.login("nobody@example.com", "password123").await,
            Err(AccountError::InvalidCredentials)
        ));
        let dummy = service.dummy_hash.get().unwrap();
        assert!(dummy.starts_with("$2"));
    }

    #[tokio::test]
    async fn login_does_not_undo_concurrent_deactivation() {
        let (service, _dir) = racing_setup(|store, id| {
            let mut user = store.get_user(id).unwrap().unwrap();
            user.active = false;
            store.put_user(&user).unwrap();
        });
        let user = service.register(u1()).await.unwrap();

        assert!(matches!(
            service.login("u1@example.com", "password123").await,
            Err(AccountError::AccountDisabled)
        ));

        let stored = service.store.get_user(&user.user_id).unwrap().unwrap();
        assert!(!stored.active);
        assert!(stored.last_login_at.is_none());
    }

    #[tokio::test]
    async fn login_keeps_concurrent_role_change() {
        let (service, _dir) = racing_setup(|store, id| {
            let mut user = store.get_user(id).unwrap().unwrap();
            user.role = role::ADMIN.to_string();
            store.put_user(&user).unwrap();
        });
        let user = service.register(u1()).await.unwrap();

        let result = service.login("u1@example.com", "password123").await.unwrap();
        assert_eq!(result.user.role, role::ADMIN);

        let stored = service.store.get_user(&user.user_id).unwrap().unwrap();
        assert_eq!(stored.role, role::ADMIN);
        assert!(stored.last_login_at.is_some());
    }

    #[tokio::test]
    async fn login_rejected_after_concurrent_password_change() {
        let (service, _dir) = racing_setup(|store, id| {
            let mut user = store.get_user(id).unwrap().unwrap();
            user.password_hash = "$2b$04$replacedreplacedreplacedreplacedreplacedrepla".into();
            store.put_user(&user).unwrap();
        });
        service.register(u1()).await.unwrap();

        assert!(matches!(
            service.login("u1@example.com", "password123").await,
            Err(AccountError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn login_disabled_account() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();
        service
            .admin_update(
                &user.user_id,
                AdminUpdateRequest {
                    active: Some(false),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        assert!(matches!(
            service.login("u1@example.com", "password123").await,
            Err(AccountError::AccountDisabled)
        ));
    }

    #[tokio::test]
    async fn refresh_rotates_once() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();
        let login = service.login("u1@example.com", "password123").await.unwrap();

        let pair = service.refresh(&login.tokens.refresh_token).await.unwrap();
        assert_ne!(pair.refresh_token, login.tokens.refresh_token);

        assert!(matches!(
            service.refresh(&login.tokens.refresh_token).await,
            Err(AccountError::Auth(AuthError::Revoked))
        ));
    }

    #[tokio::test]
    async fn refresh_for_deleted_user_fails() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();
        let login = service.login("u1@example.com", "password123").await.unwrap();
        service.delete_user(&user.user_id).await.unwrap();

        let result = service.refresh(&login.tokens.refresh_token).await;
        assert!(matches!(
            result,
            Err(AccountError::Auth(AuthError::InvalidToken(_)))
        ));
    }

    #[tokio::test]
    async fn logout_revokes_both_tokens() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();
        let login = service.login("u1@example.com", "password123").await.unwrap();
        let access = service
            .tokens
            .validate(&login.tokens.access_token, TokenType::Access)
            .await
            .unwrap();

        service
            .logout(&access, Some(&login.tokens.refresh_token))
            .await
            .unwrap();

        assert!(matches!(
            service
                .tokens
                .validate(&login.tokens.access_token, TokenType::Access)
                .await,
            Err(AuthError::Revoked)
        ));
        assert!(matches!(
            service.refresh(&login.tokens.refresh_token).await,
            Err(AccountError::Auth(AuthError::Revoked))
        ));
    }

    #[tokio::test]
    async fn logout_ignores_foreign_refresh_token() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();
        service
            .register(CreateUserRequest::new("u2@example.com", "u2", "password123"))
            .await
            .unwrap();
        let one = service.login("u1@example.com", "password123").await.unwrap();
        let two = service.login("u2@example.com", "password123").await.unwrap();
        let access = service
            .tokens
            .validate(&one.tokens.access_token, TokenType::Access)
            .await
            .unwrap();

        service
            .logout(&access, Some(&two.tokens.refresh_token))
            .await
            .unwrap();

        // u2's session is untouched
        assert!(service.refresh(&two.tokens.refresh_token).await.is_ok());
    }

    #[tokio::test]
    async fn change_password_checks_current() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();

        assert!(matches!(
            service
                .change_password(&user.user_id, "wrong-password", "newpassword1")
                .await,
            Err(AccountError::InvalidCredentials)
        ));

        service
            .change_password(&user.user_id, "password123", "newpassword1")
            .await
            .unwrap();

        assert!(service.login("u1@example.com", "password123").await.is_err());
        assert!(service.login("u1@example.com", "newpassword1").await.is_ok());
    }

    #[tokio::test]
    async fn update_profile_changes_name_and_avatar() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();

        let updated = service
            .update_profile(
                &user.user_id,
                UpdateProfileRequest {
                    username: Some("renamed".into()),
                    avatar_url: Some("https://img.example.com/a.png".into()),
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.username, "renamed");
        assert_eq!(
            updated.avatar_url.as_deref(),
            Some("https://img.example.com/a.png")
        );
        assert_eq!(updated.role, role::USER);

        let cleared = service
            .update_profile(
                &user.user_id,
                UpdateProfileRequest {
                    username: None,
                    avatar_url: Some(String::new()),
                },
            )
            .await
            .unwrap();
        assert!(cleared.avatar_url.is_none());
        assert_eq!(cleared.username, "renamed");
    }

    #[tokio::test]
    async fn update_profile_username_conflict() {
        let (service, _dir) = setup();
        service.register(u1()).await.unwrap();
        let two = service
            .register(CreateUserRequest::new("u2@example.com", "u2", "password123"))
            .await
            .unwrap();

        let result = service
            .update_profile(
                &two.user_id,
                UpdateProfileRequest {
                    username: Some("u1".into()),
                    avatar_url: None,
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::UsernameTaken)));
    }

    #[tokio::test]
    async fn admin_update_rejects_unknown_role() {
        let (service, _dir) = setup();
        let user = service.register(u1()).await.unwrap();

        let result = service
            .admin_update(
                &user.user_id,
                AdminUpdateRequest {
                    role: Some("superuser".into()),
                    ..Default::default()
                },
            )
            .await;
        assert!(matches!(result, Err(AccountError::Validation(_))));

        let promoted = service
            .admin_update(
                &user.user_id,
                AdminUpdateRequest {
                    role: Some(role::ADMIN.into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(promoted.role, role::ADMIN);
    }

    #[tokio::test]
    async fn delete_user_not_found() {
        let (service, _dir) = setup();
        let missing = UserId::generate();

        assert!(matches!(
            service.delete_user(&missing).await,
            Err(AccountError::UserNotFound(id)) if id == missing
        ));
        assert!(matches!(
            service.get_user(&missing).await,
            Err(AccountError::UserNotFound(_))
        ));
    }

    #[tokio::test]
    async fn ensure_admin_is_idempotent() {
        let (service, _dir) = setup_with(AccountsConfig {
            enable_registration: false,
            bcrypt_cost: 4,
            ..Default::default()
        });

        let first = service
            .ensure_admin("admin@example.com", "admin", "adminpass1")
            .await
            .unwrap();
        assert_eq!(first.role, role::ADMIN);

        let second = service
            .ensure_admin("admin@example.com", "admin", "adminpass1")
            .await
            .unwrap();
        assert_eq!(first.user_id, second.user_id);
    }
}

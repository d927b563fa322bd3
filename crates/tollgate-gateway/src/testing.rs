//! Shared fixtures for the gateway's unit tests.

use std::sync::Arc;

use tempfile::TempDir;
use tollgate_accounts::{Accounts, AccountsConfig};
use tollgate_auth::{
    DefaultSecurityService, JwtTokenService, SecurityConfig, SecurityService, TokenConfig,
    TokenService,
};
use tollgate_store::{MemoryCache, RocksStore};

use crate::config::GatewayConfig;
use crate::state::GatewayState;

pub type TestAccounts = Accounts<RocksStore>;

pub struct TestState {
    pub state: GatewayState<TestAccounts>,
    pub security: Arc<dyn SecurityService>,
    pub tokens: Arc<dyn TokenService>,
    _dir: TempDir,
}

pub fn test_state() -> TestState {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(RocksStore::open(dir.path()).unwrap());
    let cache = Arc::new(MemoryCache::new());

    let tokens: Arc<dyn TokenService> = Arc::new(
        JwtTokenService::new(
            TokenConfig::new("access-secret", "refresh-secret"),
            cache.clone(),
        )
        .unwrap(),
    );
    let security: Arc<dyn SecurityService> = Arc::new(
        DefaultSecurityService::new(&SecurityConfig::new("signing-secret"), cache).unwrap(),
    );
    let accounts = Arc::new(Accounts::new(
        store,
        Arc::clone(&tokens),
        AccountsConfig {
            bcrypt_cost: 4,
            ..Default::default()
        },
    ));

    TestState {
        state: GatewayState::new(
            accounts,
            Arc::clone(&security),
            Arc::clone(&tokens),
            GatewayConfig::default(),
        ),
        security,
        tokens,
        _dir: dir,
    }
}

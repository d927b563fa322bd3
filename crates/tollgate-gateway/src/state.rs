//! Gateway application state.
//!
//! This module defines the shared state that is available to all request handlers.

use std::sync::Arc;

use tollgate_accounts::AccountService;
use tollgate_auth::{SecurityService, TokenService};

use crate::config::GatewayConfig;

/// Shared application state for the gateway.
///
/// This struct holds references to all services needed by the HTTP handlers
/// and middleware.
pub struct GatewayState<A>
where
    A: AccountService,
{
    /// Account operations.
    pub accounts: Arc<A>,
    /// Timestamp, nonce and signature checks.
    pub security: Arc<dyn SecurityService>,
    /// Access token validation for the auth middleware.
    pub tokens: Arc<dyn TokenService>,
    /// Gateway configuration.
    pub config: GatewayConfig,
}

impl<A> GatewayState<A>
where
    A: AccountService,
{
    /// Create a new gateway state.
    #[must_use]
    pub fn new(
        accounts: Arc<A>,
        security: Arc<dyn SecurityService>,
        tokens: Arc<dyn TokenService>,
        config: GatewayConfig,
    ) -> Self {
        Self {
            accounts,
            security,
            tokens,
            config,
        }
    }
}

impl<A> Clone for GatewayState<A>
where
    A: AccountService,
{
    fn clone(&self) -> Self {
        Self {
            accounts: Arc::clone(&self.accounts),
            security: Arc::clone(&self.security),
            tokens: Arc::clone(&self.tokens),
            config: self.config.clone(),
        }
    }
}

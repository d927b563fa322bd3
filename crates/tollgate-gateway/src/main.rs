//! Tollgate Gateway - HTTP API server
//!
//! Configuration is read from the environment; see [`Settings::from_env`].
//! `SIGNING_SECRET`, `JWT_ACCESS_SECRET` and `JWT_REFRESH_SECRET` are
//! required. Without `REDIS_URL` the nonce and revocation state lives in
//! process memory, which is only correct for a single instance.

use std::sync::Arc;

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tollgate_accounts::{AccountService, Accounts};
use tollgate_auth::{DefaultSecurityService, JwtTokenService, SecurityService, TokenService};
use tollgate_gateway::{create_router, GatewayState, Settings};
use tollgate_store::{cache, RocksStore};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,tollgate=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Tollgate Gateway");

    let settings = Settings::from_env()?;

    tracing::info!(
        listen_addr = %settings.gateway.listen_addr,
        data_dir = %settings.data_dir,
        redis = settings.cache.redis_url.is_some(),
        registration = settings.accounts.enable_registration,
        "Gateway configuration loaded"
    );

    tracing::info!(path = %settings.data_dir, "Opening RocksDB store");
    let store = Arc::new(RocksStore::open(&settings.data_dir)?);

    let cache = cache::from_config(&settings.cache).await?;

    let tokens: Arc<dyn TokenService> = Arc::new(JwtTokenService::new(
        settings.tokens.clone(),
        Arc::clone(&cache),
    )?);
    let security: Arc<dyn SecurityService> =
        Arc::new(DefaultSecurityService::new(&settings.security, cache)?);
    let accounts = Arc::new(Accounts::new(
        store,
        Arc::clone(&tokens),
        settings.accounts.clone(),
    ));

    if let Some(admin) = &settings.admin {
        let user = accounts
            .ensure_admin(&admin.email, &admin.username, &admin.password)
            .await?;
        tracing::info!(user_id = %user.user_id, email = %user.email, "Bootstrap admin ready");
    }

    let listen_addr = settings.gateway.listen_addr.clone();
    let state = GatewayState::new(accounts, security, tokens, settings.gateway);
    let app = create_router(state);

    tracing::info!(listen_addr = %listen_addr, "Starting HTTP server");
    let listener = tokio::net::TcpListener::bind(&listen_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

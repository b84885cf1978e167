use std::sync::Arc;

use anyhow::Context;
use auth_service::app::{router, AppState, HttpSettings};
use auth_service::config::load_service_config;
use auth_service::db;
use auth_service::metrics::AuthMetrics;
use auth_service::store::PgStore;
use common_auth::TokenService;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = load_service_config()?;
    let tokens =
        TokenService::new(config.jwt.clone()).context("Refusing to start without a signing key")?;

    let pool = db::connect(&config.database_url, config.pool).await?;
    let store = Arc::new(PgStore::new(pool));
    let metrics = AuthMetrics::new()?;
    let state = AppState::new(store, tokens, metrics);

    let app = router(state, &HttpSettings::from(&config));

    let addr = config.listen_addr();
    info!(%addr, "starting auth-service");
    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        info!("shutdown signal received");
    }
}

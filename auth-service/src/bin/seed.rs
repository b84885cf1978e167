use anyhow::{anyhow, Context};
use auth_service::config::PoolSettings;
use auth_service::db;
use auth_service::seed::seed_super_admin;
use auth_service::store::PgStore;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let database_url =
        std::env::var("DATABASE_URL").map_err(|_| anyhow!("DATABASE_URL must be set"))?;
    let email = std::env::var("SUPERADMIN_EMAIL").unwrap_or_default();
    let password = std::env::var("SUPERADMIN_PASSWORD").unwrap_or_default();

    let pool = db::connect(
        &database_url,
        PoolSettings {
            max_connections: 1,
            min_connections: 1,
        },
    )
    .await?;
    let store = PgStore::new(pool.clone());

    let report = seed_super_admin(&store, &email, &password)
        .await
        .context("Super admin seeding failed")?;
    info!(
        user_id = report.user_id,
        created_user = report.created_user,
        linked = report.linked,
        "seeding complete"
    );

    pool.close().await;
    Ok(())
}

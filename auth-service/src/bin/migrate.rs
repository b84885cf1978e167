use std::path::PathBuf;

use anyhow::{anyhow, Context};
use auth_service::config::{migrations_dir, PoolSettings};
use auth_service::db;
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
    let dir = PathBuf::from(migrations_dir());

    let pool = db::connect(
        &database_url,
        PoolSettings {
            max_connections: 1,
            min_connections: 1,
        },
    )
    .await?;
    let applied = db::run_migrations(&pool, &dir)
        .await
        .with_context(|| format!("Migrations in {} failed", dir.display()))?;

    info!(count = applied.len(), "migrations finished");
    pool.close().await;
    Ok(())
}

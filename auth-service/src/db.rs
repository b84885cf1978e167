use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::info;

use crate::config::PoolSettings;

pub async fn connect(database_url: &str, settings: PoolSettings) -> Result<PgPool> {
    let pool = PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .max_lifetime(Duration::from_secs(60 * 60))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    sqlx::query("SELECT 1")
        .execute(&pool)
        .await
        .context("PostgreSQL ping failed")?;
    info!(
        max_connections = settings.max_connections,
        min_connections = settings.min_connections,
        "database pool ready"
    );
    Ok(pool)
}

/// Applies `*.sql` files from `dir` in file-name order, skipping those already
/// recorded in `schema_migrations`. Returns the names applied by this run.
///
/// Statements are split on `;`, so migration files must not put semicolons
/// inside string literals.
pub async fn run_migrations(pool: &PgPool, dir: &Path) -> Result<Vec<String>> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            id SERIAL PRIMARY KEY,
            name TEXT UNIQUE NOT NULL,
            applied_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )",
    )
    .execute(pool)
    .await
    .context("Failed to ensure schema_migrations table")?;

    let mut applied = Vec::new();
    for path in migration_files(dir)? {
        let name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        let seen: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM schema_migrations WHERE name = $1")
            .bind(&name)
            .fetch_one(pool)
            .await
            .with_context(|| format!("Failed to check migration status for {name}"))?;
        if seen > 0 {
            info!(migration = %name, "skipping applied migration");
            continue;
        }

        let sql = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read migration {}", path.display()))?;
        let started = Instant::now();

        let mut tx = pool.begin().await?;
        for statement in sql.split(';') {
            let trimmed = statement.trim();
            if trimmed.is_empty() {
                continue;
            }
            sqlx::query(trimmed)
                .execute(&mut tx)
                .await
                .with_context(|| format!("Migration {name} failed"))?;
        }
        sqlx::query("INSERT INTO schema_migrations (name) VALUES ($1)")
            .bind(&name)
            .execute(&mut tx)
            .await?;
        tx.commit().await?;

        info!(
            migration = %name,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "applied migration"
        );
        applied.push(name);
    }

    Ok(applied)
}

fn migration_files(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = std::fs::read_dir(dir)
        .with_context(|| format!("Failed to read migrations directory {}", dir.display()))?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()?;
    entries.retain(|path| path.is_file() && path.extension().map_or(false, |ext| ext == "sql"));
    entries.sort();
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_sql_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["0002_b.sql", "0001_a.sql", "notes.txt"] {
            std::fs::write(dir.path().join(name), "SELECT 1").unwrap();
        }
        std::fs::create_dir(dir.path().join("0000_dir.sql")).unwrap();

        let files: Vec<String> = migration_files(dir.path())
            .unwrap()
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(files, vec!["0001_a.sql", "0002_b.sql"]);
    }

    #[test]
    fn missing_directory_is_an_error() {
        assert!(migration_files(Path::new("/definitely/not/here")).is_err());
    }
}

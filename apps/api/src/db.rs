use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::config::Config;
use crate::store::{InMemoryRecordStore, PgRecordStore, RecordStore};

/// Creates and returns a PostgreSQL connection pool.
pub async fn create_pool(database_url: &str) -> Result<PgPool> {
    info!("Connecting to PostgreSQL...");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url)
        .await
        .context("Failed to connect to PostgreSQL")?;

    info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    sqlx::migrate!("./migrations")
        .run(pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations applied");
    Ok(())
}

/// PostgreSQL when `DATABASE_URL` is set, otherwise a process-local store.
pub async fn build_store(config: &Config) -> Result<Arc<dyn RecordStore>> {
    match &config.database_url {
        Some(url) => {
            let pool = create_pool(url).await?;
            run_migrations(&pool).await?;
            Ok(Arc::new(PgRecordStore::new(pool)))
        }
        None => {
            warn!("DATABASE_URL not set; using the in-memory record store (data is lost on exit)");
            Ok(Arc::new(InMemoryRecordStore::new()))
        }
    }
}

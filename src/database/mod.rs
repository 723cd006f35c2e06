use sqlx::{postgres::PgPoolOptions, PgPool};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::OnceCell;
use tracing::info;

use crate::config;

/// Errors from the connection provider
#[derive(Debug, Error)]
pub enum DatabaseError {
    #[error("missing configuration: {0}")]
    ConfigMissing(&'static str),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

static POOL: OnceCell<PgPool> = OnceCell::const_new();

/// Process-wide connection pool, created lazily on first use from
/// DATABASE_URL. Every request shares it; there is no per-tenant routing.
pub async fn pool() -> Result<&'static PgPool, DatabaseError> {
    POOL.get_or_try_init(|| async {
        let url = std::env::var("DATABASE_URL")
            .map_err(|_| DatabaseError::ConfigMissing("DATABASE_URL"))?;

        let cfg = &config::config().database;
        let pool = PgPoolOptions::new()
            .max_connections(cfg.max_connections)
            .acquire_timeout(Duration::from_secs(cfg.connection_timeout))
            .connect(&url)
            .await?;

        info!("created database pool ({} max connections)", cfg.max_connections);
        Ok(pool)
    })
    .await
}

/// Pings the pool to ensure connectivity
pub async fn health_check() -> Result<(), DatabaseError> {
    let pool = pool().await?;
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}

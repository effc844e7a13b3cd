//! Database connection pool management.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::time::Duration;

/// Database configuration.
#[derive(Debug, Clone)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Per-transaction lock wait bound, applied as the session
    /// `lock_timeout` so a blocked balance update aborts instead of
    /// queueing indefinitely.
    pub lock_timeout_ms: u64,
}

/// Creates a PostgreSQL connection pool with the given configuration.
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let lock_timeout = config.lock_timeout_ms;
    PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(Duration::from_secs(config.connect_timeout_secs))
        .idle_timeout(Duration::from_secs(config.idle_timeout_secs))
        .after_connect(move |conn, _meta| {
            Box::pin(async move {
                let stmt = format!("SET lock_timeout = '{lock_timeout}ms'");
                sqlx::Executor::execute(conn, stmt.as_str()).await?;
                Ok(())
            })
        })
        .connect(&config.url)
        .await
}

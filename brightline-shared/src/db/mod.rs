/// Database layer for Brightline
///
/// This module provides database connection pooling and migrations.
///
/// # Modules
///
/// - `pool`: SQLite connection pool management with health checks
/// - `migrations`: Embedded migration runner
/// - Models are in the `models` module at crate root level

pub mod migrations;
pub mod pool;

use sqlx::SqlitePool;

/// Opens a private in-memory database with the full schema applied
///
/// Used by tests and local tooling that need a disposable store.
pub async fn connect_in_memory() -> Result<SqlitePool, sqlx::Error> {
    let pool = pool::create_pool(pool::DatabaseConfig::in_memory()).await?;
    migrations::run_migrations(&pool)
        .await
        .map_err(|e| sqlx::Error::Migrate(Box::new(e)))?;
    Ok(pool)
}

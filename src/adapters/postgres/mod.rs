//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! - `PostgresBillingStore` - plans, orders and subscriptions with row locks
//! - `PostgresDeviceDirectory` - relay device ownership lookups
//!
//! `connect` and `run_migrations` set up the shared pool.

mod billing_store;
mod device_directory;

pub use billing_store::PostgresBillingStore;
pub use device_directory::PostgresDeviceDirectory;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

use crate::config::DatabaseConfig;

/// Opens the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, sqlx::Error> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect(&config.url)
        .await?;

    tracing::info!(
        max_connections = config.max_connections,
        "database pool established"
    );
    Ok(pool)
}

/// Applies the embedded migrations in `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::migrate::MigrateError> {
    tracing::info!("running database migrations");
    sqlx::migrate!("./migrations").run(pool).await?;
    tracing::info!("database migrations complete");
    Ok(())
}

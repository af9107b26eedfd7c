//! PostgreSQL adapters - Database implementations for repository ports.
//!
//! This module provides adapters for PostgreSQL-backed persistence:
//! - `PostgresUserRepository` - User lookup and Stripe customer linking
//! - `PostgresSubscriptionLedger` - Subscription upserts and payment rows
//!
//! plus pool setup and the billing schema check run at startup.

mod subscription_ledger;
mod user_repository;

#[cfg(test)]
mod test_support;

pub use subscription_ledger::PostgresSubscriptionLedger;
pub use user_repository::PostgresUserRepository;

use sqlx::migrate::{MigrateError, Migrator};
use sqlx::postgres::{PgPool, PgPoolOptions};
use thiserror::Error;

use crate::config::{DatabaseConfig, MigrationMode, ValidationError};

/// The billing schema under `migrations/`.
pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

/// Errors raised while opening the pool or preparing the schema.
#[derive(Debug, Error)]
pub enum DatabaseSetupError {
    #[error("Invalid database configuration: {0}")]
    Config(#[from] ValidationError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Migration failed: {0}")]
    Migrate(#[from] MigrateError),

    #[error("Billing migrations not applied: {0:?}")]
    PendingMigrations(Vec<i64>),
}

/// Opens the connection pool described by `config`.
pub async fn connect(config: &DatabaseConfig) -> Result<PgPool, DatabaseSetupError> {
    tracing::info!(
        max_connections = config.max_connections,
        statement_timeout_ms = config.statement_timeout_ms,
        "Connecting to PostgreSQL"
    );

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout())
        .connect_with(config.connect_options()?)
        .await?;

    tracing::info!("PostgreSQL connection pool established");
    Ok(pool)
}

/// Applies or verifies the billing migrations according to `mode`.
pub async fn prepare_schema(pool: &PgPool, mode: MigrationMode) -> Result<(), DatabaseSetupError> {
    match mode {
        MigrationMode::Skip => {
            tracing::debug!("Skipping billing schema check");
            Ok(())
        }
        MigrationMode::Apply => run_migrations(pool).await,
        MigrationMode::Verify => {
            let applied = applied_versions(pool).await?;
            let pending = unapplied(MIGRATOR.iter().map(|m| m.version), &applied);
            if pending.is_empty() {
                tracing::info!("Billing schema is up to date");
                Ok(())
            } else {
                Err(DatabaseSetupError::PendingMigrations(pending))
            }
        }
    }
}

/// Applies the embedded migrations under `migrations/`.
pub async fn run_migrations(pool: &PgPool) -> Result<(), DatabaseSetupError> {
    tracing::info!("Running billing migrations");
    MIGRATOR.run(pool).await?;
    tracing::info!("Billing migrations completed");
    Ok(())
}

async fn applied_versions(pool: &PgPool) -> Result<Vec<i64>, sqlx::Error> {
    let (tracked,): (bool,) =
        sqlx::query_as("SELECT to_regclass('_sqlx_migrations') IS NOT NULL")
            .fetch_one(pool)
            .await?;
    if !tracked {
        return Ok(Vec::new());
    }

    let rows: Vec<(i64,)> = sqlx::query_as("SELECT version FROM _sqlx_migrations WHERE success")
        .fetch_all(pool)
        .await?;
    Ok(rows.into_iter().map(|(version,)| version).collect())
}

fn unapplied(embedded: impl Iterator<Item = i64>, applied: &[i64]) -> Vec<i64> {
    embedded.filter(|version| !applied.contains(version)).collect()
}

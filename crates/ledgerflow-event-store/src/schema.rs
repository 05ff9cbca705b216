//! Event store database schema.

use sqlx::PgPool;
use sqlx::migrate::Migrator;

use ledgerflow_core::error::DomainError;

/// Migrations under the workspace `migrations/` directory.
pub static MIGRATOR: Migrator = sqlx::migrate!("../../migrations");

/// SQL that creates the `domain_events` table.
pub const CREATE_EVENTS_TABLE: &str = include_str!("../../../migrations/0001_create_domain_events.sql");

/// Applies pending migrations to `pool`.
///
/// # Errors
///
/// Returns `DomainError::Infrastructure` if a migration fails.
pub async fn migrate(pool: &PgPool) -> Result<(), DomainError> {
    MIGRATOR
        .run(pool)
        .await
        .map_err(|err| DomainError::Infrastructure(format!("migration failed: {err}")))?;
    tracing::info!("event store schema is up to date");
    Ok(())
}

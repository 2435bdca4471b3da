//! Database migration command.
//!
//! Migrations are embedded from `crates/api/migrations/` and tracked in the
//! `_sqlx_migrations` table, so running the command twice is harmless.

use thiserror::Error;

use super::ConnectError;

/// Errors that can occur while migrating.
#[derive(Debug, Error)]
pub enum MigrationError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Migration error: {0}")]
    Migration(#[from] sqlx::migrate::MigrateError),
}

/// Apply every pending migration.
///
/// # Errors
///
/// Returns an error if the database is unreachable or a migration fails.
pub async fn run() -> Result<(), MigrationError> {
    let pool = super::connect().await?;

    tracing::info!("Running migrations...");
    bazaar_api::db::run_migrations(&pool).await?;

    tracing::info!("Migrations complete!");
    Ok(())
}

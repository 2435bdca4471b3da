//! CLI subcommands.

pub mod migrate;
pub mod seed;
pub mod user;

use secrecy::SecretString;
use sqlx::PgPool;

/// Error returned when no database URL is configured.
#[derive(Debug, thiserror::Error)]
#[error("Missing environment variable: BAZAAR_DATABASE_URL (or DATABASE_URL)")]
pub struct MissingDatabaseUrl;

/// Read the database URL the same way the API server does.
fn database_url() -> Result<SecretString, MissingDatabaseUrl> {
    dotenvy::dotenv().ok();

    ["BAZAAR_DATABASE_URL", "DATABASE_URL"]
        .into_iter()
        .find_map(|key| std::env::var(key).ok().filter(|v| !v.is_empty()))
        .map(SecretString::from)
        .ok_or(MissingDatabaseUrl)
}

/// Connect to the configured database.
async fn connect() -> Result<PgPool, ConnectError> {
    let database_url = database_url()?;
    tracing::info!("Connecting to database...");
    Ok(bazaar_api::db::create_pool(&database_url).await?)
}

/// Errors that can occur while connecting.
#[derive(Debug, thiserror::Error)]
pub enum ConnectError {
    #[error(transparent)]
    MissingUrl(#[from] MissingDatabaseUrl),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),
}

//! User management commands.
//!
//! # Usage
//!
//! ```bash
//! bazaar user promote alice
//! bazaar user demote alice
//! ```

use thiserror::Error;

use bazaar_api::db::RepositoryError;
use bazaar_api::store::{PgStore, Store};
use bazaar_core::{Username, UsernameError};

use super::ConnectError;

/// Errors that can occur during user operations.
#[derive(Debug, Error)]
pub enum UserError {
    #[error(transparent)]
    Connect(#[from] ConnectError),

    #[error("Invalid username: {0}")]
    InvalidUsername(#[from] UsernameError),

    #[error("No user named {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Repository(#[from] RepositoryError),
}

/// Set or clear the super user flag on a user's profile.
///
/// # Errors
///
/// Returns an error if the user does not exist or the database fails.
pub async fn set_super_user(username: &str, is_super_user: bool) -> Result<(), UserError> {
    let username = Username::parse(username)?;
    let store = PgStore::new(super::connect().await?);

    let mut tx = store.begin().await?;
    let (user, _) = tx
        .get_user_credentials(&username)
        .await?
        .ok_or_else(|| UserError::NotFound(username.to_string()))?;
    let profile = tx.set_super_user(user.id, is_super_user).await?;
    tx.commit().await?;

    tracing::info!(
        user_id = %user.id,
        profile_id = %profile.id,
        is_super_user,
        "Updated {}",
        username
    );
    Ok(())
}

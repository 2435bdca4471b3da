//! Authentication error types.

use thiserror::Error;

use crate::db::RepositoryError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// Username or password missing, or password too short.
    #[error("invalid username or password")]
    InvalidRegistration,

    /// Username has an invalid format.
    #[error("invalid username: {0}")]
    InvalidUsername(#[from] bazaar_core::UsernameError),

    /// Invalid credentials (wrong password or user not found).
    #[error("invalid credentials")]
    InvalidCredentials,

    /// User already exists.
    #[error("user already exists")]
    UserAlreadyExists,

    /// Bearer token unknown, expired, or of the wrong kind.
    #[error("invalid or expired token")]
    InvalidToken,

    /// Authenticated user has no profile.
    #[error("profile not found")]
    ProfileNotFound,

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,

    /// Token secret cannot key the digest.
    #[error("token digest error")]
    TokenDigest,
}

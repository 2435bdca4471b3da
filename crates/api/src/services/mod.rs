//! Business logic services.
//!
//! # Services
//!
//! - `auth` - Registration, login, bearer tokens
//! - `catalog` - Products and their images
//! - `cart` - Per-user cart mutations
//! - `orders` - Checkout, buy-now, status changes, admin listing
//! - `accounts` - Profiles and shipping addresses
//!
//! Services borrow the store for the length of one call. Every operation runs
//! in a single store transaction that is committed only on success.

pub mod accounts;
pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

pub use accounts::AccountService;
pub use auth::{AuthError, AuthService};
pub use cart::{CartAction, CartService};
pub use catalog::CatalogService;
pub use orders::OrderService;

use thiserror::Error;

use bazaar_core::PageError;

use crate::db::RepositoryError;

/// Errors returned by the domain services.
///
/// The message of each client-facing variant is shown to the caller as-is.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// The addressed record does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The caller may not act on the record.
    #[error("{0}")]
    PermissionDenied(String),

    /// The request is malformed or violates a rule.
    #[error("{0}")]
    InvalidArgument(String),

    /// Repository/database error.
    #[error("database error: {0}")]
    Repository(#[from] RepositoryError),
}

impl ServiceError {
    pub(crate) fn not_found(message: &str) -> Self {
        Self::NotFound(message.to_owned())
    }

    pub(crate) fn permission_denied(message: &str) -> Self {
        Self::PermissionDenied(message.to_owned())
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }
}

impl From<PageError> for ServiceError {
    fn from(_: PageError) -> Self {
        Self::not_found("Invalid page.")
    }
}

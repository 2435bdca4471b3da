//! Core types for Bazaar.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod id;
pub mod page;
pub mod price;
pub mod status;
pub mod username;

pub use id::*;
pub use page::{Page, PageError, PageRequest};
pub use price::{Price, PriceError};
pub use status::*;
pub use username::{Username, UsernameError};

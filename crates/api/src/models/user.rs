//! User domain types.

use chrono::{DateTime, Utc};

use bazaar_core::{ProfileId, UserId, Username};

/// A registered account (domain type).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user ID.
    pub id: UserId,
    /// Login name.
    pub username: Username,
    /// When the account was created.
    pub date_joined: DateTime<Utc>,
}

/// Per-user profile, created together with the user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UserProfile {
    /// Profile ID.
    pub id: ProfileId,
    /// Owning user.
    pub user_id: UserId,
    /// Grants access to the admin order listing.
    pub is_super_user: bool,
}

/// The caller of an authenticated request, resolved from its bearer token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// User's database ID.
    pub id: UserId,
    /// User's login name.
    pub username: Username,
}

impl From<User> for CurrentUser {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
        }
    }
}

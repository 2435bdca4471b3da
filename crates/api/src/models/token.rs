//! Bearer token records.

use chrono::{DateTime, Utc};

use bazaar_core::UserId;

/// What a bearer token may be used for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Short-lived token accepted on authenticated routes.
    Access,
    /// Long-lived token exchanged for new access tokens.
    Refresh,
}

impl TokenKind {
    /// The stored representation.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Access => "access",
            Self::Refresh => "refresh",
        }
    }
}

impl std::fmt::Display for TokenKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A token about to be persisted. Only the digest is stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewToken {
    pub user_id: UserId,
    pub digest: String,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

/// A stored token looked up by digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenRecord {
    pub user_id: UserId,
    pub kind: TokenKind,
    pub expires_at: DateTime<Utc>,
}

impl TokenRecord {
    /// Whether the token is past its expiry at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

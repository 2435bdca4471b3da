//! Authentication service.
//!
//! Password registration and login, plus opaque bearer tokens. A token is 32
//! random bytes (base64url). Only its HMAC-SHA256 digest, keyed by the
//! configured token secret, is stored, so a leaked table cannot be replayed.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::Utc;
use hmac::{Hmac, Mac};
use rand::RngCore;
use secrecy::ExposeSecret;
use sha2::Sha256;
use tracing::instrument;

use bazaar_core::{UserId, Username};

use crate::config::AuthConfig;
use crate::db::RepositoryError;
use crate::models::{CurrentUser, NewToken, TokenKind, UserProfile};
use crate::store::{Store, StoreTx};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 6;

/// Random bytes per token.
const TOKEN_BYTES: usize = 32;

type HmacSha256 = Hmac<Sha256>;

/// An access token and the refresh token that renews it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access: String,
    pub refresh: String,
}

/// Result of a successful registration.
#[derive(Debug, Clone)]
pub struct Registration {
    pub profile: UserProfile,
    pub tokens: TokenPair,
}

/// Authentication service.
///
/// Handles registration, login, token refresh and bearer token resolution.
pub struct AuthService<'a> {
    store: &'a dyn Store,
    config: &'a AuthConfig,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(store: &'a dyn Store, config: &'a AuthConfig) -> Self {
        Self { store, config }
    }

    /// Register a new user with username and password.
    ///
    /// Creates the user and its profile, then issues a token pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidRegistration` if either field is empty or the
    /// password is shorter than six characters.
    /// Returns `AuthError::InvalidUsername` if the username format is invalid.
    /// Returns `AuthError::UserAlreadyExists` if the username is taken.
    #[instrument(skip(self, password))]
    pub async fn register(
        &self,
        username: &str,
        password: &str,
    ) -> Result<Registration, AuthError> {
        if username.is_empty() || password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(AuthError::InvalidRegistration);
        }
        let username = Username::parse(username)?;
        let password_hash = hash_password(password)?;

        let mut tx = self.store.begin().await?;
        let (user, profile) = tx
            .create_user(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::UserAlreadyExists,
                other => AuthError::Repository(other),
            })?;
        let tokens = self.issue_pair(tx.as_mut(), user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, "User registered");
        Ok(Registration { profile, tokens })
    }

    /// Log in with username and password.
    ///
    /// The password is checked outside any transaction; expired tokens are
    /// pruned in the one that issues the new pair.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the user does not exist or the
    /// password does not match.
    #[instrument(skip(self, password))]
    pub async fn login(&self, username: &str, password: &str) -> Result<TokenPair, AuthError> {
        let username = Username::parse(username).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = {
            let mut tx = self.store.begin().await?;
            tx.get_user_credentials(&username)
                .await?
                .ok_or(AuthError::InvalidCredentials)?
        };
        verify_password(password, &password_hash)?;

        let mut tx = self.store.begin().await?;
        let pruned = tx.delete_expired_tokens(Utc::now()).await?;
        let tokens = self.issue_pair(tx.as_mut(), user.id).await?;
        tx.commit().await?;

        tracing::info!(user_id = %user.id, pruned, "User logged in");
        Ok(tokens)
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// Expired tokens are pruned along the way.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the refresh token is unknown or expired.
    #[instrument(skip_all)]
    pub async fn refresh(&self, refresh_token: &str) -> Result<String, AuthError> {
        let digest = self.digest(refresh_token)?;
        let now = Utc::now();

        let mut tx = self.store.begin().await?;
        let record = tx
            .find_token(&digest, TokenKind::Refresh)
            .await?
            .filter(|record| !record.is_expired(now))
            .ok_or(AuthError::InvalidToken)?;
        let pruned = tx.delete_expired_tokens(now).await?;
        let access = self
            .issue(tx.as_mut(), record.user_id, TokenKind::Access)
            .await?;
        tx.commit().await?;

        tracing::debug!(user_id = %record.user_id, pruned, "Access token refreshed");
        Ok(access)
    }

    /// Resolve an access token to the user it was issued to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the token is unknown, expired, not an
    /// access token, or its user no longer exists.
    pub async fn authenticate(&self, access_token: &str) -> Result<CurrentUser, AuthError> {
        let digest = self.digest(access_token)?;

        let mut tx = self.store.begin().await?;
        let record = tx
            .find_token(&digest, TokenKind::Access)
            .await?
            .filter(|record| !record.is_expired(Utc::now()))
            .ok_or(AuthError::InvalidToken)?;
        let user = tx
            .get_user(record.user_id)
            .await?
            .ok_or(AuthError::InvalidToken)?;

        Ok(user.into())
    }

    /// Get the profile of a user.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::ProfileNotFound` if the user has no profile.
    pub async fn profile(&self, user_id: UserId) -> Result<UserProfile, AuthError> {
        let mut tx = self.store.begin().await?;
        tx.get_profile(user_id)
            .await?
            .ok_or(AuthError::ProfileNotFound)
    }

    async fn issue_pair(
        &self,
        tx: &mut dyn StoreTx,
        user_id: UserId,
    ) -> Result<TokenPair, AuthError> {
        Ok(TokenPair {
            access: self.issue(tx, user_id, TokenKind::Access).await?,
            refresh: self.issue(tx, user_id, TokenKind::Refresh).await?,
        })
    }

    async fn issue(
        &self,
        tx: &mut dyn StoreTx,
        user_id: UserId,
        kind: TokenKind,
    ) -> Result<String, AuthError> {
        let ttl = match kind {
            TokenKind::Access => self.config.access_token_ttl,
            TokenKind::Refresh => self.config.refresh_token_ttl,
        };

        let token = generate_token();
        tx.insert_token(&NewToken {
            user_id,
            digest: self.digest(&token)?,
            kind,
            expires_at: Utc::now() + ttl,
        })
        .await?;

        Ok(token)
    }

    fn digest(&self, token: &str) -> Result<String, AuthError> {
        let mut mac =
            HmacSha256::new_from_slice(self.config.token_secret.expose_secret().as_bytes())
                .map_err(|_| AuthError::TokenDigest)?;
        mac.update(token.as_bytes());
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    rand::rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

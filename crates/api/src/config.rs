//! API configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `BAZAAR_TOKEN_SECRET` - HMAC key for bearer token digests (min 32 chars, high entropy)
//! - `BAZAAR_DATABASE_URL` - `PostgreSQL` connection string (falls back to `DATABASE_URL`;
//!   not needed with `BAZAAR_STORAGE=memory`)
//!
//! ## Optional
//! - `BAZAAR_STORAGE` - `postgres` (default) or `memory`
//! - `BAZAAR_HOST` - Bind address (default: 127.0.0.1)
//! - `BAZAAR_PORT` - Listen port (default: 8000)
//! - `BAZAAR_ACCESS_TOKEN_TTL_MINUTES` - Access token lifetime (default: 5)
//! - `BAZAAR_REFRESH_TOKEN_TTL_HOURS` - Refresh token lifetime (default: 24)
//! - `BAZAAR_TRACK_STOCK` - Decrement product stock on purchase (default: false)
//! - `BAZAAR_LOG_JSON` - Emit JSON logs (default: false)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Error event sample rate (default: 1.0)
//! - `SENTRY_TRACES_SAMPLE_RATE` - Transaction sample rate (default: 0.0)

use std::collections::HashMap;
use std::net::{IpAddr, SocketAddr};
use std::str::FromStr;

use chrono::Duration;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

const MIN_TOKEN_SECRET_LENGTH: usize = 32;
const MIN_ENTROPY_BITS_PER_CHAR: f64 = 3.3;

/// Blocklist of common placeholder patterns (case-insensitive)
const PLACEHOLDER_PATTERNS: &[&str] = &[
    "your-",
    "changeme",
    "replace",
    "placeholder",
    "example",
    "secret",
    "password",
    "xxx",
    "todo",
    "fixme",
    "insert",
    "enter-",
    "put-your",
    "add-your",
];

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
    #[error("Insecure secret in {0}: {1}")]
    InsecureSecret(String, String),
}

/// Where records are persisted.
#[derive(Debug, Clone)]
pub enum StorageConfig {
    /// `PostgreSQL` at the given URL (contains password).
    Postgres { database_url: SecretString },
    /// In-process tables, lost on exit.
    Memory,
}

/// Bearer token settings.
///
/// Implements `Debug` manually to redact the secret.
#[derive(Clone)]
pub struct AuthConfig {
    /// HMAC key used to digest tokens before storage
    pub token_secret: SecretString,
    /// Lifetime of access tokens
    pub access_token_ttl: Duration,
    /// Lifetime of refresh tokens
    pub refresh_token_ttl: Duration,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("token_secret", &"[REDACTED]")
            .field("access_token_ttl", &self.access_token_ttl)
            .field("refresh_token_ttl", &self.refresh_token_ttl)
            .finish()
    }
}

/// Sentry error tracking settings.
#[derive(Debug, Clone, Default)]
pub struct SentryConfig {
    /// Sentry DSN; tracking is disabled when absent
    pub dsn: Option<String>,
    /// Environment name reported with events
    pub environment: Option<String>,
    /// Error event sample rate
    pub sample_rate: f32,
    /// Transaction sample rate
    pub traces_sample_rate: f32,
}

/// API application configuration.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Storage backend
    pub storage: StorageConfig,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Bearer token settings
    pub auth: AuthConfig,
    /// Decrement stock when orders are placed
    pub track_stock: bool,
    /// Emit logs as JSON lines
    pub log_json: bool,
    /// Sentry error tracking
    pub sentry: SentryConfig,
}

impl ApiConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing, invalid, or
    /// if secrets fail validation (placeholder detection, entropy check).
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration through an arbitrary variable lookup.
    ///
    /// # Errors
    ///
    /// Same as [`ApiConfig::from_env`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let env = Env { lookup: &lookup };

        let storage = match env.get_or_default("BAZAAR_STORAGE", "postgres").as_str() {
            "postgres" => StorageConfig::Postgres {
                database_url: env.get_database_url("BAZAAR_DATABASE_URL")?,
            },
            "memory" => StorageConfig::Memory,
            other => {
                return Err(ConfigError::InvalidEnvVar(
                    "BAZAAR_STORAGE".to_string(),
                    format!("expected 'postgres' or 'memory', got '{other}'"),
                ));
            }
        };

        let host = env.parse_or_default::<IpAddr>("BAZAAR_HOST", "127.0.0.1")?;
        let port = env.parse_or_default::<u16>("BAZAAR_PORT", "8000")?;

        let token_secret = env.get_validated_secret("BAZAAR_TOKEN_SECRET")?;
        validate_token_secret(&token_secret, "BAZAAR_TOKEN_SECRET")?;
        let access_minutes = env.parse_or_default::<u32>("BAZAAR_ACCESS_TOKEN_TTL_MINUTES", "5")?;
        let refresh_hours = env.parse_or_default::<u32>("BAZAAR_REFRESH_TOKEN_TTL_HOURS", "24")?;

        let auth = AuthConfig {
            token_secret,
            access_token_ttl: Duration::minutes(i64::from(access_minutes)),
            refresh_token_ttl: Duration::hours(i64::from(refresh_hours)),
        };

        let sentry = SentryConfig {
            dsn: env.get_optional("SENTRY_DSN"),
            environment: env.get_optional("SENTRY_ENVIRONMENT"),
            sample_rate: env.parse_or_default::<f32>("SENTRY_SAMPLE_RATE", "1.0")?,
            traces_sample_rate: env.parse_or_default::<f32>("SENTRY_TRACES_SAMPLE_RATE", "0.0")?,
        };

        Ok(Self {
            storage,
            host,
            port,
            auth,
            track_stock: env.get_flag("BAZAAR_TRACK_STOCK")?,
            log_json: env.get_flag("BAZAAR_LOG_JSON")?,
            sentry,
        })
    }

    /// Returns the socket address for binding the server.
    #[must_use]
    pub const fn socket_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }
}

// =============================================================================
// Helper Functions
// =============================================================================

/// Variable lookup with the typed accessors used above.
struct Env<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl Env<'_> {
    /// Get an optional environment variable. Empty values count as unset.
    fn get_optional(&self, key: &str) -> Option<String> {
        (self.lookup)(key).filter(|value| !value.is_empty())
    }

    /// Get a required environment variable.
    fn get_required(&self, key: &str) -> Result<String, ConfigError> {
        self.get_optional(key)
            .ok_or_else(|| ConfigError::MissingEnvVar(key.to_string()))
    }

    /// Get an environment variable with a default value.
    fn get_or_default(&self, key: &str, default: &str) -> String {
        self.get_optional(key)
            .unwrap_or_else(|| default.to_string())
    }

    /// Parse an environment variable, falling back to `default`.
    fn parse_or_default<T>(&self, key: &str, default: &str) -> Result<T, ConfigError>
    where
        T: FromStr,
        T::Err: std::fmt::Display,
    {
        self.get_or_default(key, default)
            .parse::<T>()
            .map_err(|e| ConfigError::InvalidEnvVar(key.to_string(), e.to_string()))
    }

    /// Parse a boolean flag (`true`/`false`/`1`/`0`), defaulting to false.
    fn get_flag(&self, key: &str) -> Result<bool, ConfigError> {
        match self.get_optional(key).as_deref().map(str::to_lowercase) {
            None => Ok(false),
            Some(value) => match value.as_str() {
                "1" | "true" | "yes" => Ok(true),
                "0" | "false" | "no" => Ok(false),
                _ => Err(ConfigError::InvalidEnvVar(
                    key.to_string(),
                    format!("expected a boolean, got '{value}'"),
                )),
            },
        }
    }

    /// Get database URL with fallback to generic `DATABASE_URL`.
    fn get_database_url(&self, primary_key: &str) -> Result<SecretString, ConfigError> {
        self.get_optional(primary_key)
            .or_else(|| self.get_optional("DATABASE_URL"))
            .map(SecretString::from)
            .ok_or_else(|| ConfigError::MissingEnvVar(primary_key.to_string()))
    }

    /// Load and validate a secret.
    fn get_validated_secret(&self, key: &str) -> Result<SecretString, ConfigError> {
        let value = self.get_required(key)?;
        validate_secret_strength(&value, key)?;
        Ok(SecretString::from(value))
    }
}

/// Validate that the token secret meets minimum length requirements.
fn validate_token_secret(secret: &SecretString, var_name: &str) -> Result<(), ConfigError> {
    let value = secret.expose_secret();
    if value.len() < MIN_TOKEN_SECRET_LENGTH {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "must be at least {} characters (got {})",
                MIN_TOKEN_SECRET_LENGTH,
                value.len()
            ),
        ));
    }
    Ok(())
}

/// Calculate Shannon entropy in bits per character.
fn shannon_entropy(s: &str) -> f64 {
    if s.is_empty() {
        return 0.0;
    }

    let mut freq: HashMap<char, usize> = HashMap::new();
    for c in s.chars() {
        *freq.entry(c).or_insert(0) += 1;
    }

    #[allow(clippy::cast_precision_loss)] // String length will never exceed f64 precision
    let len = s.len() as f64;
    freq.values()
        .map(|&count| {
            #[allow(clippy::cast_precision_loss)]
            let p = count as f64 / len;
            -p * p.log2()
        })
        .sum()
}

/// Validate that a secret is not a placeholder and has sufficient entropy.
fn validate_secret_strength(secret: &str, var_name: &str) -> Result<(), ConfigError> {
    let lower = secret.to_lowercase();

    if let Some(pattern) = PLACEHOLDER_PATTERNS.iter().find(|p| lower.contains(*p)) {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!("appears to be a placeholder (contains '{pattern}')"),
        ));
    }

    let entropy = shannon_entropy(secret);
    if entropy < MIN_ENTROPY_BITS_PER_CHAR {
        return Err(ConfigError::InsecureSecret(
            var_name.to_string(),
            format!(
                "entropy too low ({entropy:.2} bits/char, need >= {MIN_ENTROPY_BITS_PER_CHAR:.1}). Use a randomly generated secret."
            ),
        ));
    }

    Ok(())
}

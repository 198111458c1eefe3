//! Server configuration loaded from environment variables.
//!
//! # Environment Variables
//!
//! ## Required
//! - `ORDERGATE_DATABASE_URL` - `PostgreSQL` connection string for the
//!   commerce database (read-only access is sufficient)
//! - `ORDERGATE_BACKOFFICE_URL` - Base URL of the shop backoffice, used to
//!   build order and customer detail links
//!
//! ## Optional
//! - `ORDERGATE_HOST` - Bind address (default: 127.0.0.1)
//! - `ORDERGATE_PORT` - Listen port (default: 3007)
//! - `ORDERGATE_DEFAULT_TIMEZONE` - Fallback store timezone (default:
//!   Europe/Berlin)
//! - `ORDERGATE_SHOP_VERSION` - Host shop version reported by `/api/info`
//!   (default: empty)
//! - `ORDERGATE_SHOP_EDITION` - Host shop edition reported by `/api/info`
//!   (default: empty)
//! - `SENTRY_DSN` - Sentry error tracking DSN
//! - `SENTRY_ENVIRONMENT` - Sentry environment name
//! - `SENTRY_SAMPLE_RATE` - Sentry error sample rate (default: 1.0)

use std::net::{IpAddr, SocketAddr};

use chrono_tz::Tz;
use secrecy::SecretString;
use thiserror::Error;
use url::Url;

/// Configuration errors that can occur during loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

/// Server application configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// `PostgreSQL` database connection URL (contains password)
    pub database_url: SecretString,
    /// IP address to bind the server to
    pub host: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Base URL of the shop backoffice
    pub backoffice_url: Url,
    /// Fallback timezone for stores with no (or an invalid) configured zone
    pub default_timezone: Tz,
    /// Host shop version reported by the info endpoint
    pub shop_version: String,
    /// Host shop edition reported by the info endpoint (may be empty)
    pub shop_edition: String,
    /// Sentry DSN for error tracking
    pub sentry_dsn: Option<String>,
    /// Sentry environment (e.g., "staging", "production")
    pub sentry_environment: Option<String>,
    /// Sentry error sample rate (0.0 to 1.0)
    pub sentry_sample_rate: f32,
}

impl ServerConfig {
    /// Load configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv()` to load from `.env` file if present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if required variables are missing or invalid.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if present (ignore errors if not found)
        let _ = dotenvy::dotenv();

        let database_url = get_database_url("ORDERGATE_DATABASE_URL")?;
        let host = get_env_or_default("ORDERGATE_HOST", "127.0.0.1")
            .parse::<IpAddr>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDERGATE_HOST".to_string(), e.to_string()))?;
        let port = get_env_or_default("ORDERGATE_PORT", "3007")
            .parse::<u16>()
            .map_err(|e| ConfigError::InvalidEnvVar("ORDERGATE_PORT".to_string(), e.to_string()))?;

        let backoffice_url = Url::parse(&get_required_env("ORDERGATE_BACKOFFICE_URL")?).map_err(
            |e| ConfigError::InvalidEnvVar("ORDERGATE_BACKOFFICE_URL".to_string(), e.to_string()),
        )?;

        let default_timezone = get_env_or_default("ORDERGATE_DEFAULT_TIMEZONE", "Europe/Berlin")
            .parse::<Tz>()
            .map_err(|e| {
                ConfigError::InvalidEnvVar("ORDERGATE_DEFAULT_TIMEZONE".to_string(), e.to_string())
            })?;

        let shop_version = get_env_or_default("ORDERGATE_SHOP_VERSION", "");
        let shop_edition = get_env_or_default("ORDERGATE_SHOP_EDITION", "");

        let sentry_dsn = get_optional_env("SENTRY_DSN");
        let sentry_environment = get_optional_env("SENTRY_ENVIRONMENT");
        let sentry_sample_rate = get_optional_env("SENTRY_SAMPLE_RATE")
            .and_then(|s| s.parse().ok())
            .unwrap_or(1.0);

        Ok(Self {
            database_url,
            host,
            port,
            backoffice_url,
            default_timezone,
            shop_version,
            shop_edition,
            sentry_dsn,
            sentry_environment,
            sentry_sample_rate,
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

/// Get a required environment variable.
fn get_required_env(key: &str) -> Result<String, ConfigError> {
    std::env::var(key).map_err(|_| ConfigError::MissingEnvVar(key.to_string()))
}

/// Get database URL with fallback to generic `DATABASE_URL`.
fn get_database_url(primary_key: &str) -> Result<SecretString, ConfigError> {
    if let Ok(value) = std::env::var(primary_key) {
        return Ok(SecretString::from(value));
    }
    if let Ok(value) = std::env::var("DATABASE_URL") {
        return Ok(SecretString::from(value));
    }
    Err(ConfigError::MissingEnvVar(primary_key.to_string()))
}

/// Get an optional environment variable.
fn get_optional_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

/// Get an environment variable with a default value.
fn get_env_or_default(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

//! Configuration management for the registration service.
//!
//! Loads configuration from environment variables with sensible defaults.
//! Only the binaries read the environment; every component receives its
//! settings at construction.

use rsvp_runtime::retry::RetryPolicy;
use serde::{Deserialize, Serialize};
use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

/// Development JWT secret used when `JWT_SECRET` is unset.
pub const DEV_JWT_SECRET: &str = "dev-secret-change-in-production";

/// Configuration errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A variable is set but cannot be parsed.
    #[error("{name} has invalid value '{value}'")]
    Invalid {
        /// Variable name
        name: &'static str,
        /// Raw value
        value: String,
    },

    /// Values parse but do not make sense together.
    #[error("invalid configuration: {0}")]
    Validation(String),
}

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// HTTP server
    pub server: ServerConfig,
    /// Storage backend
    pub database: DatabaseConfig,
    /// Credentials
    pub auth: AuthConfig,
    /// Registration retry behaviour
    pub registration: RegistrationConfig,
    /// Prometheus exporter
    pub metrics: MetricsConfig,
    /// Seed data
    pub seed: SeedConfig,
}

/// Server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Host to bind to
    pub host: String,
    /// Port to bind to
    pub port: u16,
    /// Graceful shutdown timeout in seconds
    pub shutdown_timeout: u64,
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// `PostgreSQL` connection URL; the in-memory store is used when unset
    pub url: Option<String>,
    /// Maximum number of connections in the pool
    pub max_connections: u32,
    /// Connection timeout in seconds
    pub connect_timeout: u64,
}

/// Authentication configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// HMAC secret for signing tokens
    pub jwt_secret: String,
    /// Token lifetime in seconds (default: 7 days)
    pub token_ttl: i64,
}

impl std::fmt::Debug for AuthConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthConfig")
            .field("jwt_secret", &"<redacted>")
            .field("token_ttl", &self.token_ttl)
            .finish()
    }
}

/// Retry configuration for conflicting registration writes
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationConfig {
    /// Attempts before reporting a transient failure
    pub max_attempts: u32,
    /// First backoff delay in milliseconds
    pub retry_initial_delay_ms: u64,
    /// Backoff ceiling in milliseconds
    pub retry_max_delay_ms: u64,
}

/// Metrics configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetricsConfig {
    /// Install the Prometheus exporter
    pub enabled: bool,
    /// Scrape endpoint host
    pub host: String,
    /// Scrape endpoint port
    pub port: u16,
}

/// Seed configuration
#[derive(Clone, Serialize, Deserialize)]
pub struct SeedConfig {
    /// Administrator email
    pub admin_email: String,
    /// Administrator password
    pub admin_password: String,
}

impl std::fmt::Debug for SeedConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SeedConfig")
            .field("admin_email", &self.admin_email)
            .field("admin_password", &"<redacted>")
            .finish()
    }
}

impl Config {
    /// Load configuration from environment variables.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a variable cannot be parsed or the result
    /// fails [`Config::validate`].
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Load configuration through `lookup` instead of the process
    /// environment.
    ///
    /// # Errors
    ///
    /// Same as [`Config::from_env`].
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let text = |name: &str, default: &str| lookup(name).unwrap_or_else(|| default.to_string());

        let config = Self {
            server: ServerConfig {
                host: text("HOST", "0.0.0.0"),
                port: parsed(&lookup, "PORT", 8080)?,
                shutdown_timeout: parsed(&lookup, "SHUTDOWN_TIMEOUT", 30)?,
            },
            database: DatabaseConfig {
                url: lookup("DATABASE_URL").filter(|url| !url.trim().is_empty()),
                max_connections: parsed(&lookup, "DATABASE_MAX_CONNECTIONS", 10)?,
                connect_timeout: parsed(&lookup, "DATABASE_CONNECT_TIMEOUT", 30)?,
            },
            auth: AuthConfig {
                jwt_secret: text("JWT_SECRET", DEV_JWT_SECRET),
                token_ttl: parsed(&lookup, "AUTH_TOKEN_TTL", 604_800)?,
            },
            registration: RegistrationConfig {
                max_attempts: parsed(&lookup, "REGISTRATION_MAX_ATTEMPTS", 5)?,
                retry_initial_delay_ms: parsed(&lookup, "REGISTRATION_RETRY_INITIAL_DELAY_MS", 10)?,
                retry_max_delay_ms: parsed(&lookup, "REGISTRATION_RETRY_MAX_DELAY_MS", 200)?,
            },
            metrics: MetricsConfig {
                enabled: parsed(&lookup, "METRICS_ENABLED", false)?,
                host: text("METRICS_HOST", "0.0.0.0"),
                port: parsed(&lookup, "METRICS_PORT", 9090)?,
            },
            seed: SeedConfig {
                admin_email: text("SEED_ADMIN_EMAIL", "admin@example.com"),
                admin_password: text("SEED_ADMIN_PASSWORD", "admin123"),
            },
        };

        config.validate()?;
        Ok(config)
    }

    /// Check values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Validation`] naming the offending setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.registration.max_attempts == 0 {
            return Err(ConfigError::Validation(
                "REGISTRATION_MAX_ATTEMPTS must be at least 1".to_string(),
            ));
        }
        if self.auth.jwt_secret.trim().is_empty() {
            return Err(ConfigError::Validation("JWT_SECRET must not be empty".to_string()));
        }
        if self.auth.token_ttl <= 0 {
            return Err(ConfigError::Validation("AUTH_TOKEN_TTL must be positive".to_string()));
        }
        if self.registration.retry_initial_delay_ms > self.registration.retry_max_delay_ms {
            return Err(ConfigError::Validation(
                "REGISTRATION_RETRY_INITIAL_DELAY_MS exceeds REGISTRATION_RETRY_MAX_DELAY_MS".to_string(),
            ));
        }
        Ok(())
    }

    /// HTTP bind address.
    #[must_use]
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }

    /// Prometheus scrape address.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `METRICS_HOST` is not an IP address.
    pub fn metrics_addr(&self) -> Result<SocketAddr, ConfigError> {
        let raw = format!("{}:{}", self.metrics.host, self.metrics.port);
        raw.parse().map_err(|_| ConfigError::Invalid { name: "METRICS_HOST", value: raw })
    }

    /// Backoff policy for conflicting registration writes.
    #[must_use]
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::builder()
            .max_attempts(self.registration.max_attempts)
            .initial_delay(Duration::from_millis(self.registration.retry_initial_delay_ms))
            .max_delay(Duration::from_millis(self.registration.retry_max_delay_ms))
            .multiplier(2.0)
            .jitter(true)
            .build()
    }

    /// Token lifetime.
    #[must_use]
    pub fn token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.auth.token_ttl)
    }

    /// `true` when running with the development JWT secret.
    #[must_use]
    pub fn uses_dev_secret(&self) -> bool {
        self.auth.jwt_secret == DEV_JWT_SECRET
    }
}

fn parsed<F, T>(lookup: &F, name: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(name) {
        None => Ok(default),
        Some(value) => value
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid { name, value }),
    }
}

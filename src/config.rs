//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::time::Duration;

use chrono::FixedOffset;

use crate::domain::invoice::parse_utc_offset;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Database connection URL
    pub database_url: String,

    /// Maximum database connections in pool
    pub database_max_connections: u32,

    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Reference timezone for invoice days
    pub ledger_utc_offset: FixedOffset,

    /// How long a unit waits for an account row lock (0 = no limit)
    pub lock_timeout: Option<Duration>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url = env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingEnv("DATABASE_URL"))?;

        let database_max_connections = env::var("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|_| "10".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("DATABASE_MAX_CONNECTIONS"))?;

        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());

        let port = env::var("PORT")
            .unwrap_or_else(|_| "3000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("PORT"))?;

        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let ledger_utc_offset = parse_utc_offset(
            &env::var("LEDGER_UTC_OFFSET").unwrap_or_else(|_| "+00:00".to_string()),
        )
        .ok_or(ConfigError::InvalidValue("LEDGER_UTC_OFFSET"))?;

        let lock_timeout_ms: u64 = env::var("LOCK_TIMEOUT_MS")
            .unwrap_or_else(|_| "5000".to_string())
            .parse()
            .map_err(|_| ConfigError::InvalidValue("LOCK_TIMEOUT_MS"))?;
        let lock_timeout = (lock_timeout_ms > 0).then(|| Duration::from_millis(lock_timeout_ms));

        Ok(Self {
            database_url,
            database_max_connections,
            host,
            port,
            environment,
            ledger_utc_offset,
            lock_timeout,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnv(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

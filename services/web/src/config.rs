//! services/web/src/config.rs
//!
//! Defines the application's configuration structure and loading logic.
//!
//! All configuration is loaded from environment variables at startup. The `.env`
//! file is used for local development.

use std::net::SocketAddr;
use std::path::PathBuf;
use tracing::Level;

/// A custom error type for configuration loading failures.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing the environment variable {0}")]
    MissingVar(String),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(String, String),
}

/// Holds all configuration loaded from the environment at startup.
#[derive(Clone, Debug)]
pub struct Config {
    pub bind_address: SocketAddr,
    pub database_url: String,
    pub log_level: Level,
    /// Directory holding survey definition documents and code snippets.
    pub config_dir: PathBuf,
    /// Public base URL embedded in invitation links.
    pub base_url: String,
    /// HTTP mail gateway endpoint. Absent means invitation batches are
    /// logged and dropped.
    pub mail_gateway_url: Option<String>,
    /// Sessions untouched for this long are removed by the sweep binary.
    pub session_retention_days: i64,
}

impl Config {
    /// Loads configuration from environment variables.
    ///
    /// It will look for a `.env` file in the current directory for development,
    /// but this is skipped in test environments to ensure tests are hermetic.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Only load from .env in non-test mode to avoid contamination.
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }

        // --- Load Server and Database Settings ---
        let bind_address_str =
            std::env::var("BIND_ADDRESS").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_address = bind_address_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS".to_string(), e.to_string()))?;

        let database_url = std::env::var("DATABASE_URL")
            .map_err(|_| ConfigError::MissingVar("DATABASE_URL".to_string()))?;

        let log_level_str = std::env::var("RUST_LOG").unwrap_or_else(|_| "INFO".to_string());
        let log_level = log_level_str.parse::<Level>().map_err(|_| {
            ConfigError::InvalidValue(
                "RUST_LOG".to_string(),
                format!("'{}' is not a valid log level", log_level_str),
            )
        })?;

        let config_dir = std::env::var("CONFIG_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./config"));

        // --- Load Invitation Settings ---
        let base_url =
            std::env::var("BASE_URL").unwrap_or_else(|_| "http://localhost:3000".to_string());
        let mail_gateway_url = std::env::var("MAIL_GATEWAY_URL").ok();

        // --- Load Session Retention ---
        let retention_str =
            std::env::var("SESSION_RETENTION_DAYS").unwrap_or_else(|_| "30".to_string());
        let session_retention_days = retention_str.parse::<i64>().map_err(|_| {
            ConfigError::InvalidValue(
                "SESSION_RETENTION_DAYS".to_string(),
                format!("'{}' is not a valid day count", retention_str),
            )
        })?;

        Ok(Self {
            bind_address,
            database_url,
            log_level,
            config_dir,
            base_url,
            mail_gateway_url,
            session_retention_days,
        })
    }
}

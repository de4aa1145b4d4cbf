//! Configuration management for the Pharmacy Operations Assistant
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with PHARMACY_ prefix

use config::{ConfigError, Environment, File};
use serde::Deserialize;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Notification trigger and scheduler configuration
    pub notification: NotificationConfig,

    /// Outbound email configuration
    pub email: EmailConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server port
    pub port: u16,

    /// Server host
    pub host: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotificationConfig {
    /// Daily trigger time, "HH:MM" 24-hour clock
    pub time_of_day: String,

    /// Half-width of the daily run window in minutes
    pub tolerance_minutes: i64,

    /// Look-ahead for medication expiry warnings, in days
    pub medication_warning_days: i64,

    /// Look-ahead for prescription expiry warnings, in days
    pub prescription_warning_days: i64,

    /// Look-ahead for stock batch expiry warnings, in days
    pub stock_warning_days: i64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct EmailConfig {
    /// Email delivery API endpoint
    pub api_endpoint: String,

    /// Email delivery API key
    pub api_key: String,

    /// Sender address for outbound mail
    pub from_address: String,
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("PHARMACY_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default("notification.time_of_day", "09:00")?
            .set_default("notification.tolerance_minutes", 30)?
            .set_default("notification.medication_warning_days", 7)?
            .set_default("notification.prescription_warning_days", 7)?
            .set_default("notification.stock_warning_days", 90)?
            .set_default("email.api_endpoint", "")?
            .set_default("email.api_key", "")?
            .set_default("email.from_address", "noreply@pharmacy.local")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (PHARMACY_ prefix)
            .add_source(
                Environment::with_prefix("PHARMACY")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: 3000,
            host: "0.0.0.0".to_string(),
        }
    }
}

//! Configuration management for the apparel operations backend
//!
//! Supports hierarchical configuration loading:
//! 1. Default values in code
//! 2. Configuration files (development.toml, production.toml)
//! 3. Environment variable overrides with APPAREL_ prefix

use config::{ConfigError, Environment, File};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use shared::DEFAULT_CENTRAL_LOCATION_ID;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    /// Current environment (development, production)
    pub environment: String,

    /// Server configuration
    pub server: ServerConfig,

    /// Database configuration
    pub database: DatabaseConfig,

    /// Consignment and payment accounting
    #[serde(default)]
    pub accounting: AccountingConfig,

    /// Production workflow defaults
    #[serde(default)]
    pub production: ProductionConfig,
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
    /// PostgreSQL connection URL, or `memory://` for the in-process store
    pub url: String,

    /// Maximum number of connections in the pool
    pub max_connections: u32,

    /// Minimum number of connections in the pool
    pub min_connections: u32,
}

impl DatabaseConfig {
    pub fn is_memory(&self) -> bool {
        self.url.starts_with("memory://")
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AccountingConfig {
    /// Location whose sales are not subject to a consignment margin
    pub central_location_id: Uuid,

    /// A receivable at or below this amount counts as paid
    pub paid_epsilon: Decimal,
}

impl Default for AccountingConfig {
    fn default() -> Self {
        Self {
            central_location_id: DEFAULT_CENTRAL_LOCATION_ID,
            paid_epsilon: Decimal::ONE,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ProductionConfig {
    /// Colour booked for finished goods when a batch has no variant
    pub default_color: String,
}

impl Default for ProductionConfig {
    fn default() -> Self {
        Self {
            default_color: "Umum".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let environment =
            std::env::var("APPAREL_ENVIRONMENT").unwrap_or_else(|_| "development".into());

        let config = config::Config::builder()
            // Start with default values
            .set_default("environment", environment.clone())?
            .set_default("server.port", 3000)?
            .set_default("server.host", "0.0.0.0")?
            .set_default("database.url", "memory://")?
            .set_default("database.max_connections", 10)?
            .set_default("database.min_connections", 2)?
            .set_default(
                "accounting.central_location_id",
                DEFAULT_CENTRAL_LOCATION_ID.to_string(),
            )?
            .set_default("accounting.paid_epsilon", "1")?
            .set_default("production.default_color", "Umum")?
            // Load environment-specific config file
            .add_source(File::with_name(&format!("config/{}", environment)).required(false))
            // Override with environment variables (APPAREL_ prefix)
            .add_source(
                Environment::with_prefix("APPAREL")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Configuration for tests and local runs against the in-memory store
    pub fn in_memory() -> Self {
        Self {
            environment: "test".to_string(),
            server: ServerConfig::default(),
            database: DatabaseConfig {
                url: "memory://".to_string(),
                max_connections: 1,
                min_connections: 1,
            },
            accounting: AccountingConfig::default(),
            production: ProductionConfig::default(),
        }
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

// ============================================================================
// Configuration
// ============================================================================
//
// Defaults, then `.env`, then the process environment:
// - APP_*       store backend and log filter
// - POSTGRES_*  connection settings
//
// ============================================================================

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, ConfigError, Environment};
use serde::Deserialize;

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub app: AppSettings,
    pub database: DatabaseSettings,
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AppSettings {
    pub store: StoreKind,
    pub log_filter: String,
}

/// Read from `POSTGRES_*`
#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub host: String,
    pub port: u16,
    pub database: String,
    /// Full connection string; wins over the individual parts when set
    pub conn: Option<String>,
    pub max_connections: u32,
}

impl DatabaseSettings {
    pub fn connection_url(&self) -> String {
        match &self.conn {
            Some(conn) if !conn.is_empty() => conn.clone(),
            _ => format!(
                "postgres://{}:{}@{}:{}/{}",
                self.username, self.password, self.host, self.port, self.database
            ),
        }
    }
}

fn app_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("store", "memory")?
        .set_default("log_filter", "info,tender_service=debug")
}

fn database_defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("username", "postgres")?
        .set_default("password", "")?
        .set_default("host", "localhost")?
        .set_default("port", 5432)?
        .set_default("database", "postgres")?
        .set_default("max_connections", 10)
}

impl AppConfig {
    /// `.env` first, then the process environment
    pub fn load() -> Result<Self, ConfigError> {
        if let Err(e) = dotenvy::dotenv() {
            tracing::debug!(error = %e, "No .env file loaded");
        }

        let app = app_defaults()?
            .add_source(Environment::with_prefix("APP"))
            .build()?
            .try_deserialize()?;
        let database = database_defaults()?
            .add_source(Environment::with_prefix("POSTGRES").try_parsing(true))
            .build()?
            .try_deserialize()?;

        Ok(Self { app, database })
    }
}

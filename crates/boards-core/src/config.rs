//! Configuration module
//!
//! Settings for the store connection, the license source and the cloud limits
//! applied at startup. Everything is read from the environment (and `.env`).

use std::env;
use std::path::PathBuf;

use crate::constants::ADMIN_PAGE_SIZE;

// Common constants
const MAX_CONNECTIONS: u32 = 5;
const CONNECTION_TIMEOUT_SECS: u64 = 30;

/// Application configuration
#[derive(Clone, Debug)]
pub struct Config {
    pub environment: String,
    /// Postgres connection string. The in-memory store is used when unset.
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub db_timeout_seconds: u64,
    /// JSON license file, read when the store is backed by Postgres.
    pub license_path: Option<PathBuf>,
    /// Card limit applied on startup, as if pushed by the cloud portal.
    pub card_limit: Option<i32>,
    pub admin_page_size: usize,
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let environment = self.environment.to_lowercase();
        environment == "production" || environment == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();

        let environment = env::var("ENVIRONMENT")
            .or_else(|_| env::var("APP_ENV"))
            .unwrap_or_else(|_| "development".to_string());

        let card_limit = match env::var("BOARDS_CARD_LIMIT").ok().filter(|s| !s.is_empty()) {
            Some(value) => Some(value.trim().parse::<i32>().map_err(|_| {
                anyhow::anyhow!("BOARDS_CARD_LIMIT must be a valid number, got '{}'", value)
            })?),
            None => None,
        };

        let config = Config {
            environment,
            database_url: env::var("DATABASE_URL").ok().filter(|s| !s.is_empty()),
            db_max_connections: env::var("DB_MAX_CONNECTIONS")
                .unwrap_or_else(|_| MAX_CONNECTIONS.to_string())
                .parse()
                .unwrap_or(MAX_CONNECTIONS),
            db_timeout_seconds: env::var("DB_TIMEOUT_SECONDS")
                .unwrap_or_else(|_| CONNECTION_TIMEOUT_SECS.to_string())
                .parse()
                .unwrap_or(CONNECTION_TIMEOUT_SECS),
            license_path: env::var("BOARDS_LICENSE_PATH")
                .ok()
                .filter(|s| !s.is_empty())
                .map(PathBuf::from),
            card_limit,
            admin_page_size: env::var("BOARDS_ADMIN_PAGE_SIZE")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(ADMIN_PAGE_SIZE),
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if let Some(url) = &self.database_url {
            if !url.starts_with("postgres://") && !url.starts_with("postgresql://") {
                return Err(anyhow::anyhow!(
                    "DATABASE_URL must be a valid PostgreSQL connection string"
                ));
            }
        }

        if self.admin_page_size == 0 {
            return Err(anyhow::anyhow!(
                "BOARDS_ADMIN_PAGE_SIZE must be greater than zero"
            ));
        }

        if matches!(self.card_limit, Some(limit) if limit < 0) {
            return Err(anyhow::anyhow!("BOARDS_CARD_LIMIT cannot be negative"));
        }

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            database_url: None,
            db_max_connections: MAX_CONNECTIONS,
            db_timeout_seconds: CONNECTION_TIMEOUT_SECS,
            license_path: None,
            card_limit: None,
            admin_page_size: ADMIN_PAGE_SIZE,
        }
    }
}

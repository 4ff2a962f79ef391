//! Server configuration loaded from the environment.
//!
//! # Environment Variables
//!
//! - `DATABASE_URL` - required, any sea-orm connection string (e.g. `sqlite://shop.db?mode=rwc`)
//! - `BIND_ADDRESS` - listen address (default: 0.0.0.0:3000)
//! - `SEED_DEMO` - insert demo catalog and orders into an empty database (default: false)
//!
//! Log filtering is read by `tracing-subscriber` from `RUST_LOG`.

use thiserror::Error;

const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:3000";

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),
    #[error("Invalid environment variable {0}: {1}")]
    InvalidEnvVar(String, String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub database_url: String,
    pub bind_address: String,
    pub seed_demo: bool,
}

impl AppConfig {
    /// Loads `.env` (if present) and then reads the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_vars(|key| std::env::var(key).ok())
    }

    pub fn from_vars<F>(var: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let database_url = var("DATABASE_URL")
            .filter(|value| !value.trim().is_empty())
            .ok_or_else(|| ConfigError::MissingEnvVar("DATABASE_URL".to_string()))?;

        let bind_address = var("BIND_ADDRESS").unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        let seed_demo = match var("SEED_DEMO").as_deref().map(str::trim) {
            None | Some("") => false,
            Some(value) => parse_flag(value).ok_or_else(|| {
                ConfigError::InvalidEnvVar("SEED_DEMO".to_string(), value.to_string())
            })?,
        };

        Ok(Self {
            database_url,
            bind_address,
            seed_demo,
        })
    }
}

fn parse_flag(value: &str) -> Option<bool> {
    match value.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

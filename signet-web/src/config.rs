use std::env;
use std::time::Duration;

use anyhow::{Context, Result};

/// Runtime configuration, read once at boot from the environment (a `.env`
/// file is honored via dotenv before this runs).
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub provider_base_url: String,
    pub provider_api_key: String,
    pub provider_timeout: Duration,
    pub postgres: PostgresConfig,
    pub jwt_secret: String,
    pub webhook_secret: String,
}

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub user: String,
    pub password: String,
    pub database: String,
}

impl PostgresConfig {
    pub fn url(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.user, self.password, self.host, self.port, self.database
        )
    }
}

fn required(key: &str) -> Result<String> {
    env::var(key).with_context(|| format!("missing environment variable {key}"))
}

fn optional(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_string())
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let provider_timeout_ms: u64 = optional("PROVIDER_TIMEOUT_MS", "30000")
            .parse()
            .context("PROVIDER_TIMEOUT_MS must be an integer")?;
        let port: u16 = optional("PORT", "3000").parse().context("PORT must be an integer")?;
        let postgres_port: u16 = optional("POSTGRES_PORT", "5432")
            .parse()
            .context("POSTGRES_PORT must be an integer")?;

        Ok(Self {
            port,
            provider_base_url: required("PROVIDER_BASE_URL")?,
            provider_api_key: required("PROVIDER_API_KEY")?,
            provider_timeout: Duration::from_millis(provider_timeout_ms),
            postgres: PostgresConfig {
                host: optional("POSTGRES_HOST", "127.0.0.1"),
                port: postgres_port,
                user: optional("POSTGRES_USER", "postgres"),
                password: optional("POSTGRES_PASSWORD", "postgres"),
                database: optional("POSTGRES_DB", "signet"),
            },
            jwt_secret: required("JWT_SECRET")?,
            webhook_secret: required("WEBHOOK_SECRET")?,
        })
    }
}

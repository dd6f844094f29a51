//! Process configuration, loaded from the environment.
//!
//! Follows `db::Database`'s `std::env::var(...).ok().and_then(|s|
//! s.parse().ok()).unwrap_or(default)` style throughout.

use std::time::Duration;

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub pg_pool_size: u32,
    pub bind_addr: String,
    pub default_sale_id: String,
    pub user_mark_ttl: Duration,
    pub stale_mark_sweep_interval: Duration,
    pub log_level: String,
    pub log_dir: String,
    pub log_file: String,
    pub log_json: bool,
    /// Accepted but unused by the admission core (open question (a)):
    /// reserved for an external rate-limiter collaborator.
    pub rate_limit_window_secs: u64,
    pub rate_limit_burst: u32,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    Missing(&'static str),
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let database_url =
            std::env::var("DATABASE_URL").map_err(|_| ConfigError::Missing("DATABASE_URL"))?;

        Ok(Self {
            database_url,
            pg_pool_size: env_parsed("PG_POOL_SIZE").unwrap_or(20),
            bind_addr: std::env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string()),
            default_sale_id: std::env::var("DEFAULT_SALE_ID")
                .unwrap_or_else(|_| "default-sale".to_string()),
            user_mark_ttl: Duration::from_secs(env_parsed("USER_MARK_TTL_SECS").unwrap_or(86_400)),
            stale_mark_sweep_interval: Duration::from_secs(
                env_parsed("STALE_MARK_SWEEP_SECS").unwrap_or(60),
            ),
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            log_dir: std::env::var("LOG_DIR").unwrap_or_else(|_| "logs".to_string()),
            log_file: std::env::var("LOG_FILE").unwrap_or_else(|_| "flashgate.log".to_string()),
            log_json: env_parsed("LOG_JSON").unwrap_or(false),
            rate_limit_window_secs: env_parsed("RATE_LIMIT_WINDOW_SECS").unwrap_or(1),
            rate_limit_burst: env_parsed("RATE_LIMIT_BURST").unwrap_or(10),
        })
    }
}

fn env_parsed<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|s| s.parse().ok())
}

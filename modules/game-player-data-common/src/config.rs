use std::env;
use std::time::Duration;

use tracing::info;

use crate::defaults::DefaultPolicy;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    // Postgres
    pub database_url: String,
    pub store_timeout: Duration,

    // Update feed
    pub feed_consumer: String,
    pub feed_poll_interval: Duration,
    pub feed_batch_size: usize,

    // Web server
    pub api_host: String,
    pub api_port: u16,

    pub defaults: DefaultPolicy,
}

impl Config {
    /// Load configuration from environment variables.
    /// Panics with a clear message if required vars are missing or malformed.
    pub fn from_env() -> Self {
        let builtin = DefaultPolicy::default();
        Self {
            database_url: required_env("DATABASE_URL"),
            store_timeout: Duration::from_millis(parsed_env("STORE_TIMEOUT_MS", 5_000)),
            feed_consumer: env::var("FEED_CONSUMER")
                .unwrap_or_else(|_| "game-player-data".to_string()),
            feed_poll_interval: Duration::from_millis(parsed_env("FEED_POLL_INTERVAL_MS", 250)),
            feed_batch_size: parsed_env("FEED_BATCH_SIZE", 100),
            api_host: env::var("API_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            api_port: parsed_env("API_PORT", 10_000),
            defaults: DefaultPolicy {
                block_sumo_block_slot: parsed_env("DEFAULT_BLOCK_SLOT", builtin.block_sumo_block_slot),
                block_sumo_shears_slot: parsed_env(
                    "DEFAULT_SHEARS_SLOT",
                    builtin.block_sumo_shears_slot,
                ),
            },
        }
    }

    /// Log the effective configuration without credentials.
    pub fn log_redacted(&self) {
        info!(
            database = %redact_url(&self.database_url),
            store_timeout_ms = self.store_timeout.as_millis() as u64,
            feed_consumer = self.feed_consumer.as_str(),
            feed_poll_interval_ms = self.feed_poll_interval.as_millis() as u64,
            feed_batch_size = self.feed_batch_size,
            api = %format!("{}:{}", self.api_host, self.api_port),
            "Loaded configuration"
        );
    }
}

fn required_env(key: &str) -> String {
    env::var(key).unwrap_or_else(|_| panic!("{key} environment variable is required"))
}

fn parsed_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    match env::var(key) {
        Ok(raw) => raw
            .parse()
            .unwrap_or_else(|_| panic!("{key} must be a valid {}", std::any::type_name::<T>())),
        Err(_) => default,
    }
}

/// Strip the userinfo part of a connection URL.
fn redact_url(url: &str) -> String {
    match (url.find("://"), url.rfind('@')) {
        (Some(scheme_end), Some(at)) if at > scheme_end => {
            format!("{}://***@{}", &url[..scheme_end], &url[at + 1..])
        }
        _ => url.to_string(),
    }
}

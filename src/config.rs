//! Configuration module
//!
//! Loads configuration from environment variables.

use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::domain::{Balance, MAX_AMOUNT};
use crate::jobs::WorkerPoolConfig;

/// Application configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Server host
    pub host: String,

    /// Server port
    pub port: u16,

    /// Environment (development, production)
    pub environment: String,

    /// Number of concurrent settlement workers
    pub worker_count: usize,

    /// Jobs the queue buffers before producers are pushed back
    pub queue_capacity: usize,

    /// Credit given to every new wallet whose owner goes through verification
    pub starting_credit: u64,

    /// Simulated processing time per job
    pub job_delay: Duration,

    /// How long shutdown waits for the queue to drain
    pub shutdown_timeout: Duration,

    /// Emit logs as JSON lines
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
            environment: "development".to_string(),
            worker_count: 3,
            queue_capacity: 5,
            starting_credit: 2000,
            job_delay: Duration::from_millis(1000),
            shutdown_timeout: Duration::from_secs(30),
            log_json: false,
        }
    }
}

fn parse_var<T: FromStr>(name: &'static str, default: &str) -> Result<T, ConfigError> {
    env::var(name)
        .unwrap_or_else(|_| default.to_string())
        .trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(name))
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        let host = env::var("HOST").unwrap_or_else(|_| "127.0.0.1".to_string());
        let port = parse_var("PORT", "8080")?;
        let environment = env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string());

        let worker_count: usize = parse_var("WORKER_COUNT", "3")?;
        if worker_count == 0 {
            return Err(ConfigError::InvalidValue("WORKER_COUNT"));
        }

        let queue_capacity: usize = parse_var("QUEUE_CAPACITY", "5")?;
        if queue_capacity == 0 {
            return Err(ConfigError::InvalidValue("QUEUE_CAPACITY"));
        }

        let starting_credit: u64 = parse_var("STARTING_CREDIT", "2000")?;
        if starting_credit > MAX_AMOUNT {
            return Err(ConfigError::InvalidValue("STARTING_CREDIT"));
        }

        let job_delay = Duration::from_millis(parse_var("JOB_DELAY_MS", "1000")?);
        let shutdown_timeout = Duration::from_secs(parse_var("SHUTDOWN_TIMEOUT_SECS", "30")?);

        let log_json = env::var("LOG_FORMAT")
            .map(|v| v.eq_ignore_ascii_case("json"))
            .unwrap_or(false);

        Ok(Self {
            host,
            port,
            environment,
            worker_count,
            queue_capacity,
            starting_credit,
            job_delay,
            shutdown_timeout,
            log_json,
        })
    }

    /// Check if running in production
    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn worker_pool(&self) -> WorkerPoolConfig {
        WorkerPoolConfig {
            workers: self.worker_count,
            job_delay: self.job_delay,
        }
    }

    pub fn starting_balance(&self) -> Balance {
        Balance::new(self.starting_credit)
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for environment variable: {0}")]
    InvalidValue(&'static str),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults_match_reference_service() {
        let config = Config::default();
        assert_eq!(config.worker_count, 3);
        assert_eq!(config.queue_capacity, 5);
        assert_eq!(config.starting_credit, 2000);
        assert_eq!(config.port, 8080);
        assert!(!config.is_production());
    }

    #[test]
    fn test_worker_pool_config() {
        let config = Config {
            worker_count: 7,
            job_delay: Duration::from_millis(5),
            ..Config::default()
        };
        let pool = config.worker_pool();
        assert_eq!(pool.workers, 7);
        assert_eq!(pool.job_delay, Duration::from_millis(5));
    }

    #[test]
    fn test_parse_var_rejects_garbage() {
        env::set_var("WALLET_SETTLE_TEST_GARBAGE", "not-a-number");
        let parsed: Result<u16, _> = parse_var("WALLET_SETTLE_TEST_GARBAGE", "1");
        assert!(matches!(parsed, Err(ConfigError::InvalidValue(_))));

        let fallback: u16 = parse_var("WALLET_SETTLE_TEST_UNSET", "42").unwrap();
        assert_eq!(fallback, 42);
    }

    #[test]
    fn test_starting_balance_keeps_large_literal_credit() {
        let config = Config {
            starting_credit: MAX_AMOUNT + 1,
            ..Config::default()
        };
        assert_eq!(config.starting_balance().value(), MAX_AMOUNT + 1);
    }
}

//! Configuration for the store client, its connection pool and worker pool.
//!
//! Configuration is layered: hardcoded defaults, then an optional TOML file, then
//! environment variables. Every section and field is optional in the file.
//!
//! ```toml
//! [redis]
//! host = "127.0.0.1"
//! port = 6379
//! password = ""
//!
//! [pool]
//! max_total = 10
//! acquire_timeout_ms = 30000
//!
//! [workers]
//! threads = 4
//! ```

use std::{path::Path, time::Duration};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while loading configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Failed to read config file {path}: {reason}")]
    Read {
        path: String,
        reason: String,
    },
    /// The configuration file is not valid TOML for [`Config`].
    #[error("Failed to parse config: {0}")]
    Parse(String),
    /// A configuration value is out of range or malformed.
    #[error("Invalid configuration for {key}: '{value}' ({reason})")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
}

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub redis: RedisConfig,
    /// Connection details for the relational database, which this crate does not use
    /// itself but exposes to the application.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub postgresql: Option<PostgresConfig>,
    #[serde(default)]
    pub pool: PoolConfig,
    #[serde(default)]
    pub workers: WorkerConfig,
}

/// Connection settings for the Redis backend.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RedisConfig {
    pub host: String,
    pub port: u16,
    /// Empty or absent means the connection is unauthenticated.
    pub password: Option<String>,
    pub connect_timeout_ms: u64,
}

impl RedisConfig {
    /// Returns the password if one is set and non-empty.
    pub fn password(&self) -> Option<&str> {
        self.password
            .as_deref()
            .filter(|password| !password.is_empty())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}

impl Default for RedisConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 6379,
            password: None,
            connect_timeout_ms: 30_000,
        }
    }
}

/// Connection settings for the relational database.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PostgresConfig {
    pub host: String,
    pub port: u16,
    pub database: String,
    pub username: String,
    pub password: String,
}

/// Sizing and validation policy for the connection pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PoolConfig {
    /// Maximum number of connections handed out at once.
    pub max_total: usize,
    /// Idle connections above this count are closed when returned.
    pub max_idle: usize,
    /// Idle connections kept open, opened at startup and topped up by the idle check.
    pub min_idle: usize,
    /// How long `acquire` waits for a free connection.
    pub acquire_timeout_ms: u64,
    pub test_on_acquire: bool,
    pub test_on_release: bool,
    pub test_while_idle: bool,
    /// Period of the idle validation task. `0` disables it.
    pub idle_check_interval_ms: u64,
}

impl PoolConfig {
    pub fn acquire_timeout(&self) -> Duration {
        Duration::from_millis(self.acquire_timeout_ms)
    }

    pub fn idle_check_interval(&self) -> Option<Duration> {
        (self.idle_check_interval_ms > 0)
            .then(|| Duration::from_millis(self.idle_check_interval_ms))
    }

    /// Checks that the sizes are consistent.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_total == 0 {
            return Err(ConfigError::InvalidValue {
                key: "pool.max_total".to_string(),
                value: self.max_total.to_string(),
                reason: "must be at least 1".to_string(),
            });
        }
        if self.min_idle > self.max_idle || self.max_idle > self.max_total {
            return Err(ConfigError::InvalidValue {
                key: "pool".to_string(),
                value: format!(
                    "min_idle={}, max_idle={}, max_total={}",
                    self.min_idle, self.max_idle, self.max_total
                ),
                reason: "expected min_idle <= max_idle <= max_total".to_string(),
            });
        }

        Ok(())
    }
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_total: 10,
            max_idle: 5,
            min_idle: 2,
            acquire_timeout_ms: 30_000,
            test_on_acquire: true,
            test_on_release: true,
            test_while_idle: true,
            idle_check_interval_ms: 30_000,
        }
    }
}

/// Sizing of the worker pool that runs terminal operations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WorkerConfig {
    /// Number of operations allowed to run at the same time.
    pub threads: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self { threads: 4 }
    }
}

impl Config {
    /// Parses configuration from a TOML string.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;

        Ok(config)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::Read {
                path: path.display().to_string(),
                reason: e.to_string(),
            })?;

        Self::from_toml_str(&contents)
    }

    /// Loads configuration with layered precedence.
    ///
    /// Environment variables win over the file, which wins over defaults. A missing file
    /// is not an error.
    pub fn load_with_layers(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) if path.exists() => {
                tracing::info!("Loading configuration from {}", path.display());
                Self::from_toml_file(path)?
            }
            Some(path) => {
                tracing::warn!("Config file {} not found, using defaults", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;

        Ok(config)
    }

    /// Applies overrides looked up by variable name.
    ///
    /// Recognized variables: `KVLAYER_REDIS_HOST`, `KVLAYER_REDIS_PORT`,
    /// `KVLAYER_REDIS_PASSWORD`, `KVLAYER_POOL_MAX_TOTAL`, `KVLAYER_WORKERS`.
    ///
    /// Lowering `max_total` also lowers `max_idle` and `min_idle` to fit under it.
    pub fn apply_overrides(
        &mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<(), ConfigError> {
        if let Some(host) = lookup("KVLAYER_REDIS_HOST") {
            self.redis.host = host;
        }
        if let Some(port) = lookup("KVLAYER_REDIS_PORT") {
            self.redis.port = parse_number("KVLAYER_REDIS_PORT", &port)?;
        }
        if let Some(password) = lookup("KVLAYER_REDIS_PASSWORD") {
            self.redis.password = Some(password);
        }
        if let Some(max_total) = lookup("KVLAYER_POOL_MAX_TOTAL") {
            self.pool.max_total = parse_number("KVLAYER_POOL_MAX_TOTAL", &max_total)?;
            self.pool.max_idle = self.pool.max_idle.min(self.pool.max_total);
            self.pool.min_idle = self.pool.min_idle.min(self.pool.max_idle);
        }
        if let Some(threads) = lookup("KVLAYER_WORKERS") {
            self.workers.threads = parse_number("KVLAYER_WORKERS", &threads)?;
        }

        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pool.validate()?;

        if self.workers.threads == 0 {
            return Err(ConfigError::InvalidValue {
                key: "workers.threads".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        Ok(())
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T::Err: std::fmt::Display,
{
    raw.trim()
        .parse()
        .map_err(|e: T::Err| ConfigError::InvalidValue {
            key: key.to_string(),
            value: raw.to_string(),
            reason: e.to_string(),
        })
}

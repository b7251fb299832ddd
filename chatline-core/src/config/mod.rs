//! Configuration management for Chatline
//!
//! Configuration comes from an optional TOML file, then environment
//! overrides, then validation. Every section has defaults so a partial file
//! (or no file at all) is enough to start a server.

use crate::conversation::StoreLimits;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::env;
use std::net::SocketAddr;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

mod error;

pub use error::ConfigError;

/// Prefix of every environment override
pub const ENV_PREFIX: &str = "CHATLINE_";

/// Main application configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// HTTP server and live stream settings
    pub server: ServerConfig,

    /// Notification fanout settings
    pub fanout: FanoutConfig,

    /// Input limits
    pub limits: LimitsConfig,

    /// Identity directory contents and password hashing cost
    pub directory: DirectoryConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Graceful shutdown timeout
    #[serde(with = "humantime_serde")]
    pub shutdown_timeout: Duration,

    /// Keep-alive comment interval on live streams
    #[serde(with = "humantime_serde")]
    pub keep_alive_interval: Duration,

    /// Frames buffered between a live stream and its connection
    pub stream_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FanoutConfig {
    /// Alerts queued per subscription before it is evicted
    pub subscriber_buffer: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum conversation title length in characters
    pub max_title_len: usize,

    /// Maximum message body length in characters
    pub max_message_len: usize,
}

/// Identity directory configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DirectoryConfig {
    /// Argon2 memory cost in KiB
    pub hash_memory_kib: u32,

    /// Argon2 iterations
    pub hash_iterations: u32,

    /// Argon2 lanes
    pub hash_parallelism: u32,

    /// Users known to the process
    pub users: Vec<UserEntry>,
}

/// One directory entry. Exactly one of `password` and `password_hash` is set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserEntry {
    pub id: String,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,

    /// Plaintext password, hashed when the directory is built
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,

    /// Argon2 PHC string
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub password_hash: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Enable JSON formatting
    pub json_format: bool,

    /// Include timestamps
    pub with_timestamp: bool,

    /// Include target module
    pub with_target: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([127, 0, 0, 1], 3031)),
            shutdown_timeout: Duration::from_secs(5),
            keep_alive_interval: Duration::from_secs(15),
            stream_buffer: 32,
        }
    }
}

impl Default for FanoutConfig {
    fn default() -> Self {
        Self {
            subscriber_buffer: 64,
        }
    }
}

impl Default for LimitsConfig {
    fn default() -> Self {
        let limits = StoreLimits::default();
        Self {
            max_title_len: limits.max_title_len,
            max_message_len: limits.max_message_len,
        }
    }
}

impl From<&LimitsConfig> for StoreLimits {
    fn from(config: &LimitsConfig) -> Self {
        StoreLimits {
            max_title_len: config.max_title_len,
            max_message_len: config.max_message_len,
        }
    }
}

impl Default for DirectoryConfig {
    fn default() -> Self {
        // argon2 crate defaults (19 MiB, 2 passes, 1 lane)
        Self {
            hash_memory_kib: 19 * 1024,
            hash_iterations: 2,
            hash_parallelism: 1,
            users: Vec::new(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
            with_timestamp: true,
            with_target: true,
        }
    }
}

fn parse_value<T>(key: &str, raw: &str) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
        key: key.to_string(),
        message: e.to_string(),
    })
}

fn parse_duration(key: &str, raw: &str) -> Result<Duration, ConfigError> {
    humantime_serde::re::humantime::parse_duration(raw.trim()).map_err(|e| {
        ConfigError::InvalidValue {
            key: key.to_string(),
            message: e.to_string(),
        }
    })
}

impl Config {
    /// Defaults with environment overrides applied
    ///
    /// Environment variables follow the pattern: CHATLINE_<SECTION>_<KEY>
    /// Example: CHATLINE_SERVER_BIND_ADDRESS=0.0.0.0:3031
    pub fn from_env() -> Result<Self, ConfigError> {
        let mut config = Self::default();
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read_file(path.as_ref())?;
        config.validate()?;
        Ok(config)
    }

    /// File (if any), then environment overrides, then validation
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::read_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    fn read_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(toml::from_str(&contents)?)
    }

    /// Apply overrides from the process environment
    pub fn apply_env(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| env::var(key).ok())
    }

    /// Apply overrides from an arbitrary lookup (keys carry the prefix)
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |suffix: &str| {
            let key = format!("{ENV_PREFIX}{suffix}");
            lookup(&key).map(|value| (key, value))
        };

        // Server config
        if let Some((key, value)) = get("SERVER_BIND_ADDRESS") {
            self.server.bind_address = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("SERVER_SHUTDOWN_TIMEOUT") {
            self.server.shutdown_timeout = parse_duration(&key, &value)?;
        }
        if let Some((key, value)) = get("SERVER_KEEP_ALIVE_INTERVAL") {
            self.server.keep_alive_interval = parse_duration(&key, &value)?;
        }
        if let Some((key, value)) = get("SERVER_STREAM_BUFFER") {
            self.server.stream_buffer = parse_value(&key, &value)?;
        }

        // Fanout config
        if let Some((key, value)) = get("FANOUT_SUBSCRIBER_BUFFER") {
            self.fanout.subscriber_buffer = parse_value(&key, &value)?;
        }

        // Limits
        if let Some((key, value)) = get("LIMITS_MAX_TITLE_LEN") {
            self.limits.max_title_len = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("LIMITS_MAX_MESSAGE_LEN") {
            self.limits.max_message_len = parse_value(&key, &value)?;
        }

        // Directory hashing cost
        if let Some((key, value)) = get("DIRECTORY_HASH_MEMORY_KIB") {
            self.directory.hash_memory_kib = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("DIRECTORY_HASH_ITERATIONS") {
            self.directory.hash_iterations = parse_value(&key, &value)?;
        }
        if let Some((key, value)) = get("DIRECTORY_HASH_PARALLELISM") {
            self.directory.hash_parallelism = parse_value(&key, &value)?;
        }

        // Logging config
        if let Some((_, value)) = get("LOG_LEVEL") {
            self.logging.level = value.trim().to_lowercase();
        }
        if let Some((key, value)) = get("LOG_JSON") {
            self.logging.json_format = parse_value(&key, &value)?;
        }

        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.stream_buffer == 0 {
            return Err(ConfigError::Validation(
                "server.stream_buffer must be greater than 0".to_string(),
            ));
        }

        if self.server.keep_alive_interval.is_zero() {
            return Err(ConfigError::Validation(
                "server.keep_alive_interval must be greater than 0".to_string(),
            ));
        }

        if self.fanout.subscriber_buffer == 0 {
            return Err(ConfigError::Validation(
                "fanout.subscriber_buffer must be greater than 0".to_string(),
            ));
        }

        if self.limits.max_title_len == 0 || self.limits.max_message_len == 0 {
            return Err(ConfigError::Validation(
                "limits must be greater than 0".to_string(),
            ));
        }

        self.directory.validate()?;

        // Validate logging config
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.as_str()) {
            return Err(ConfigError::Validation(format!(
                "Invalid log level: {}",
                self.logging.level
            )));
        }

        Ok(())
    }

    /// Save configuration to file
    pub fn save_to_file(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        let contents = toml::to_string_pretty(self)?;

        std::fs::write(path, contents).map_err(|source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        })
    }
}

impl DirectoryConfig {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.hash_iterations == 0 || self.hash_parallelism == 0 {
            return Err(ConfigError::Validation(
                "directory hash iterations and parallelism must be greater than 0".to_string(),
            ));
        }
        if self.hash_memory_kib < 8 * self.hash_parallelism {
            return Err(ConfigError::Validation(
                "directory.hash_memory_kib must be at least 8 KiB per lane".to_string(),
            ));
        }

        let mut ids = HashSet::new();
        let mut usernames = HashSet::new();
        for user in &self.users {
            if user.id.trim().is_empty() || user.username.trim().is_empty() {
                return Err(ConfigError::Validation(
                    "directory users need an id and a username".to_string(),
                ));
            }
            if !ids.insert(user.id.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate user id: {}",
                    user.id
                )));
            }
            if !usernames.insert(user.username.as_str()) {
                return Err(ConfigError::Validation(format!(
                    "duplicate username: {}",
                    user.username
                )));
            }
            if user.password.is_some() == user.password_hash.is_some() {
                return Err(ConfigError::Validation(format!(
                    "user {} needs exactly one of password and password_hash",
                    user.username
                )));
            }
        }

        Ok(())
    }
}

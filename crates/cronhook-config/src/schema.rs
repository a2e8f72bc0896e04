//! Configuration schema definitions.

use std::path::PathBuf;
use std::time::Duration;

use cronhook_protocols::ScheduleZone;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub scheduler: SchedulerConfig,

    #[serde(default)]
    pub trigger: TriggerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP API server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Schedule evaluation configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Zone cron expressions are evaluated in ("Asia/Kolkata", "+05:30", "UTC").
    #[serde(default = "default_timezone")]
    pub timezone: String,

    /// Load active jobs whose start date is still in the future at startup.
    #[serde(default)]
    pub preload_future_jobs: bool,
}

impl SchedulerConfig {
    pub fn zone(&self) -> Result<ScheduleZone, ConfigError> {
        ScheduleZone::parse(&self.timezone).ok_or_else(|| ConfigError::InvalidValue {
            field: "scheduler.timezone".to_string(),
            message: format!(
                "'{}' is not an IANA zone like Asia/Kolkata or an offset like +05:30",
                self.timezone
            ),
        })
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            timezone: default_timezone(),
            preload_future_jobs: false,
        }
    }
}

fn default_timezone() -> String {
    "Asia/Kolkata".to_string()
}

/// Outbound trigger configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TriggerConfig {
    #[serde(default = "default_trigger_timeout")]
    pub timeout_seconds: u64,

    /// HTTP method used for the trigger call (GET or POST).
    #[serde(default = "default_trigger_method")]
    pub method: String,

    /// Header carrying the job's API key.
    #[serde(default = "default_api_key_header")]
    pub api_key_header: String,

    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl TriggerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for TriggerConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_trigger_timeout(),
            method: default_trigger_method(),
            api_key_header: default_api_key_header(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_trigger_timeout() -> u64 {
    30
}

fn default_trigger_method() -> String {
    "POST".to_string()
}

fn default_api_key_header() -> String {
    "x-api-key".to_string()
}

fn default_user_agent() -> String {
    format!("cronhook/{}", env!("CARGO_PKG_VERSION"))
}

/// Job store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// "sqlite" or "memory".
    #[serde(default = "default_store_backend")]
    pub backend: String,

    /// SQLite database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: default_store_backend(),
            path: default_store_path(),
        }
    }
}

fn default_store_backend() -> String {
    "sqlite".to_string()
}

fn default_store_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".cronhook")
        .join("cronhook.db")
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter when RUST_LOG is unset.
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily-rotated log files. Console only when unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

#[cfg(test)]
#[path = "schema_tests.rs"]
mod tests;

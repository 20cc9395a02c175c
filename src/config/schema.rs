//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from TOML. Every field
//! has a default, so an empty file is a valid configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::lifecycle::TermSignal;

/// Root configuration for the shutdown daemon.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct DaemonConfig {
    /// Optional PID file, written at startup and removed on shutdown.
    pub pid_file: Option<PathBuf>,

    /// Shutdown coordination settings.
    pub shutdown: ShutdownConfig,

    /// HTTP admin trigger.
    pub admin: AdminConfig,

    /// Logging and metrics.
    pub observability: ObservabilityConfig,
}

/// Shutdown coordination settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ShutdownConfig {
    /// Signals that start a shutdown.
    pub signals: Vec<TermSignal>,

    /// Deadline for the callback barrier, in seconds. `None` waits forever.
    pub callback_timeout_secs: Option<u64>,

    /// Force exit on a second signal while shutting down.
    pub force_exit_on_repeat: bool,

    /// Optional sentinel-file trigger.
    pub file_trigger: Option<FileTriggerConfig>,
}

impl ShutdownConfig {
    pub fn callback_timeout(&self) -> Option<Duration> {
        self.callback_timeout_secs.map(Duration::from_secs)
    }
}

impl Default for ShutdownConfig {
    fn default() -> Self {
        Self {
            signals: TermSignal::DEFAULT.to_vec(),
            callback_timeout_secs: Some(30),
            force_exit_on_repeat: false,
            file_trigger: None,
        }
    }
}

/// Sentinel-file trigger settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FileTriggerConfig {
    /// File whose creation starts a shutdown.
    pub path: PathBuf,

    /// Poll interval for watcher backends without native events.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    500
}

/// Admin endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable the admin trigger.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,

    /// Admin endpoint bind address.
    pub bind_address: String,
}

/// Placeholder key rejected by validation when the admin trigger is enabled.
pub const PLACEHOLDER_API_KEY: &str = "CHANGE_ME_IN_PRODUCTION";

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            api_key: PLACEHOLDER_API_KEY.to_string(),
            bind_address: "127.0.0.1:8081".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for development, JSON for production.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,

    /// Recorded on the root span of every log line.
    pub service_name: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
            service_name: "shutdownd".to_string(),
        }
    }
}

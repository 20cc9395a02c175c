//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, addresses parse)
//! - Reject unsafe admin settings
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: DaemonConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::collections::HashSet;
use std::net::SocketAddr;

use thiserror::Error;

use crate::config::schema::{DaemonConfig, PLACEHOLDER_API_KEY};

const LOG_LEVELS: [&str; 5] = ["trace", "debug", "info", "warn", "error"];

/// A single semantic problem in the configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("shutdown.signals must not be empty")]
    NoSignals,

    #[error("shutdown.signals lists {0} more than once")]
    DuplicateSignal(String),

    #[error("shutdown.callback_timeout_secs must be greater than zero")]
    ZeroTimeout,

    #[error("shutdown.file_trigger.path has no file name: {0}")]
    InvalidSentinelPath(String),

    #[error("admin.api_key must be set to a non-placeholder value when admin is enabled")]
    InsecureApiKey,

    #[error("{field} is not a valid socket address: {value}")]
    InvalidAddress { field: &'static str, value: String },

    #[error("observability.log_level must be one of trace, debug, info, warn, error (got {0})")]
    InvalidLogLevel(String),
}

/// Check every semantic rule and collect all violations.
pub fn validate_config(config: &DaemonConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    let shutdown = &config.shutdown;
    if shutdown.signals.is_empty() {
        errors.push(ValidationError::NoSignals);
    }
    let mut seen = HashSet::new();
    for sig in &shutdown.signals {
        if !seen.insert(*sig) {
            errors.push(ValidationError::DuplicateSignal(sig.to_string()));
        }
    }
    if shutdown.callback_timeout_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout);
    }
    if let Some(file) = &shutdown.file_trigger {
        if file.path.file_name().is_none() {
            errors.push(ValidationError::InvalidSentinelPath(file.path.display().to_string()));
        }
    }

    if config.admin.enabled {
        let key = config.admin.api_key.trim();
        if key.is_empty() || key == PLACEHOLDER_API_KEY {
            errors.push(ValidationError::InsecureApiKey);
        }
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::InvalidAddress {
                field: "admin.bind_address",
                value: config.admin.bind_address.clone(),
            });
        }
    }

    let observability = &config.observability;
    if observability.metrics_enabled && observability.metrics_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::InvalidAddress {
            field: "observability.metrics_address",
            value: observability.metrics_address.clone(),
        });
    }
    if !LOG_LEVELS.contains(&observability.log_level.to_ascii_lowercase().as_str()) {
        errors.push(ValidationError::InvalidLogLevel(observability.log_level.clone()));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

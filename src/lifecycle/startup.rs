//! Startup orchestration.
//!
//! # Responsibilities
//! - Build the coordinator from validated configuration
//! - Register triggers in a fixed order: signals, sentinel file, admin
//! - Register built-in participants (PID file) and the logging sink
//!
//! # Design Decisions
//! - Fail fast: any registration or arming error is fatal
//! - Arming happens last, once every participant is registered

use std::time::Duration;

use thiserror::Error;

use crate::admin::AdminTrigger;
use crate::config::DaemonConfig;
use crate::lifecycle::{
    Coordinator, FileTrigger, PidFile, ShutdownError, SignalTrigger, TracingSink,
};

/// Error type for daemon startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("shutdown setup failed: {0}")]
    Shutdown(#[from] ShutdownError),

    #[error("failed to write PID file {path}: {source}")]
    PidFile {
        path: String,
        source: std::io::Error,
    },
}

/// Build a coordinator with every trigger the configuration enables.
///
/// The coordinator is not started; callers add their own callbacks first.
pub fn build_coordinator(config: &DaemonConfig) -> Result<Coordinator, StartupError> {
    let shutdown = &config.shutdown;
    let coordinator = Coordinator::with_callback_timeout(shutdown.callback_timeout());

    coordinator.add_trigger(
        SignalTrigger::new(shutdown.signals.iter().copied())
            .force_exit_on_repeat(shutdown.force_exit_on_repeat),
    )?;

    if let Some(file) = &shutdown.file_trigger {
        coordinator.add_trigger(
            FileTrigger::new(&file.path)
                .with_poll_interval(Duration::from_millis(file.poll_interval_ms)),
        )?;
    }

    if config.admin.enabled {
        coordinator.add_trigger(AdminTrigger::from_config(&config.admin))?;
    }

    if let Some(path) = &config.pid_file {
        let pid_file = PidFile::create(path).map_err(|source| StartupError::PidFile {
            path: path.display().to_string(),
            source,
        })?;
        coordinator.add_callback(pid_file)?;
    }

    coordinator.set_error_sink(TracingSink)?;

    tracing::info!(
        triggers = ?coordinator.trigger_names(),
        callback_timeout = ?coordinator.callback_timeout(),
        "Coordinator configured"
    );
    Ok(coordinator)
}

//! Trigger source abstraction.
//!
//! # Responsibilities
//! - Detect that the process should terminate
//! - Hand the firing over to the coordinator exactly once
//! - Run the begin/end hooks around the callback fan-out
//!
//! # Design Decisions
//! - `start` only arms detection; the firing happens on a spawned task
//! - Hooks default to no-ops so simple sources only implement detection

use std::sync::Arc;

use async_trait::async_trait;

use crate::lifecycle::coordinator::Coordinator;
use crate::lifecycle::error::BoxError;

/// A pluggable detector of "the process should terminate now".
#[async_trait]
pub trait Trigger: Send + Sync + 'static {
    /// Name passed to every callback; unique within a coordinator.
    fn name(&self) -> &str;

    /// Arm detection and return immediately.
    ///
    /// Implementations spawn their detection loop and call
    /// [`Coordinator::start_shutdown`] from it. They must not call the
    /// coordinator from inside `start`.
    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError>;

    /// Runs before the callbacks.
    async fn on_shutdown_begin(&self) -> Result<(), BoxError> {
        Ok(())
    }

    /// Runs after every callback finished. May end the process.
    async fn on_shutdown_end(&self) -> Result<(), BoxError> {
        Ok(())
    }
}

/// Reject arming outside a Tokio runtime instead of panicking in `tokio::spawn`.
pub(crate) fn require_runtime(trigger: &str) -> Result<tokio::runtime::Handle, BoxError> {
    tokio::runtime::Handle::try_current()
        .map_err(|e| format!("trigger `{}` needs a Tokio runtime to arm: {}", trigger, e).into())
}

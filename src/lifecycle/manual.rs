//! In-process trigger.
//!
//! Lets embedding code start a shutdown directly, e.g. after a fatal
//! subsystem error or to drain on a health-check verdict. Its end hook
//! returns normally, so the process keeps running afterwards.

use std::sync::{Arc, OnceLock};

use crate::lifecycle::coordinator::Coordinator;
use crate::lifecycle::error::{BoxError, ShutdownError};
use crate::lifecycle::trigger::Trigger;

struct ManualInner {
    name: String,
    coordinator: OnceLock<Coordinator>,
}

/// Clonable handle that fires a shutdown on demand.
///
/// Register one clone with the coordinator and keep another to call
/// [`ManualTrigger::fire`].
#[derive(Clone)]
pub struct ManualTrigger {
    inner: Arc<ManualInner>,
}

impl ManualTrigger {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            inner: Arc::new(ManualInner {
                name: name.into(),
                coordinator: OnceLock::new(),
            }),
        }
    }

    /// Run the shutdown sequence and wait for it to finish.
    ///
    /// Returns `Ok(false)` when another trigger had already started it.
    /// Dropping the future early leaves the sequence running to completion.
    pub async fn fire(&self) -> Result<bool, ShutdownError> {
        let coordinator = self
            .inner
            .coordinator
            .get()
            .ok_or_else(|| ShutdownError::NotArmed {
                trigger: self.inner.name.clone(),
            })?
            .clone();

        tracing::info!(trigger = %self.inner.name, "Manual shutdown requested");
        Ok(coordinator.start_shutdown(Arc::new(self.clone())).await)
    }

    /// Whether the coordinator has armed this trigger.
    pub fn is_armed(&self) -> bool {
        self.inner.coordinator.get().is_some()
    }
}

impl Trigger for ManualTrigger {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError> {
        self.inner
            .coordinator
            .set(coordinator)
            .map_err(|_| format!("trigger `{}` is already armed", self.inner.name).into())
    }
}

impl std::fmt::Debug for ManualTrigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ManualTrigger")
            .field("name", &self.inner.name)
            .field("armed", &self.is_armed())
            .finish()
    }
}

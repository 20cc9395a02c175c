//! Sentinel-file trigger.
//!
//! Fires when a configured file is created or modified (`touch` it to stop
//! the process). The end hook removes the sentinel so the next run starts
//! clean, then returns normally.

use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use notify::{Config, Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use crate::lifecycle::coordinator::Coordinator;
use crate::lifecycle::error::BoxError;
use crate::lifecycle::trigger::{require_runtime, Trigger};

/// Name used by [`FileTrigger::new`].
pub const FILE_TRIGGER_NAME: &str = "sentinel-file";

/// Trigger that watches for a sentinel file.
#[derive(Debug, Clone)]
pub struct FileTrigger {
    name: String,
    path: PathBuf,
    poll_interval: Duration,
}

impl FileTrigger {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            name: FILE_TRIGGER_NAME.to_string(),
            path: path.into(),
            poll_interval: Duration::from_millis(500),
        }
    }

    /// Override the trigger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Poll interval for backends without native change notifications.
    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Watched sentinel path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// The sentinel's directory and its canonical full path.
    ///
    /// The directory is watched rather than the file, which usually does not exist yet.
    fn resolve(&self) -> Result<(PathBuf, PathBuf), BoxError> {
        let file_name = self
            .path
            .file_name()
            .ok_or_else(|| format!("sentinel path {} has no file name", self.path.display()))?;
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        let dir = dir
            .canonicalize()
            .map_err(|e| format!("cannot watch {}: {}", dir.display(), e))?;
        let target = dir.join(file_name);
        Ok((dir, target))
    }
}

#[async_trait]
impl Trigger for FileTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError> {
        let runtime = require_runtime(&self.name)?;
        let (dir, target) = self.resolve()?;

        if target.exists() {
            tracing::warn!(
                path = %target.display(),
                "Sentinel file already present; only new changes will trigger shutdown"
            );
        }

        let (tx, mut rx) = mpsc::unbounded_channel();
        let watched = target.clone();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| match res {
                Ok(event) => {
                    let relevant = (event.kind.is_create() || event.kind.is_modify())
                        && event.paths.iter().any(|p| p == &watched);
                    if relevant {
                        let _ = tx.send(());
                    }
                }
                Err(e) => tracing::error!("Watch error: {:?}", e),
            },
            Config::default().with_poll_interval(self.poll_interval),
        )?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        tracing::info!(trigger = %self.name, path = %target.display(), "Sentinel watcher started");

        runtime.spawn(async move {
            // Keep the watcher alive until the first relevant event.
            let fired = rx.recv().await.is_some();
            drop(watcher);
            if fired {
                tracing::info!(trigger = %self.name, path = %self.path.display(), "Sentinel file detected");
                coordinator.start_shutdown(self).await;
            }
        });
        Ok(())
    }

    async fn on_shutdown_end(&self) -> Result<(), BoxError> {
        match std::fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("failed to remove sentinel {}: {}", self.path.display(), e).into()),
        }
    }
}

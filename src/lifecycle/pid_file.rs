//! PID file participant.

use std::io;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::lifecycle::callback::Callback;
use crate::lifecycle::error::BoxError;

/// Writes the current PID at startup and removes the file on shutdown.
#[derive(Debug, Clone)]
pub struct PidFile {
    path: PathBuf,
}

impl PidFile {
    /// Write `std::process::id()` to `path`, replacing any stale file.
    pub fn create(path: impl Into<PathBuf>) -> io::Result<Self> {
        let path = path.into();
        std::fs::write(&path, format!("{}\n", std::process::id()))?;
        tracing::debug!(path = %path.display(), "PID file written");
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl Callback for PidFile {
    fn name(&self) -> Option<&str> {
        Some("pid-file")
    }

    async fn on_shutdown(&self, _trigger: &str) -> Result<(), BoxError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::debug!(path = %self.path.display(), "PID file removed");
                Ok(())
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(format!("failed to remove {}: {}", self.path.display(), e).into()),
        }
    }
}

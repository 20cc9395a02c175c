//! Shutdown callbacks.

use std::fmt;
use std::future::Future;

use async_trait::async_trait;

use crate::lifecycle::error::BoxError;

/// A unit of cleanup work run once per shutdown sequence.
///
/// Callbacks run concurrently with each other and receive the name of the
/// trigger that started the shutdown.
#[async_trait]
pub trait Callback: Send + Sync + 'static {
    /// Label used in logs and error reports. Unnamed callbacks are labelled by position.
    fn name(&self) -> Option<&str> {
        None
    }

    /// Release resources. Errors are reported, never retried.
    async fn on_shutdown(&self, trigger: &str) -> Result<(), BoxError>;
}

/// Callback backed by an async closure. Built with [`callback_fn`].
pub struct FnCallback<F> {
    name: Option<String>,
    f: F,
}

/// Turn an async closure into a [`Callback`].
///
/// ```no_run
/// use graceful_shutdown::lifecycle::callback_fn;
///
/// let flush = callback_fn(|trigger: String| async move {
///     tracing::info!(%trigger, "flushing buffers");
///     Ok(())
/// })
/// .named("flush-buffers");
/// ```
pub fn callback_fn<F, Fut>(f: F) -> FnCallback<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    FnCallback { name: None, f }
}

impl<F> FnCallback<F> {
    /// Attach a label.
    pub fn named(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }
}

impl<F> fmt::Debug for FnCallback<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FnCallback").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F, Fut> Callback for FnCallback<F>
where
    F: Fn(String) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), BoxError>> + Send + 'static,
{
    fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    async fn on_shutdown(&self, trigger: &str) -> Result<(), BoxError> {
        (self.f)(trigger.to_string()).await
    }
}

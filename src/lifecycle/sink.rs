//! Error sinks.
//!
//! A sink is the only place shutdown errors surface once the sequence has
//! begun. Without one, failures are silent.

use crate::lifecycle::error::ShutdownError;

/// Best-effort destination for shutdown errors.
///
/// The coordinator serializes calls, so implementations need not be
/// re-entrant. A sink must not fail; a panic is contained and logged.
pub trait ErrorSink: Send + Sync + 'static {
    fn on_error(&self, error: &ShutdownError);
}

impl<F> ErrorSink for F
where
    F: Fn(&ShutdownError) + Send + Sync + 'static,
{
    fn on_error(&self, error: &ShutdownError) {
        self(error)
    }
}

/// Sink that logs every error through `tracing`.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ErrorSink for TracingSink {
    fn on_error(&self, error: &ShutdownError) {
        tracing::error!(kind = error.kind(), error = %error, "Shutdown error");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn test_closure_sink() {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = seen.clone();
            move |err: &ShutdownError| seen.lock().unwrap().push(err.kind())
        };

        sink.on_error(&ShutdownError::AlreadyStarted);
        TracingSink.on_error(&ShutdownError::AlreadyStarted);

        assert_eq!(*seen.lock().unwrap(), vec!["already_started"]);
    }
}

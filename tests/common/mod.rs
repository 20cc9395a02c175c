//! Shared utilities for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use graceful_shutdown::lifecycle::{
    callback_fn, BoxError, Callback, Coordinator, ErrorSink, ShutdownError, Trigger,
};

/// What the sink saw for one reported error.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Recorded {
    pub kind: &'static str,
    pub message: String,
    pub cause: Option<String>,
}

/// Error sink that keeps everything it receives.
#[derive(Clone, Default)]
pub struct RecordingSink {
    errors: Arc<Mutex<Vec<Recorded>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn errors(&self) -> Vec<Recorded> {
        self.errors.lock().unwrap().clone()
    }

    pub fn kinds(&self) -> Vec<&'static str> {
        self.errors().into_iter().map(|e| e.kind).collect()
    }
}

impl ErrorSink for RecordingSink {
    fn on_error(&self, error: &ShutdownError) {
        use std::error::Error as _;
        self.errors.lock().unwrap().push(Recorded {
            kind: error.kind(),
            message: error.to_string(),
            cause: error.source().map(|s| s.to_string()),
        });
    }
}

/// Callback that counts invocations, optionally sleeping and/or failing.
pub fn counting_callback(
    calls: Arc<AtomicUsize>,
    delay: Duration,
    failure: Option<&'static str>,
) -> impl Callback {
    callback_fn(move |_trigger: String| {
        let calls = calls.clone();
        async move {
            tokio::time::sleep(delay).await;
            calls.fetch_add(1, Ordering::SeqCst);
            match failure {
                Some(msg) => Err(msg.into()),
                None => Ok(()),
            }
        }
    })
}

/// Callback that never finishes.
pub fn hanging_callback() -> impl Callback {
    callback_fn(|_trigger: String| async {
        std::future::pending::<()>().await;
        Ok(())
    })
    .named("hangs-forever")
}

struct ScriptedInner {
    name: String,
    arm_error: Option<&'static str>,
    begin_error: Option<&'static str>,
    end_error: Option<&'static str>,
    panic_in: Option<&'static str>,
    coordinator: OnceLock<Coordinator>,
    begin_calls: AtomicUsize,
    end_calls: AtomicUsize,
}

/// Trigger whose arming and hooks are scripted by the test.
#[derive(Clone)]
pub struct ScriptedTrigger {
    inner: Arc<ScriptedInner>,
}

impl ScriptedTrigger {
    pub fn new(name: &str) -> Self {
        Self::scripted(name, None, None, None)
    }

    pub fn scripted(
        name: &str,
        arm_error: Option<&'static str>,
        begin_error: Option<&'static str>,
        end_error: Option<&'static str>,
    ) -> Self {
        Self {
            inner: Arc::new(ScriptedInner {
                name: name.to_string(),
                arm_error,
                begin_error,
                end_error,
                panic_in: None,
                coordinator: OnceLock::new(),
                begin_calls: AtomicUsize::new(0),
                end_calls: AtomicUsize::new(0),
            }),
        }
    }

    /// Trigger whose `hook` ("begin" or "end") panics.
    pub fn panicking(name: &str, hook: &'static str) -> Self {
        let trigger = Self::new(name);
        let mut inner = Arc::try_unwrap(trigger.inner).ok().unwrap();
        inner.panic_in = Some(hook);
        Self {
            inner: Arc::new(inner),
        }
    }

    pub fn is_armed(&self) -> bool {
        self.inner.coordinator.get().is_some()
    }

    /// Fire the way a detection loop would.
    pub async fn fire(&self) -> bool {
        let coordinator = self
            .inner
            .coordinator
            .get()
            .expect("trigger fired before start")
            .clone();
        coordinator.start_shutdown(Arc::new(self.clone())).await
    }

    pub fn begin_calls(&self) -> usize {
        self.inner.begin_calls.load(Ordering::SeqCst)
    }

    pub fn end_calls(&self) -> usize {
        self.inner.end_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Trigger for ScriptedTrigger {
    fn name(&self) -> &str {
        &self.inner.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError> {
        if let Some(msg) = self.inner.arm_error {
            return Err(msg.into());
        }
        let _ = self.inner.coordinator.set(coordinator);
        Ok(())
    }

    async fn on_shutdown_begin(&self) -> Result<(), BoxError> {
        self.inner.begin_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.panic_in == Some("begin") {
            panic!("begin hook of `{}` exploded", self.inner.name);
        }
        match self.inner.begin_error {
            Some(msg) => Err(msg.into()),
            None => Ok(()),
        }
    }

    async fn on_shutdown_end(&self) -> Result<(), BoxError> {
        self.inner.end_calls.fetch_add(1, Ordering::SeqCst);
        if self.inner.panic_in == Some("end") {
            panic!("end hook of `{}` exploded", self.inner.name);
        }
        match self.inner.end_error {
            Some(msg) => Err(msg.into()),
            None => Ok(()),
        }
    }
}

//! Shutdown coordination.
//!
//! # State Machine
//! ```text
//! Idle ──start_shutdown──▶ ShuttingDown ──end hook returns──▶ Terminated
//! ```
//!
//! # Sequence
//! ```text
//! trigger fires
//!     → claim Idle → ShuttingDown (later firings wait, no second fan-out)
//!     → begin hook
//!     → spawn one task per callback, join all (optional deadline)
//!     → report callback errors
//!     → end hook (signal trigger exits the process here)
//! ```

use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::lifecycle::callback::Callback;
use crate::lifecycle::error::{BoxError, ShutdownError};
use crate::lifecycle::sink::ErrorSink;
use crate::lifecycle::trigger::Trigger;
use crate::observability::metrics;

/// Coordinator lifecycle state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ShutdownState {
    Idle,
    ShuttingDown,
    Terminated,
}

impl fmt::Display for ShutdownState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            ShutdownState::Idle => "idle",
            ShutdownState::ShuttingDown => "shutting down",
            ShutdownState::Terminated => "terminated",
        };
        f.write_str(s)
    }
}

struct Participant {
    label: String,
    callback: Arc<dyn Callback>,
}

#[derive(Default)]
struct Registry {
    triggers: Vec<Arc<dyn Trigger>>,
    participants: Vec<Participant>,
    sink: Option<Arc<dyn ErrorSink>>,
}

struct Inner {
    registry: Mutex<Registry>,
    /// Set once `start` ran; closes registration.
    armed: AtomicBool,
    state: watch::Sender<ShutdownState>,
    callback_timeout: Option<Duration>,
    /// Serializes calls into the sink.
    report_lock: Mutex<()>,
}

enum Claim {
    Claimed,
    Busy,
    Unknown,
}

#[derive(Clone, Copy)]
enum Hook {
    Begin,
    End,
}

impl Hook {
    fn as_str(self) -> &'static str {
        match self {
            Hook::Begin => "begin",
            Hook::End => "end",
        }
    }

    fn failed(self, trigger: String, source: BoxError) -> ShutdownError {
        match self {
            Hook::Begin => ShutdownError::BeginHook { trigger, source },
            Hook::End => ShutdownError::EndHook { trigger, source },
        }
    }
}

/// Moves the state to `Terminated` when the sequence task ends, however it ends.
struct TerminateOnDrop<'a>(&'a watch::Sender<ShutdownState>);

impl Drop for TerminateOnDrop<'_> {
    fn drop(&mut self) {
        self.0.send_if_modified(|state| {
            if *state == ShutdownState::Terminated {
                false
            } else {
                *state = ShutdownState::Terminated;
                true
            }
        });
    }
}

/// Orchestrates graceful shutdown across triggers and callbacks.
///
/// Cheap to clone; every clone drives the same state machine. Register
/// triggers, callbacks and the sink first, then call [`Coordinator::start`].
#[derive(Clone)]
pub struct Coordinator {
    inner: Arc<Inner>,
}

impl Coordinator {
    /// Create a coordinator that waits for callbacks without a deadline.
    pub fn new() -> Self {
        Self::with_callback_timeout(None)
    }

    /// Create a coordinator whose callback barrier releases after `timeout`.
    ///
    /// Callbacks still running at the deadline are aborted and reported as
    /// [`ShutdownError::CallbackTimeout`].
    pub fn with_callback_timeout(timeout: Option<Duration>) -> Self {
        let (state, _) = watch::channel(ShutdownState::Idle);
        Self {
            inner: Arc::new(Inner {
                registry: Mutex::new(Registry::default()),
                armed: AtomicBool::new(false),
                state,
                callback_timeout: timeout,
                report_lock: Mutex::new(()),
            }),
        }
    }

    fn registry(&self) -> MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Must be called with the registry lock held.
    fn ensure_open(&self) -> Result<(), ShutdownError> {
        let state = self.state();
        if self.inner.armed.load(Ordering::Acquire) || state != ShutdownState::Idle {
            return Err(ShutdownError::RegistrationClosed { state });
        }
        Ok(())
    }

    /// Register a trigger source.
    pub fn add_trigger<T: Trigger>(&self, trigger: T) -> Result<(), ShutdownError> {
        let mut registry = self.registry();
        self.ensure_open()?;

        if registry.triggers.iter().any(|t| t.name() == trigger.name()) {
            return Err(ShutdownError::DuplicateTrigger {
                name: trigger.name().to_string(),
            });
        }

        tracing::debug!(trigger = trigger.name(), "Trigger registered");
        registry.triggers.push(Arc::new(trigger));
        Ok(())
    }

    /// Register a callback participant.
    pub fn add_callback<C: Callback>(&self, callback: C) -> Result<(), ShutdownError> {
        let mut registry = self.registry();
        self.ensure_open()?;

        let label = match callback.name() {
            Some(name) => name.to_string(),
            None => format!("callback-{}", registry.participants.len() + 1),
        };

        tracing::debug!(callback = %label, "Callback registered");
        registry.participants.push(Participant {
            label,
            callback: Arc::new(callback),
        });
        Ok(())
    }

    /// Set the error sink, replacing any previous one.
    pub fn set_error_sink<S: ErrorSink>(&self, sink: S) -> Result<(), ShutdownError> {
        let mut registry = self.registry();
        self.ensure_open()?;
        registry.sink = Some(Arc::new(sink));
        Ok(())
    }

    /// Arm every trigger in registration order.
    ///
    /// Fails fast: the first arming error is returned and the remaining
    /// triggers are not started. Registration is closed either way.
    pub fn start(&self) -> Result<(), ShutdownError> {
        let triggers = {
            let registry = self.registry();
            if self.inner.armed.swap(true, Ordering::AcqRel) {
                return Err(ShutdownError::AlreadyStarted);
            }
            registry.triggers.clone()
        };

        for trigger in &triggers {
            let name = trigger.name().to_string();
            if let Err(source) = trigger.clone().start(self.clone()) {
                tracing::error!(trigger = %name, error = %source, "Trigger failed to arm");
                return Err(ShutdownError::Arm {
                    trigger: name,
                    source,
                });
            }
            tracing::debug!(trigger = %name, "Trigger armed");
        }

        tracing::info!(
            triggers = triggers.len(),
            callbacks = self.callback_count(),
            "Shutdown triggers armed"
        );
        Ok(())
    }

    /// Run the shutdown sequence on behalf of `trigger`.
    ///
    /// Returns `true` if this call ran the sequence. A call that finds a
    /// sequence already in progress runs nothing, waits for it to finish and
    /// returns `false`.
    ///
    /// The sequence runs on its own task: dropping the returned future stops
    /// the wait, never the sequence.
    pub async fn start_shutdown(&self, trigger: Arc<dyn Trigger>) -> bool {
        let name = trigger.name().to_string();

        match self.claim(&name) {
            Claim::Unknown => false,
            Claim::Busy => {
                tracing::debug!(trigger = %name, "Shutdown already in progress, waiting for it");
                self.wait_terminated().await;
                false
            }
            Claim::Claimed => {
                let sequence = tokio::spawn(self.clone().run_sequence(trigger));
                if let Err(e) = sequence.await {
                    tracing::error!(trigger = %name, error = %e, "Shutdown sequence task failed");
                }
                true
            }
        }
    }

    /// Claim the coordinator for `trigger` and run the sequence in the background.
    ///
    /// Returns `None` when another sequence already holds the claim or the
    /// trigger is not registered. Must be called within a Tokio runtime.
    pub fn spawn_shutdown(&self, trigger: Arc<dyn Trigger>) -> Option<JoinHandle<()>> {
        match self.claim(trigger.name()) {
            Claim::Claimed => Some(tokio::spawn(self.clone().run_sequence(trigger))),
            Claim::Unknown | Claim::Busy => None,
        }
    }

    fn claim(&self, name: &str) -> Claim {
        if !self.is_registered(name) {
            self.report_error(ShutdownError::UnknownTrigger {
                trigger: name.to_string(),
            });
            return Claim::Unknown;
        }

        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == ShutdownState::Idle {
                *state = ShutdownState::ShuttingDown;
                true
            } else {
                false
            }
        });
        if claimed {
            Claim::Claimed
        } else {
            Claim::Busy
        }
    }

    /// Begin hook, callbacks, end hook. Only ever run by the claim holder.
    async fn run_sequence(self, trigger: Arc<dyn Trigger>) {
        let _terminate = TerminateOnDrop(&self.inner.state);
        let name = trigger.name().to_string();

        let started = Instant::now();
        tracing::info!(trigger = %name, "Shutdown started");
        metrics::record_shutdown_started(&name);

        if let Some(error) = self.run_hook(&trigger, Hook::Begin).await {
            self.report_error(error);
        }

        let participants: Vec<(String, Arc<dyn Callback>)> = self
            .registry()
            .participants
            .iter()
            .map(|p| (p.label.clone(), p.callback.clone()))
            .collect();

        for error in self.fan_out(&name, participants).await {
            self.report_error(error);
        }

        tracing::info!(
            trigger = %name,
            elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX),
            "Shutdown callbacks finished"
        );
        metrics::record_shutdown_duration(started);

        if let Some(error) = self.run_hook(&trigger, Hook::End).await {
            self.report_error(error);
        }

        tracing::info!(trigger = %name, "Shutdown complete");
    }

    /// Run one trigger hook on its own task so a panic stays contained.
    async fn run_hook(&self, trigger: &Arc<dyn Trigger>, hook: Hook) -> Option<ShutdownError> {
        let task = {
            let trigger = trigger.clone();
            tokio::spawn(async move {
                match hook {
                    Hook::Begin => trigger.on_shutdown_begin().await,
                    Hook::End => trigger.on_shutdown_end().await,
                }
            })
        };

        let trigger = trigger.name().to_string();
        match task.await {
            Ok(Ok(())) => None,
            Ok(Err(source)) => Some(hook.failed(trigger, source)),
            Err(e) if e.is_panic() => {
                tracing::warn!(trigger = %trigger, hook = hook.as_str(), "Trigger hook panicked");
                Some(ShutdownError::HookPanicked {
                    trigger,
                    hook: hook.as_str(),
                })
            }
            Err(e) => Some(hook.failed(trigger, Box::new(e))),
        }
    }

    /// Spawn every callback, then join them all.
    async fn fan_out(
        &self,
        trigger: &str,
        participants: Vec<(String, Arc<dyn Callback>)>,
    ) -> Vec<ShutdownError> {
        let deadline = self
            .inner
            .callback_timeout
            .map(|timeout| (timeout, tokio::time::Instant::now() + timeout));

        let handles: Vec<(String, JoinHandle<Result<(), BoxError>>)> = participants
            .into_iter()
            .map(|(label, callback)| {
                let trigger = trigger.to_string();
                let handle = tokio::spawn(async move { callback.on_shutdown(&trigger).await });
                (label, handle)
            })
            .collect();

        let mut errors = Vec::new();
        for (label, mut handle) in handles {
            let joined = match deadline {
                Some((timeout, deadline)) => {
                    match tokio::time::timeout_at(deadline, &mut handle).await {
                        Ok(joined) => joined,
                        Err(_) => {
                            handle.abort();
                            tracing::warn!(callback = %label, ?timeout, "Callback abandoned after deadline");
                            metrics::record_callback("timeout");
                            errors.push(ShutdownError::CallbackTimeout {
                                callback: label,
                                timeout,
                            });
                            continue;
                        }
                    }
                }
                None => handle.await,
            };

            match joined {
                Ok(Ok(())) => {
                    tracing::debug!(callback = %label, "Callback finished");
                    metrics::record_callback("ok");
                }
                Ok(Err(source)) => {
                    metrics::record_callback("error");
                    errors.push(ShutdownError::Callback {
                        callback: label,
                        source,
                    });
                }
                Err(e) if e.is_panic() => {
                    metrics::record_callback("panic");
                    errors.push(ShutdownError::CallbackPanicked { callback: label });
                }
                Err(_) => {
                    metrics::record_callback("cancelled");
                    errors.push(ShutdownError::CallbackCancelled { callback: label });
                }
            }
        }
        errors
    }

    /// Forward an error to the sink, or drop it when none is configured.
    ///
    /// Never fails and never propagates a panic from the sink.
    pub fn report_error(&self, error: ShutdownError) {
        metrics::record_reported_error(error.kind());

        let sink = self.registry().sink.clone();
        let Some(sink) = sink else {
            tracing::debug!(kind = error.kind(), error = %error, "No error sink configured, dropping error");
            return;
        };

        let _guard = self
            .inner
            .report_lock
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        if panic::catch_unwind(AssertUnwindSafe(|| sink.on_error(&error))).is_err() {
            tracing::warn!(kind = error.kind(), error = %error, "Error sink panicked");
        }
    }

    fn is_registered(&self, name: &str) -> bool {
        self.registry().triggers.iter().any(|t| t.name() == name)
    }

    /// Current state.
    pub fn state(&self) -> ShutdownState {
        *self.inner.state.borrow()
    }

    /// Subscribe to state transitions.
    pub fn subscribe(&self) -> watch::Receiver<ShutdownState> {
        self.inner.state.subscribe()
    }

    /// Wait until a shutdown sequence has completed.
    pub async fn wait_terminated(&self) {
        let mut rx = self.subscribe();
        // The sender lives in `inner`, so the channel cannot close under us.
        let _ = rx.wait_for(|state| *state == ShutdownState::Terminated).await;
    }

    /// Whether `start` has been called.
    pub fn is_started(&self) -> bool {
        self.inner.armed.load(Ordering::Acquire)
    }

    /// Names of registered triggers, in registration order.
    pub fn trigger_names(&self) -> Vec<String> {
        self.registry()
            .triggers
            .iter()
            .map(|t| t.name().to_string())
            .collect()
    }

    /// Number of registered callbacks.
    pub fn callback_count(&self) -> usize {
        self.registry().participants.len()
    }

    /// Configured callback deadline.
    pub fn callback_timeout(&self) -> Option<Duration> {
        self.inner.callback_timeout
    }
}

impl Default for Coordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Coordinator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Coordinator")
            .field("state", &self.state())
            .field("started", &self.is_started())
            .field("triggers", &self.trigger_names())
            .field("callbacks", &self.callback_count())
            .field("callback_timeout", &self.inner.callback_timeout)
            .finish()
    }
}

//! Shutdown error definitions.

use std::time::Duration;
use thiserror::Error;

use crate::lifecycle::coordinator::ShutdownState;

/// Boxed error returned by triggers and callbacks.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors raised while registering, arming or running a shutdown sequence.
///
/// Registration and arming errors are returned to the caller. Everything that
/// happens once a shutdown has begun is funneled through
/// [`Coordinator::report_error`](crate::lifecycle::Coordinator::report_error).
#[derive(Debug, Error)]
pub enum ShutdownError {
    /// Registration attempted after `start` or after a shutdown began.
    #[error("registration is closed (coordinator is {state})")]
    RegistrationClosed { state: ShutdownState },

    /// A trigger with the same name is already registered.
    #[error("trigger `{name}` is already registered")]
    DuplicateTrigger { name: String },

    /// `start` was called more than once.
    #[error("coordinator already started")]
    AlreadyStarted,

    /// A trigger could not begin detection.
    #[error("trigger `{trigger}` failed to arm: {source}")]
    Arm { trigger: String, source: BoxError },

    /// The begin hook of the firing trigger failed.
    #[error("trigger `{trigger}` begin hook failed: {source}")]
    BeginHook { trigger: String, source: BoxError },

    /// A callback returned an error.
    #[error("callback `{callback}` failed: {source}")]
    Callback { callback: String, source: BoxError },

    /// A callback was still running when the deadline expired.
    #[error("callback `{callback}` timed out after {timeout:?}")]
    CallbackTimeout { callback: String, timeout: Duration },

    /// A callback panicked.
    #[error("callback `{callback}` panicked")]
    CallbackPanicked { callback: String },

    /// A callback task was cancelled before finishing.
    #[error("callback `{callback}` was cancelled")]
    CallbackCancelled { callback: String },

    /// The end hook of the firing trigger failed.
    #[error("trigger `{trigger}` end hook failed: {source}")]
    EndHook { trigger: String, source: BoxError },

    /// A begin or end hook panicked.
    #[error("trigger `{trigger}` {hook} hook panicked")]
    HookPanicked { trigger: String, hook: &'static str },

    /// `start_shutdown` was called by a trigger that is not registered.
    #[error("trigger `{trigger}` is not registered with this coordinator")]
    UnknownTrigger { trigger: String },

    /// A trigger was fired before the coordinator started it.
    #[error("trigger `{trigger}` has not been started")]
    NotArmed { trigger: String },

    /// Caller-supplied error forwarded through the sink.
    #[error(transparent)]
    Custom(BoxError),
}

impl ShutdownError {
    /// Wrap an arbitrary error so it can be passed to `report_error`.
    pub fn custom(error: impl Into<BoxError>) -> Self {
        Self::Custom(error.into())
    }

    /// Stable label used in log fields and metric labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::RegistrationClosed { .. } => "registration_closed",
            Self::DuplicateTrigger { .. } => "duplicate_trigger",
            Self::AlreadyStarted => "already_started",
            Self::Arm { .. } => "arm",
            Self::BeginHook { .. } => "begin_hook",
            Self::Callback { .. } => "callback",
            Self::CallbackTimeout { .. } => "callback_timeout",
            Self::CallbackPanicked { .. } => "callback_panic",
            Self::CallbackCancelled { .. } => "callback_cancelled",
            Self::EndHook { .. } => "end_hook",
            Self::HookPanicked { .. } => "hook_panicked",
            Self::UnknownTrigger { .. } => "unknown_trigger",
            Self::NotArmed { .. } => "not_armed",
            Self::Custom(_) => "custom",
        }
    }
}

//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load config → Register triggers, callbacks, sink → Coordinator::start
//!
//! Detection (signals.rs, file.rs, manual.rs, crate::admin):
//!     SIGTERM/SIGINT, sentinel file, POST /admin/shutdown, in-process call
//!     → Coordinator::start_shutdown (first firing wins)
//!
//! Shutdown (coordinator.rs):
//!     Begin hook → Fan out callbacks → Barrier (optional deadline)
//!     → Report errors to sink → End hook (signal trigger exits the process)
//! ```
//!
//! # Design Decisions
//! - Registration is closed once the coordinator starts
//! - No failure aborts the sequence; errors go to the sink
//! - Shutdown has an optional deadline: unfinished callbacks are abandoned

pub mod callback;
pub mod coordinator;
pub mod error;
pub mod file;
pub mod manual;
pub mod pid_file;
pub mod signals;
pub mod sink;
pub mod startup;
pub mod trigger;

pub use callback::{callback_fn, Callback, FnCallback};
pub use coordinator::{Coordinator, ShutdownState};
pub use error::{BoxError, ShutdownError};
pub use file::FileTrigger;
pub use manual::ManualTrigger;
pub use pid_file::PidFile;
pub use signals::{SignalTrigger, TermSignal};
pub use sink::{ErrorSink, TracingSink};
pub use trigger::Trigger;

pub(crate) use trigger::require_runtime;

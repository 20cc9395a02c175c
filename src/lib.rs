//! Graceful shutdown coordination.
//!
//! A [`Coordinator`] owns a set of trigger sources (OS signals, a sentinel
//! file, an HTTP admin endpoint, in-process handles) and a set of cleanup
//! callbacks. The first trigger to fire runs its begin hook, fans every
//! callback out concurrently, waits for all of them, reports failures to the
//! error sink and finally runs its end hook.
//!
//! ```no_run
//! use graceful_shutdown::lifecycle::{callback_fn, SignalTrigger, TracingSink};
//! use graceful_shutdown::Coordinator;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let coordinator = Coordinator::new();
//! coordinator.add_trigger(SignalTrigger::default())?;
//! coordinator.add_callback(
//!     callback_fn(|trigger: String| async move {
//!         tracing::info!(%trigger, "closing connections");
//!         Ok(())
//!     })
//!     .named("connection-pool"),
//! )?;
//! coordinator.set_error_sink(TracingSink)?;
//! coordinator.start()?;
//! coordinator.wait_terminated().await;
//! # Ok(())
//! # }
//! ```

pub mod admin;
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use admin::AdminTrigger;
pub use config::DaemonConfig;
pub use lifecycle::{Coordinator, ShutdownError, ShutdownState};

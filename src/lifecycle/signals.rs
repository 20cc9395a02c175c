//! OS signal handling.
//!
//! # Responsibilities
//! - Register handlers for the configured termination signals
//! - Translate the first delivery into a coordinator shutdown
//! - End the process once every callback has finished
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - Handlers are installed synchronously in `start`, so registration
//!   failures surface as arming errors
//! - Deliveries funnel into a single-slot channel; only the first counts
//! - Optionally, a repeated SIGTERM/SIGINT during shutdown forces exit

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::lifecycle::coordinator::Coordinator;
use crate::lifecycle::error::BoxError;
use crate::lifecycle::trigger::{require_runtime, Trigger};

/// Name used by [`SignalTrigger::default`].
pub const SIGNAL_TRIGGER_NAME: &str = "posix-signal";

/// Exit status after a completed shutdown sequence.
pub const EXIT_SUCCESS: i32 = 0;

/// Exit status when a repeated signal forces termination.
pub const EXIT_FORCED: i32 = 130;

/// Termination signals a [`SignalTrigger`] can subscribe to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(try_from = "String", into = "String")]
pub enum TermSignal {
    Interrupt,
    Terminate,
    Quit,
    Hangup,
    User1,
    User2,
}

impl TermSignal {
    /// SIGINT and SIGTERM.
    pub const DEFAULT: [TermSignal; 2] = [TermSignal::Interrupt, TermSignal::Terminate];

    /// Conventional `SIG*` name.
    pub fn as_str(&self) -> &'static str {
        match self {
            TermSignal::Interrupt => "SIGINT",
            TermSignal::Terminate => "SIGTERM",
            TermSignal::Quit => "SIGQUIT",
            TermSignal::Hangup => "SIGHUP",
            TermSignal::User1 => "SIGUSR1",
            TermSignal::User2 => "SIGUSR2",
        }
    }

    #[cfg(unix)]
    fn kind(&self) -> tokio::signal::unix::SignalKind {
        use tokio::signal::unix::SignalKind;
        match self {
            TermSignal::Interrupt => SignalKind::interrupt(),
            TermSignal::Terminate => SignalKind::terminate(),
            TermSignal::Quit => SignalKind::quit(),
            TermSignal::Hangup => SignalKind::hangup(),
            TermSignal::User1 => SignalKind::user_defined1(),
            TermSignal::User2 => SignalKind::user_defined2(),
        }
    }
}

impl fmt::Display for TermSignal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TermSignal {
    type Err = String;

    /// Accepts `SIGTERM`, `TERM` or `terminate`, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let upper = s.trim().to_ascii_uppercase();
        let bare = upper.strip_prefix("SIG").unwrap_or(&upper);
        match bare {
            "INT" | "INTERRUPT" => Ok(TermSignal::Interrupt),
            "TERM" | "TERMINATE" => Ok(TermSignal::Terminate),
            "QUIT" => Ok(TermSignal::Quit),
            "HUP" | "HANGUP" => Ok(TermSignal::Hangup),
            "USR1" => Ok(TermSignal::User1),
            "USR2" => Ok(TermSignal::User2),
            _ => Err(format!("unknown signal: {}", s)),
        }
    }
}

impl TryFrom<String> for TermSignal {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<TermSignal> for String {
    fn from(signal: TermSignal) -> Self {
        signal.as_str().to_string()
    }
}

/// Trigger that fires on OS termination signals.
#[derive(Debug, Clone)]
pub struct SignalTrigger {
    name: String,
    signals: Vec<TermSignal>,
    exit_on_finish: bool,
    force_exit_on_repeat: bool,
}

impl SignalTrigger {
    /// Listen for `signals`; an empty set means SIGINT and SIGTERM.
    pub fn new(signals: impl IntoIterator<Item = TermSignal>) -> Self {
        let mut signals: Vec<TermSignal> = signals.into_iter().collect();
        if signals.is_empty() {
            signals = TermSignal::DEFAULT.to_vec();
        }
        Self {
            name: SIGNAL_TRIGGER_NAME.to_string(),
            signals,
            exit_on_finish: true,
            force_exit_on_repeat: false,
        }
    }

    /// Override the trigger name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Whether the end hook exits the process (default: true).
    pub fn exit_on_finish(mut self, exit: bool) -> Self {
        self.exit_on_finish = exit;
        self
    }

    /// Exit immediately with [`EXIT_FORCED`] on a second signal during shutdown.
    pub fn force_exit_on_repeat(mut self, force: bool) -> Self {
        self.force_exit_on_repeat = force;
        self
    }

    /// Subscribed signals.
    pub fn signals(&self) -> &[TermSignal] {
        &self.signals
    }

    /// Install one handler per signal, each feeding `tx`.
    #[cfg(unix)]
    fn install(&self, tx: &mpsc::Sender<TermSignal>) -> Result<(), BoxError> {
        use tokio::signal::unix::signal;

        let mut streams = Vec::with_capacity(self.signals.len());
        for sig in &self.signals {
            let stream = signal(sig.kind())
                .map_err(|e| format!("failed to register {} handler: {}", sig, e))?;
            streams.push((*sig, stream));
        }

        for (sig, mut stream) in streams {
            let tx = tx.clone();
            tokio::spawn(async move {
                while stream.recv().await.is_some() {
                    if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(sig) {
                        break;
                    }
                }
            });
        }
        Ok(())
    }

    #[cfg(not(unix))]
    fn install(&self, tx: &mpsc::Sender<TermSignal>) -> Result<(), BoxError> {
        if let Some(sig) = self.signals.iter().find(|s| **s != TermSignal::Interrupt) {
            return Err(format!("{} is not supported on this platform", sig).into());
        }

        let tx = tx.clone();
        tokio::spawn(async move {
            while tokio::signal::ctrl_c().await.is_ok() {
                if let Err(mpsc::error::TrySendError::Closed(_)) = tx.try_send(TermSignal::Interrupt) {
                    break;
                }
            }
        });
        Ok(())
    }
}

impl Default for SignalTrigger {
    fn default() -> Self {
        Self::new(TermSignal::DEFAULT)
    }
}

#[async_trait]
impl Trigger for SignalTrigger {
    fn name(&self) -> &str {
        &self.name
    }

    fn start(self: Arc<Self>, coordinator: Coordinator) -> Result<(), BoxError> {
        let runtime = require_runtime(&self.name)?;
        let _enter = runtime.enter();

        // Buffered, not synchronous: a delivery is never lost while we are busy.
        let (tx, mut rx) = mpsc::channel(1);
        self.install(&tx)?;

        tracing::info!(
            trigger = %self.name,
            signals = ?self.signals,
            "Listening for termination signals"
        );

        runtime.spawn(async move {
            let Some(sig) = rx.recv().await else {
                return;
            };
            tracing::info!(trigger = %self.name, signal = %sig, "Termination signal received");

            if self.force_exit_on_repeat {
                tokio::spawn(async move {
                    if let Some(sig) = rx.recv().await {
                        tracing::warn!(signal = %sig, "Repeated signal during shutdown, forcing exit");
                        std::process::exit(EXIT_FORCED);
                    }
                });
            } else {
                drop(rx);
            }

            coordinator.start_shutdown(self).await;
        });
        Ok(())
    }

    async fn on_shutdown_end(&self) -> Result<(), BoxError> {
        if self.exit_on_finish {
            tracing::info!(trigger = %self.name, code = EXIT_SUCCESS, "Exiting process");
            std::process::exit(EXIT_SUCCESS);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_signal_parsing() {
        assert_eq!("SIGTERM".parse::<TermSignal>().unwrap(), TermSignal::Terminate);
        assert_eq!("int".parse::<TermSignal>().unwrap(), TermSignal::Interrupt);
        assert_eq!("interrupt".parse::<TermSignal>().unwrap(), TermSignal::Interrupt);
        assert_eq!(" sigusr1 ".parse::<TermSignal>().unwrap(), TermSignal::User1);
        assert!("SIGKILL".parse::<TermSignal>().is_err());
    }

    #[test]
    fn test_default_signals() {
        let trigger = SignalTrigger::new(Vec::new());
        assert_eq!(trigger.signals(), &TermSignal::DEFAULT);
        assert_eq!(trigger.name(), SIGNAL_TRIGGER_NAME);

        let trigger = SignalTrigger::new([TermSignal::Hangup]).with_name("hup");
        assert_eq!(trigger.signals(), &[TermSignal::Hangup]);
        assert_eq!(trigger.name(), "hup");
    }

    #[test]
    fn test_serde_names() {
        #[derive(Deserialize)]
        struct Wrapper {
            signals: Vec<TermSignal>,
        }

        let parsed: Wrapper = toml::from_str(r#"signals = ["SIGINT", "TERM", "quit"]"#).unwrap();
        assert_eq!(
            parsed.signals,
            vec![TermSignal::Interrupt, TermSignal::Terminate, TermSignal::Quit]
        );
        assert_eq!(String::from(TermSignal::Hangup), "SIGHUP");
    }

    #[test]
    fn test_start_without_runtime_fails_to_arm() {
        let coordinator = Coordinator::new();
        let trigger = Arc::new(SignalTrigger::default());
        let err = trigger.start(coordinator).unwrap_err();
        assert!(err.to_string().contains("Tokio runtime"));
    }
}

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → DaemonConfig (validated, immutable)
//!     → lifecycle::startup builds the coordinator from it
//! ```
//!
//! # Design Decisions
//! - Config is read once at startup; triggers are fixed after `start`
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::AdminConfig;
pub use schema::DaemonConfig;
pub use schema::FileTriggerConfig;
pub use schema::LogFormat;
pub use schema::ObservabilityConfig;
pub use schema::ShutdownConfig;

//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → command line overrides
//!     → validation.rs (semantic checks)
//!     → ServerConfig (validated, immutable)
//!
//! On reload signal (SIGHUP):
//!     lifecycle::reload re-runs the same pipeline
//!     → log filter swapped, read buffer resized
//!     → listener settings only take effect after a restart
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require full reload
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    ConfigOverrides, ConnectionConfig, ListenerConfig, LogFormat, ObservabilityConfig,
    ServerConfig,
};

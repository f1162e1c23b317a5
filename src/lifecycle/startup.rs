//! Startup orchestration.
//!
//! # Responsibilities
//! - Register the reload signal before anything can raise it at us
//! - Bind the listener
//! - Assemble the event loop
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Signal registration first, listener last (traffic only when ready)

use std::path::PathBuf;

use crate::config::{ConfigOverrides, ServerConfig};
use crate::error::ServerError;
use crate::lifecycle::reload::ConfigReloader;
use crate::lifecycle::signals::SignalGate;
use crate::net::Listener;
use crate::observability::logging::FilterControl;
use crate::server::EventLoop;

/// Where the running configuration came from, so it can be reloaded.
#[derive(Debug, Default)]
pub struct ConfigSource {
    pub path: Option<PathBuf>,
    pub overrides: ConfigOverrides,
    pub filter: Option<FilterControl>,
}

/// Build a ready-to-run event loop. Must be called within a Tokio runtime.
pub fn start(config: &ServerConfig, source: ConfigSource) -> Result<EventLoop, ServerError> {
    let gate = SignalGate::install()?;
    let listener = Listener::bind(&config.listener)?;

    let mut reloader = ConfigReloader::new(source.path, source.overrides, config.clone());
    if let Some(filter) = source.filter {
        reloader = reloader.with_filter(filter);
    }

    Ok(EventLoop::new(listener, gate, config.connection.read_buffer_size).with_reloader(reloader))
}

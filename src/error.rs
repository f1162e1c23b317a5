//! Server-level error taxonomy.
//!
//! Startup errors (`Bind`, `Listen`, `SignalInstall`, `Runtime`, `Config`,
//! `Logging`) abort the process before the event loop starts. `SignalStreamClosed` is
//! the only fatal loop error. Accept failures and connection termination are
//! not represented here: the loop logs them and keeps waiting.

use std::net::SocketAddr;

use thiserror::Error;

use crate::config::loader::ConfigError;
use crate::observability::logging::LoggingError;

/// Errors that terminate the server.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The configured bind address could not be parsed or bound.
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// `listen(2)` failed on an already bound socket.
    #[error("failed to listen on {addr}: {source}")]
    Listen {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// The reload signal handler could not be registered.
    #[error("failed to install reload signal handler: {0}")]
    SignalInstall(#[source] std::io::Error),

    /// The Tokio runtime could not be built.
    #[error("failed to build runtime: {0}")]
    Runtime(#[source] std::io::Error),

    /// The runtime's signal driver went away while the loop was waiting.
    #[error("reload signal stream closed while waiting for readiness")]
    SignalStreamClosed,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Logging(#[from] LoggingError),
}

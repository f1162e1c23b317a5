//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the global tracing subscriber
//! - Pick pretty or JSON output
//! - Allow the log filter to be replaced at runtime (reload signal)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - JSON format for production, pretty format for development
//! - `RUST_LOG` wins over the configured level at startup

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::{SubscriberInitExt, TryInitError};
use tracing_subscriber::{fmt, reload, EnvFilter, Registry};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::lifecycle::reload::ReloadError;

/// Handle used to swap the active log filter.
pub type FilterHandle = reload::Handle<EnvFilter, Registry>;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("invalid log filter: {0}")]
    Filter(#[from] ParseError),

    #[error("failed to install log subscriber: {0}")]
    Init(#[from] TryInitError),
}

/// Build the startup filter: `RUST_LOG` if set, else the configured level.
/// The flag is true when the filter came from the environment.
pub fn build_filter(config: &ObservabilityConfig) -> Result<(EnvFilter, bool), ParseError> {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok((filter, true)),
        Err(_) => EnvFilter::try_new(&config.log_level).map(|filter| (filter, false)),
    }
}

/// Install the global subscriber and return control over its filter.
pub fn init(config: &ObservabilityConfig) -> Result<FilterControl, LoggingError> {
    let (filter, from_env) = build_filter(config)?;
    let (filter, handle) = reload::Layer::new(filter);
    let registry = tracing_subscriber::registry().with(filter);

    match config.log_format {
        LogFormat::Pretty => registry.with(fmt::layer()).try_init()?,
        LogFormat::Json => registry.with(fmt::layer().json()).try_init()?,
    }

    Ok(FilterControl::new(handle, from_env))
}

/// The active log filter, and whether `RUST_LOG` pinned it at startup.
#[derive(Debug, Clone)]
pub struct FilterControl {
    handle: FilterHandle,
    pinned_by_env: bool,
}

impl FilterControl {
    pub fn new(handle: FilterHandle, pinned_by_env: bool) -> Self {
        Self {
            handle,
            pinned_by_env,
        }
    }

    /// Replace the active filter with `level`. Returns `false` without
    /// touching the filter when `RUST_LOG` chose it.
    pub fn set_level(&self, level: &str) -> Result<bool, ReloadError> {
        if self.pinned_by_env {
            tracing::info!(log_level = %level, "RUST_LOG set; ignoring log_level");
            return Ok(false);
        }
        let filter = EnvFilter::try_new(level)?;
        self.handle.reload(filter)?;
        Ok(true)
    }
}

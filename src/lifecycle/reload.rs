//! Configuration reload on the administrative signal.
//!
//! The reload re-reads the configuration file and applies what can change
//! while running: the log filter and the read buffer size. Listener
//! settings are reported and left alone; the held connection is never touched.

use std::path::PathBuf;

use thiserror::Error;

use crate::config::{load_config, ConfigError, ConfigOverrides, ServerConfig};
use crate::observability::logging::FilterControl;

#[derive(Debug, Error)]
pub enum ReloadError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("invalid log filter: {0}")]
    Filter(#[from] tracing_subscriber::filter::ParseError),

    #[error("failed to swap log filter: {0}")]
    Subscriber(#[from] tracing_subscriber::reload::Error),
}

/// Re-reads the configuration file on request.
#[derive(Debug)]
pub struct ConfigReloader {
    path: Option<PathBuf>,
    overrides: ConfigOverrides,
    active: ServerConfig,
    filter: Option<FilterControl>,
}

impl ConfigReloader {
    /// `active` is the configuration the server started with.
    pub fn new(path: Option<PathBuf>, overrides: ConfigOverrides, active: ServerConfig) -> Self {
        Self {
            path,
            overrides,
            active,
            filter: None,
        }
    }

    /// Swap this filter when the log level changes.
    pub fn with_filter(mut self, filter: FilterControl) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn active(&self) -> &ServerConfig {
        &self.active
    }

    /// Load the file again and make it the active configuration.
    ///
    /// On error the active configuration is unchanged.
    pub fn reload(&mut self) -> Result<&ServerConfig, ReloadError> {
        let Some(path) = &self.path else {
            tracing::debug!("No configuration file; nothing to reload");
            return Ok(&self.active);
        };

        let next = load_config(Some(path), &self.overrides)?;

        if next.observability.log_level != self.active.observability.log_level {
            let swapped = match &self.filter {
                Some(filter) => filter.set_level(&next.observability.log_level)?,
                None => false,
            };
            if swapped {
                tracing::info!(
                    log_level = %next.observability.log_level,
                    "Log filter updated"
                );
            }
        }
        if next.listener != self.active.listener {
            tracing::warn!(
                bind_address = %next.listener.bind_address,
                backlog = next.listener.backlog,
                "Listener settings changed; restart to apply them"
            );
        }
        if next.observability.log_format != self.active.observability.log_format {
            tracing::warn!("Log format changed; restart to apply it");
        }

        tracing::info!(path = %path.display(), "Configuration reloaded");
        self.active = next;
        Ok(&self.active)
    }
}

#[cfg(test)]
mod tests {
    use tracing_subscriber::filter::LevelFilter;
    use tracing_subscriber::{reload, EnvFilter, Registry};

    use super::*;

    fn write_config(file: &tempfile::NamedTempFile, contents: &str) {
        std::fs::write(file.path(), contents).unwrap();
    }

    #[test]
    fn without_file_reload_keeps_config() {
        let mut reloader =
            ConfigReloader::new(None, ConfigOverrides::default(), ServerConfig::default());
        assert_eq!(reloader.reload().unwrap(), &ServerConfig::default());
    }

    #[test]
    fn applies_new_buffer_size_and_filter() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_config(&file, "");
        let (layer, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new("info"));

        let mut reloader = ConfigReloader::new(
            Some(file.path().to_path_buf()),
            ConfigOverrides::default(),
            ServerConfig::default(),
        )
        .with_filter(FilterControl::new(handle.clone(), false));

        write_config(
            &file,
            "[connection]\nread_buffer_size = 4096\n[observability]\nlog_level = \"debug\"\n",
        );
        let config = reloader.reload().unwrap();
        assert_eq!(config.connection.read_buffer_size, 4096);
        assert_eq!(
            handle.with_current(|filter| filter.max_level_hint()).unwrap(),
            Some(LevelFilter::DEBUG)
        );
        drop(layer);
    }

    #[test]
    fn filter_from_environment_survives_reload() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_config(&file, "");
        let (layer, handle) = reload::Layer::<EnvFilter, Registry>::new(EnvFilter::new("trace"));

        let mut reloader = ConfigReloader::new(
            Some(file.path().to_path_buf()),
            ConfigOverrides::default(),
            ServerConfig::default(),
        )
        .with_filter(FilterControl::new(handle.clone(), true));

        write_config(&file, "[observability]\nlog_level = \"warn\"\n");
        let config = reloader.reload().unwrap();
        assert_eq!(config.observability.log_level, "warn");
        assert_eq!(
            handle.with_current(|filter| filter.max_level_hint()).unwrap(),
            Some(LevelFilter::TRACE)
        );
        drop(layer);
    }

    #[test]
    fn overrides_survive_reload() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_config(&file, "[observability]\nlog_level = \"trace\"\n");
        let overrides = ConfigOverrides {
            bind_address: None,
            log_level: Some("warn".into()),
        };

        let mut reloader = ConfigReloader::new(
            Some(file.path().to_path_buf()),
            overrides,
            ServerConfig::default(),
        );
        assert_eq!(reloader.reload().unwrap().observability.log_level, "warn");
    }

    #[test]
    fn broken_file_keeps_active_config() {
        let file = tempfile::NamedTempFile::new().unwrap();
        write_config(&file, "[connection]\nread_buffer_size = 0\n");

        let mut reloader = ConfigReloader::new(
            Some(file.path().to_path_buf()),
            ConfigOverrides::default(),
            ServerConfig::default(),
        );
        assert!(matches!(
            reloader.reload(),
            Err(ReloadError::Config(ConfigError::Validation(_)))
        ));
        assert_eq!(reloader.active(), &ServerConfig::default());
    }
}

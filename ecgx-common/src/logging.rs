//! Tracing subscriber setup
//!
//! One global subscriber per process: an `EnvFilter` (`RUST_LOG` wins over the
//! configured level), a stderr fmt layer and, when a log file is configured,
//! a second fmt layer appending to that file without ANSI colours.

use crate::config::LoggingConfig;
use crate::{Error, Result};
use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// Build the filter: `RUST_LOG` when set, else the configured level
pub fn build_filter(config: &LoggingConfig) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(&config.level)
        .map_err(|e| Error::Config(format!("Invalid log level '{}': {}", config.level, e)))
}

/// Install the global subscriber
///
/// Fails if the level string is not a valid filter, the log file cannot be
/// opened, or a global subscriber is already installed.
pub fn init_tracing(config: &LoggingConfig, log_file: Option<&Path>) -> Result<()> {
    let filter = build_filter(config)?;

    let file_layer = match log_file {
        Some(path) => {
            if let Some(parent) = path.parent() {
                if !parent.as_os_str().is_empty() {
                    std::fs::create_dir_all(parent)?;
                }
            }
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            Some(
                fmt::layer()
                    .with_ansi(false)
                    .with_target(true)
                    .with_writer(Mutex::new(file)),
            )
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(file_layer)
        .try_init()
        .map_err(|e| Error::Config(format!("Tracing already initialized: {}", e)))?;

    if let Some(path) = log_file {
        tracing::info!("Logging to {}", path.display());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_level_rejected() {
        // Only meaningful when RUST_LOG is unset in the test environment
        if std::env::var("RUST_LOG").is_ok() {
            return;
        }
        let config = LoggingConfig {
            level: "ecgx=loud".to_string(),
            file: None,
        };
        assert!(build_filter(&config).is_err());
    }

    #[test]
    fn test_valid_level_accepted() {
        let config = LoggingConfig {
            level: "debug".to_string(),
            file: None,
        };
        assert!(build_filter(&config).is_ok());
    }
}

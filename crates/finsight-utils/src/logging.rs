//! Logging and tracing utilities

use crate::config::{LogConfig, LogFormat};
use std::fs::{self, OpenOptions};
use std::sync::Arc;
use thiserror::Error;
use tracing_subscriber::{
    EnvFilter, Layer, Registry, fmt, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Name of the file written under [`LogConfig::directory`]
pub const LOG_FILE_NAME: &str = "finsight.log";

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Errors raised while installing the global subscriber
#[derive(Debug, Error)]
pub enum LoggingError {
    /// The filter directive could not be parsed
    #[error("invalid log filter '{directive}': {reason}")]
    Filter { directive: String, reason: String },

    /// The log directory or file could not be opened
    #[error("cannot open log file: {0}")]
    Io(#[from] std::io::Error),

    /// A global subscriber is already installed
    #[error("tracing subscriber already initialised: {0}")]
    AlreadyInitialised(String),
}

/// Initialize tracing subscriber with default configuration
///
/// Text output at `info`, overridable through `RUST_LOG`. Calling it twice is
/// harmless; the second call leaves the first subscriber in place.
pub fn init_tracing() {
    if let Err(err) = init_tracing_with(&LogConfig::default()) {
        tracing::debug!(error = %err, "tracing already configured");
    }
}

/// Initialize tracing from an explicit [`LogConfig`]
///
/// `RUST_LOG` still wins over `config.level` when it is set. When
/// `config.directory` is present the directory is created and every event is
/// also appended, without ANSI colours, to [`LOG_FILE_NAME`] inside it.
pub fn init_tracing_with(config: &LogConfig) -> Result<(), LoggingError> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.level).map_err(|e| LoggingError::Filter {
            directive: config.level.clone(),
            reason: e.to_string(),
        })?,
    };

    let mut layers: Vec<BoxedLayer> = Vec::with_capacity(2);
    layers.push(match config.format {
        LogFormat::Text => fmt::layer().with_target(true).boxed(),
        LogFormat::Json => fmt::layer().json().with_current_span(true).boxed(),
    });

    if let Some(dir) = &config.directory {
        fs::create_dir_all(dir)?;
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(dir.join(LOG_FILE_NAME))?;
        layers.push(
            fmt::layer()
                .with_ansi(false)
                .with_file(true)
                .with_line_number(true)
                .with_writer(Arc::new(file))
                .boxed(),
        );
    }

    tracing_subscriber::registry()
        .with(layers)
        .with(filter)
        .try_init()
        .map_err(|e| LoggingError::AlreadyInitialised(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_filter_is_reported() {
        let config = LogConfig {
            level: "finsight=verbose".to_string(),
            ..LogConfig::default()
        };
        // RUST_LOG may be set in CI; only assert when it is not.
        if std::env::var("RUST_LOG").is_err() {
            let err = init_tracing_with(&config).unwrap_err();
            assert!(matches!(err, LoggingError::Filter { .. }));
        }
    }

    #[test]
    fn test_file_sink_creates_directory() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");
        let config = LogConfig {
            directory: Some(log_dir.clone()),
            ..LogConfig::default()
        };

        // Another test may already own the global subscriber; the directory
        // and file are created before installation either way.
        let _ = init_tracing_with(&config);
        assert!(log_dir.join(LOG_FILE_NAME).exists());
    }
}

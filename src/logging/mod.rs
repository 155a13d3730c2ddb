//! Diagnostics for the wrapper itself.
//!
//! Stdout belongs to the wrapped plugin (it carries the CNI result), so the
//! wrapper only ever logs to stderr or to a configured file.

use crate::config::{Config, LogFormat};
use crate::error::{ConfigError, Result};
use std::fs::OpenOptions;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::EnvFilter;

/// Keeps the background log writer alive; drop it only after the last event.
pub struct LogGuard {
    _worker: Option<WorkerGuard>,
}

/// Install the global subscriber. `RUST_LOG` wins over `log_level`.
pub fn init(config: &Config) -> Result<LogGuard> {
    let filter = match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::try_new(&config.log_level).map_err(|e| {
            ConfigError::Validation(format!("Invalid log_level '{}': {}", config.log_level, e))
        })?,
    };

    let (writer, worker) = match &config.log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let (non_blocking, guard) = tracing_appender::non_blocking(file);
            (BoxMakeWriter::new(non_blocking), Some(guard))
        }
        None => (BoxMakeWriter::new(std::io::stderr), None),
    };

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false);

    let installed = match config.log_format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|e| ConfigError::Validation(format!("Failed to initialize logging: {e}")))?;

    Ok(LogGuard { _worker: worker })
}

//! Diagnostic logging setup.
//!
//! Library code only emits `tracing` events. Binaries call [`init_logging`]
//! once at startup to install a subscriber.

use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;
use tracing_subscriber::EnvFilter;

use crate::config::{EnvConfig, DEFAULT_LOG_FILTER};

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to open log file {path}: {source}")]
    OpenLogFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Parse `directives`, falling back to [`DEFAULT_LOG_FILTER`] when they are invalid.
pub fn build_filter(directives: &str) -> EnvFilter {
    EnvFilter::try_new(directives).unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

/// Install the global `fmt` subscriber described by `config`.
///
/// Returns `Ok(false)` when another subscriber was already installed.
pub fn init_logging(config: &EnvConfig) -> Result<bool, LoggingError> {
    let filter = build_filter(&config.log_filter);

    let installed = match &config.log_file {
        Some(path) => {
            let file = open_log_file(path)?;
            tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init()
                .is_ok()
        }
        None => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(std::io::stderr)
            .try_init()
            .is_ok(),
    };

    Ok(installed)
}

fn open_log_file(path: &Path) -> Result<File, LoggingError> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| LoggingError::OpenLogFile {
            path: path.to_path_buf(),
            source,
        })
}

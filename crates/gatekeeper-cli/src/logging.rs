//! Log sink setup.
//!
//! Every record goes to the configured log file (plain text, appended). In
//! live mode the same records are mirrored to stderr for the operator; in
//! simulation mode the console belongs to the interactive session.
//!
//! Nothing is installed globally. [`init`] returns a [`Dispatch`] that the
//! entry point scopes around the whole run.

use std::fs::OpenOptions;

use anyhow::{Context, Result};
use tracing::Dispatch;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

use crate::config::{DEFAULT_LOG_LEVEL, LoggingConfig};

/// Configured log pipeline.
///
/// The guard flushes buffered records when dropped; keep it alive until the
/// process exits.
pub struct Logging {
    pub dispatch: Dispatch,
    _guard: WorkerGuard,
}

/// Build the log pipeline described by `config`.
///
/// `RUST_LOG` overrides `config.level`; an unparseable level falls back to
/// `info`.
///
/// # Errors
///
/// Fails if the log file cannot be opened for appending.
pub fn init(config: &LoggingConfig, console: bool) -> Result<Logging> {
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&config.file)
        .with_context(|| format!("failed to open log file {}", config.file.display()))?;
    let (writer, guard) = tracing_appender::non_blocking(file);

    let subscriber = tracing_subscriber::registry()
        .with(filter(&config.level))
        .with(fmt::layer().with_writer(writer).with_ansi(false))
        .with(console.then(|| {
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .compact()
        }));

    Ok(Logging {
        dispatch: Dispatch::new(subscriber),
        _guard: guard,
    })
}

fn filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_LEVEL))
}

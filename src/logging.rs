//! `tracing` subscriber setup for the binaries.

use std::fs;

use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

/// Log file prefix inside the configured directory; the appender adds the date.
pub const LOG_FILE_NAME: &str = "finance-etl.log";

/// Build the level filter: `RUST_LOG` when set, otherwise `config.filter`, otherwise `info`.
pub fn env_filter(config: &LoggingConfig) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.filter))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber: console output on stderr plus, when `config.dir` is set, a
/// daily rolling file (plain or JSON).
///
/// Keep the returned guard alive until exit so buffered file output is flushed. Installing twice
/// is a no-op.
pub fn init_logging(config: &LoggingConfig) -> Option<WorkerGuard> {
    let mut dir_error = None;
    let (writer, guard) = match &config.dir {
        Some(dir) => match fs::create_dir_all(dir) {
            Ok(()) => {
                let appender = tracing_appender::rolling::daily(dir, LOG_FILE_NAME);
                let (writer, guard) = tracing_appender::non_blocking(appender);
                (Some(writer), Some(guard))
            }
            Err(err) => {
                dir_error = Some(format!("{}: {err}", dir.display()));
                (None, None)
            }
        },
        None => (None, None),
    };

    let (json_layer, plain_layer) = match writer {
        Some(w) if config.json => (Some(fmt::layer().json().with_writer(w)), None),
        Some(w) => (None, Some(fmt::layer().with_ansi(false).with_writer(w))),
        None => (None, None),
    };

    let console_layer = fmt::layer().with_target(false).with_writer(std::io::stderr);

    let installed = tracing_subscriber::registry()
        .with(env_filter(config))
        .with(console_layer)
        .with(json_layer)
        .with(plain_layer)
        .try_init()
        .is_ok();

    if let Some(message) = dir_error {
        warn!(%message, "log directory unavailable; logging to console only");
    }

    installed.then_some(guard).flatten()
}

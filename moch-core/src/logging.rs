//! Tracing setup for the `moch` binary and its crates.
//!
//! Store mutations, cascades, bus deliveries and migrations all log through
//! `tracing`. The CLI mirrors them to stderr and to `moch.log.<date>` files in
//! the configured log directory; `--verbose` lowers the filter to `debug` so
//! per-event `change_bus` lines show up.

use std::path::Path;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use tracing_appender::rolling;

use crate::constants::LOG_FILE_PREFIX;
use crate::error::MochResult;

/// Install the process-wide subscriber used by the `moch` CLI.
///
/// `level` accepts a bare level or an `EnvFilter` directive such as
/// `"info,moch_services::store=debug"`; an unparsable directive falls back to
/// `info`. With `json_output` the log file gets one JSON object per line,
/// while stderr stays compact text. Hold the returned guard until exit or
/// buffered file lines are lost.
pub fn init_logging(level: &str, log_dir: &Path, json_output: bool) -> MochResult<LogGuard> {
    std::fs::create_dir_all(log_dir)?;

    let file_appender = rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_new(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(true)
        .compact();

    if json_output {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .json()
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    } else {
        let file_layer = fmt::layer()
            .with_writer(non_blocking)
            .with_ansi(false)
            .with_target(true)
            .with_file(true)
            .with_line_number(true);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(console_layer)
            .with(file_layer)
            .init();
    }

    tracing::info!("logging initialized at level={level}, dir={}", log_dir.display());

    Ok(LogGuard { _guard: guard })
}

/// Flushes the background log-file writer when dropped.
pub struct LogGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Stderr-only subscriber for tests that want to see store logs. Does nothing
/// if a subscriber is already installed.
pub fn init_console_logging(level: &str) {
    let env_filter = EnvFilter::try_new(level)
        .unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(true)
                .compact(),
        )
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_console_logging_does_not_panic() {
        init_console_logging("debug");
        init_console_logging("not a level");
    }
}

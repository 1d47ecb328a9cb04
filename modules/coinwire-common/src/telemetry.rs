//! Process-wide tracing setup.
//!
//! Three sinks: a daily-rotated JSON file for all levels, a second daily
//! file filtered to errors, and colored compact text on stderr.

use anyhow::{Context, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::LevelFilter;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer};

/// Install the global subscriber. The returned guards must be held for the
/// process lifetime or buffered log lines are lost on shutdown.
pub fn init(log_dir: &Path, mode: &str) -> Result<Vec<WorkerGuard>> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Log directory is not writable: {}", log_dir.display()))?;

    let (all_writer, all_guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::daily(log_dir, "coinwire.log"));
    let (err_writer, err_guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(
        log_dir,
        "coinwire-error.log",
    ));

    let default_level = if mode == "debug" { "debug" } else { "info" };
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt::layer().json().with_writer(all_writer))
        .with(
            fmt::layer()
                .json()
                .with_writer(err_writer)
                .with_filter(LevelFilter::ERROR),
        )
        .with(
            fmt::layer()
                .compact()
                .with_ansi(true)
                .with_writer(std::io::stderr),
        )
        .init();

    Ok(vec![all_guard, err_guard])
}

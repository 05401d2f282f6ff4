//! Sets up the tracing subscriber used by the binary.

use std::{fs::OpenOptions, io, path::Path, sync::Arc};

use tracing_subscriber::{
    EnvFilter, Layer, filter, layer::SubscriberExt, util::SubscriberInitExt,
};

/// Log to stdout at the info level and to `log_file_path` at the debug level.
///
/// Setting `RUST_LOG` replaces the debug level of the log file, e.g.
/// `RUST_LOG=budget_pulse=trace`. Stdout never shows more than info.
///
/// # Errors
/// Returns an error if the log file cannot be opened or a global subscriber
/// has already been installed.
pub fn init_logging(log_file_path: &Path) -> io::Result<()> {
    let stdout_log = tracing_subscriber::fmt::layer().pretty();

    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(log_file_path)?;

    let debug_log = tracing_subscriber::fmt::layer()
        .pretty()
        .with_ansi(false)
        .with_writer(Arc::new(log_file));

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("debug"));

    tracing_subscriber::registry()
        .with(
            stdout_log
                .with_filter(filter::LevelFilter::INFO)
                .and_then(debug_log)
                .with_filter(env_filter),
        )
        .try_init()
        .map_err(io::Error::other)
}

use std::env;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn default_log_file() -> PathBuf {
    Path::new("logs").join(format!("{}.log", env!("CARGO_PKG_NAME")))
}

/// Install stdout and file logging for a harvest run. `TRACING_LEVEL` sets
/// the filter, `LOG_FILE_PATH` overrides `logs/<crate name>.log`.
///
/// Keep the returned guard alive until exit so buffered file output gets
/// flushed.
pub fn init_logger() -> WorkerGuard {
    let filter_layer =
        EnvFilter::new(env::var("TRACING_LEVEL").unwrap_or_else(|_| "info".to_string()));

    let log_file = env::var_os("LOG_FILE_PATH")
        .map(PathBuf::from)
        .unwrap_or_else(default_log_file);
    let directory = log_file
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let file_name = log_file
        .file_name()
        .map(PathBuf::from)
        .unwrap_or_else(default_log_file);

    let (non_blocking, guard) =
        tracing_appender::non_blocking(tracing_appender::rolling::never(directory, file_name));

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stdout)
                .pretty()
                .with_file(false)
                .without_time()
                .with_target(false),
        )
        .with(fmt::layer().with_writer(non_blocking).with_ansi(false))
        .with(filter_layer)
        .init();

    debug!("Logging {} to {}", env!("CARGO_PKG_NAME"), log_file.display());

    guard
}

use crate::conf::types::LoggingConfig;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

/// Target of the per-request access events.
pub const ACCESS_LOG_TARGET: &str = "outpost::access";

const ACCESS_LOG_FILE_PREFIX: &str = "access.log";

/// Initialize the logging system.
///
/// Application events are written to stdout as flattened JSON, filtered by
/// `RUST_LOG` (default "info"). When `access_log_dir` is configured, access
/// events are split off into a daily-rolling file instead.
///
/// The returned guard flushes the access log writer on drop, so keep it alive
/// for the lifetime of the process.
pub fn init_logging(cfg: &LoggingConfig) -> Option<WorkerGuard> {
    // If tokio-console is enabled, DO NOT install the normal subscriber
    if std::env::var("TOKIO_CONSOLE").is_ok() {
        console_subscriber::init();
        return None;
    }

    match &cfg.access_log_dir {
        None => {
            init_normal_logging();
            None
        }
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, ACCESS_LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);

            let app_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_filter(filter_fn(|meta| meta.target() != ACCESS_LOG_TARGET));

            let access_layer = fmt::layer()
                .json()
                .flatten_event(true)
                .with_ansi(false)
                .with_writer(writer)
                .with_filter(filter_fn(|meta| meta.target() == ACCESS_LOG_TARGET));

            tracing_subscriber::registry()
                .with(env_filter())
                .with(app_layer)
                .with(access_layer)
                .init();

            Some(guard)
        }
    }
}

fn init_normal_logging() {
    fmt()
        .with_env_filter(env_filter())
        .json()
        .flatten_event(true)
        .init();
}

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"))
}

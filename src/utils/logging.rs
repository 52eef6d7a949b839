//! Tracing setup

use once_cell::sync::OnceCell;
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const DEFAULT_FILTER: &str = "hooked_sync=info";
const LOG_FILE_PREFIX: &str = "hooked-sync.log";

static INITIALIZED: OnceCell<()> = OnceCell::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Install the global subscriber: stderr always, plus a daily-rolling file
/// under `log_dir` when given. Keep the returned guard alive for as long as
/// file output is wanted. Later calls do nothing and return `None`.
pub fn init_logging(log_dir: Option<&Path>) -> Option<WorkerGuard> {
    if INITIALIZED.set(()).is_err() {
        return None;
    }

    let stderr_layer = fmt::layer().with_writer(std::io::stderr).with_target(true);

    match log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let file_layer = fmt::layer().with_writer(writer).with_ansi(false);

            let result = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .with(file_layer)
                .try_init();
            if let Err(e) = result {
                eprintln!("Failed to install tracing subscriber: {}", e);
                return None;
            }
            Some(guard)
        }
        None => {
            if let Err(e) = tracing_subscriber::registry()
                .with(env_filter())
                .with(stderr_layer)
                .try_init()
            {
                eprintln!("Failed to install tracing subscriber: {}", e);
            }
            None
        }
    }
}

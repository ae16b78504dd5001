//! Structured Logger
//!
//! Wraps `tracing` with a human-readable console layer on stderr and, when a
//! directory is given, a JSON file layer rotated daily.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

/// Log files are named `staytime.log.YYYY-MM-DD`.
pub const LOG_FILE_PREFIX: &str = "staytime.log";

/// Filter for `level`; `RUST_LOG` wins when set. Unparseable levels fall
/// back to `info`.
pub fn level_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(level))
        .unwrap_or_else(|_| EnvFilter::new("info"))
}

/// Install the global subscriber.
///
/// Keep the returned guard alive for the life of the process; dropping it
/// flushes and stops the file writer. Calling this twice is a no-op.
pub fn init_logger<P: AsRef<Path>>(log_dir: Option<P>, level: &str) -> Option<WorkerGuard> {
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_ansi(true);

    let (file_layer, guard) = match log_dir {
        Some(dir) => {
            let appender = RollingFileAppender::new(Rotation::DAILY, dir.as_ref(), LOG_FILE_PREFIX);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .json()
                .with_writer(writer)
                .with_ansi(false)
                .boxed();
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let _ = tracing_subscriber::registry()
        .with(level_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init();

    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_filter_accepts_directives() {
        let filter = level_filter("debug,serenity=warn");
        assert!(filter.to_string().contains("debug") || std::env::var("RUST_LOG").is_ok());
    }

    #[test]
    fn test_init_writes_file() {
        let dir = std::env::temp_dir().join(format!("staytime-logs-{}", std::process::id()));
        let guard = init_logger(Some(&dir), "info");
        tracing::info!(test = true, "hello from the logger test");
        drop(guard);
        assert!(dir.exists());
        let _ = std::fs::remove_dir_all(&dir);
    }
}

//! Structured Logger
//!
//! Wraps `tracing` with a human-readable console layer and, when a log
//! directory is given, a JSON file layer rotated daily.

use std::path::Path;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// File name prefix; the appender adds the date suffix.
pub const LOG_FILE_PREFIX: &str = "pagesight.log";

/// Initialize the global logger. `RUST_LOG` overrides `level` when set.
///
/// Console output goes to stderr so commands that print JSON on stdout stay
/// machine-readable. Calling this twice is harmless; the second call is a no-op.
pub fn init_logger<P: AsRef<Path>>(log_dir: Option<P>, level: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Writes NDJSON to `<dir>/pagesight.log.YYYY-MM-DD`
    let file_layer = log_dir.map(|dir| {
        let appender = RollingFileAppender::new(Rotation::DAILY, dir.as_ref(), LOG_FILE_PREFIX);
        fmt::layer().json().with_writer(appender).with_ansi(false)
    });

    let console_layer = fmt::layer().with_writer(std::io::stderr).with_target(false).with_ansi(true);

    let _ = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn init_twice_does_not_panic() {
        let dir = tempfile::tempdir().unwrap();
        init_logger(Some(dir.path()), "debug");
        init_logger(None::<&Path>, "info");
        tracing::info!("[Test] logger ready");
    }
}

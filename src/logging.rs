//! Tracing setup: console output plus a non-blocking rolling file writer.
//!
//! Mirrors the teacher's `logging::init_logging(&AppConfig) -> WorkerGuard`
//! shape exactly — the returned guard must be held for the process lifetime
//! or the file appender's background flush thread is dropped immediately.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

use crate::config::AppConfig;

pub fn init_logging(config: &AppConfig) -> WorkerGuard {
    let file_appender = tracing_appender::rolling::daily(&config.log_dir, &config.log_file);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_new(&config.log_level).unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = fmt()
        .with_env_filter(env_filter)
        .with_writer(non_blocking)
        .with_ansi(false);

    if config.log_json {
        builder.json().init();
    } else {
        builder.init();
    }

    guard
}

//! Tracing subscriber setup.

use std::fs::File;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// Where log output ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogSink {
    File,
    Stderr,
    Disabled,
}

/// Install the global subscriber.
///
/// The log file is truncated on every start. When it cannot be opened,
/// `allow_stderr` decides between logging to stderr and no logging at all
/// (the panel owns the terminal, so it passes `false`).
pub fn init(config: &LoggingConfig, allow_stderr: bool) -> LogSink {
    let filter = || {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.level))
    };

    match File::create(&config.file) {
        Ok(file) => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
            LogSink::File
        }
        Err(_) if allow_stderr => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter())
                .with_writer(std::io::stderr)
                .try_init();
            LogSink::Stderr
        }
        Err(_) => LogSink::Disabled,
    }
}

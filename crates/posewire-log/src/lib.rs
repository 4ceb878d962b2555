//! Structured logging for posewire.
//!
//! Console output with uptime timestamps and thread names, plus an optional
//! JSON log file for post-mortem analysis of a capture session. The level
//! comes from `RUST_LOG` first, then from the config's `debug.log_level`.

use std::path::PathBuf;

use posewire_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config specify one.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written inside the log directory.
pub const LOG_FILE_NAME: &str = "posewire.log";

/// Initialize the global tracing subscriber.
///
/// Must be called at most once per process. When `config` names a log
/// directory that can be created, a JSON file layer is added next to the
/// console layer; otherwise only the console layer is installed.
///
/// ```no_run
/// use posewire_config::Config;
///
/// posewire_log::init_logging(Some(&Config::default()));
/// ```
pub fn init_logging(config: Option<&Config>) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_directive(config)));

    // The network thread is named, so thread names make the two sides obvious.
    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    let subscriber = tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer);

    if let Some(log_path) = config.and_then(log_file_path)
        && let Some(log_dir) = log_path.parent()
        && std::fs::create_dir_all(log_dir).is_ok()
        && let Ok(log_file) = std::fs::File::create(&log_path)
    {
        let file_layer = fmt::layer()
            .with_writer(log_file)
            .with_ansi(false)
            .with_target(true)
            .with_timer(fmt::time::uptime())
            .json();

        subscriber.with(file_layer).init();
        return;
    }

    subscriber.init();
}

/// Filter directive derived from config, falling back to [`DEFAULT_FILTER`].
pub fn filter_directive(config: Option<&Config>) -> String {
    match config {
        Some(config) if !config.debug.log_level.trim().is_empty() => config.debug.log_level.clone(),
        _ => DEFAULT_FILTER.to_string(),
    }
}

/// Full path of the JSON log file, if file logging is configured.
pub fn log_file_path(config: &Config) -> Option<PathBuf> {
    config
        .debug
        .log_dir
        .as_ref()
        .map(|dir| dir.join(LOG_FILE_NAME))
}

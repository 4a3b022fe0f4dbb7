//! `tracing` setup for the ragdoll tools.
//!
//! Everything goes to stderr with uptime stamps. Debug builds also write one
//! JSON object per event to [`LOG_FILE_NAME`] so a failed resolution can be
//! inspected afterwards. `RUST_LOG` takes precedence over `debug.log_level`.

use std::fs::{self, File};
use std::path::Path;

use nebula_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Filter used when neither `RUST_LOG` nor the config name a level.
pub const DEFAULT_FILTER: &str = "info";

/// Name of the JSON log file written in debug builds.
pub const LOG_FILE_NAME: &str = "nebula-ragdoll.log";

/// Installs the global subscriber. Call once, before the first event.
///
/// `log_dir` is only used when `debug_build` is set. If the directory or
/// file cannot be created the tool still logs to the console.
///
/// ```no_run
/// use nebula_config::Config;
///
/// let config = Config::default();
/// nebula_log::init_logging(Some(std::path::Path::new("logs")), cfg!(debug_assertions), Some(&config));
/// ```
pub fn init_logging(log_dir: Option<&Path>, debug_build: bool, config: Option<&Config>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(filter_string(config)));
    let registry = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_timer(fmt::time::uptime()),
    );

    match log_dir.filter(|_| debug_build).and_then(open_log_file) {
        Some(file) => registry
            .with(
                fmt::layer()
                    .json()
                    .with_writer(file)
                    .with_ansi(false)
                    .with_timer(fmt::time::uptime()),
            )
            .init(),
        None => registry.init(),
    }
}

fn open_log_file(dir: &Path) -> Option<File> {
    fs::create_dir_all(dir)
        .and_then(|()| File::create(dir.join(LOG_FILE_NAME)))
        .ok()
}

/// Filter directive for `config`, falling back to [`DEFAULT_FILTER`] when
/// the configured level is blank.
pub fn filter_string(config: Option<&Config>) -> String {
    config
        .map(|c| c.debug.log_level.trim())
        .filter(|level| !level.is_empty())
        .unwrap_or(DEFAULT_FILTER)
        .to_string()
}

pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new(DEFAULT_FILTER)
}

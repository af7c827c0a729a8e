//! File logging. The terminal belongs to the UI, so events go to a log file.

use crate::cache::CacheManager;
use crate::config::LoggingConfig;
use color_eyre::eyre::{eyre, Result};
use std::fs::OpenOptions;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing_subscriber::EnvFilter;

/// `RUST_LOG` when set, otherwise `csvboard=<level>`.
pub fn env_filter(level: &str) -> EnvFilter {
    if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::builder().from_env_lossy()
    } else {
        EnvFilter::builder().parse_lossy(format!("{}={}", crate::APP_NAME, level))
    }
}

/// Install the global subscriber, appending to the configured (or cache) log file.
/// Returns the file in use.
pub fn init_logging(config: &LoggingConfig, cache: &CacheManager) -> Result<PathBuf> {
    let path = match &config.file {
        Some(path) => path.clone(),
        None => cache.log_file()?,
    };
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .map_err(|e| eyre!("Failed to open log file {}: {}", path.display(), e))?;

    let _ = tracing_subscriber::fmt::fmt()
        .with_target(false)
        .with_ansi(false)
        .with_env_filter(env_filter(&config.level))
        .with_timer(tracing_subscriber::fmt::time::ChronoLocal::new(
            "%Y-%m-%d %H:%M:%S%.3f".to_string(),
        ))
        .with_writer(Mutex::new(file))
        .try_init();

    Ok(path)
}

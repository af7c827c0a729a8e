use color_eyre::Result;
use std::fs;
use std::path::{Path, PathBuf};

/// Default log file name inside the cache directory
pub const LOG_FILE: &str = "csvboard.log";

/// Manages the cache directory, where the log file lives by default
#[derive(Clone)]
pub struct CacheManager {
    pub(crate) cache_dir: PathBuf,
}

impl CacheManager {
    /// Create a new CacheManager for the given app name
    pub fn new(app_name: &str) -> Result<Self> {
        let cache_dir = dirs::cache_dir()
            .ok_or_else(|| color_eyre::eyre::eyre!("Could not determine cache directory"))?
            .join(app_name);

        Ok(Self { cache_dir })
    }

    /// Create a CacheManager with a custom cache directory (primarily for testing)
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Get path to a specific cache file
    pub fn cache_file(&self, filename: &str) -> PathBuf {
        self.cache_dir.join(filename)
    }

    /// Ensure the cache directory exists
    pub fn ensure_cache_dir(&self) -> Result<()> {
        if !self.cache_dir.exists() {
            fs::create_dir_all(&self.cache_dir)?;
        }
        Ok(())
    }

    /// Default log file path; creates the cache directory
    pub fn log_file(&self) -> Result<PathBuf> {
        self.ensure_cache_dir()?;
        Ok(self.cache_file(LOG_FILE))
    }

    /// Truncate the log file
    pub fn clear_log(&self) -> Result<()> {
        let path = self.cache_file(LOG_FILE);
        if path.exists() {
            fs::remove_file(&path)?;
        }
        Ok(())
    }
}

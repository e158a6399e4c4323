//! Path constants for configuration and log files.

use std::path::PathBuf;

/// Application directory name under ~/.config/ and the platform cache dir
pub const APP_DIR_NAME: &str = "mushaf-reader";

/// The name of the main configuration file
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// The name of the log file written when file logging is enabled
pub const LOG_FILE_NAME: &str = "mushaf-reader.log";

/// Get the configuration directory path (~/.config/mushaf-reader/)
#[must_use]
pub fn config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config")
        .join(APP_DIR_NAME)
}

/// Get the config file path (~/.config/mushaf-reader/config.toml)
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join(CONFIG_FILE_NAME)
}

/// Get the cache directory path, falling back to the config directory
#[must_use]
pub fn cache_dir() -> PathBuf {
    dirs::cache_dir().map_or_else(config_dir, |dir| dir.join(APP_DIR_NAME))
}

/// Get the log file path (`<cache dir>/mushaf-reader/mushaf-reader.log`)
#[must_use]
pub fn log_file_path() -> PathBuf {
    cache_dir().join(LOG_FILE_NAME)
}

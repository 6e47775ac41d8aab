//! Path utilities for promptstash data directories

use std::path::PathBuf;
use std::sync::OnceLock;

/// Resolved data directory, fixed for the lifetime of the process.
static DATA_DIR: OnceLock<PathBuf> = OnceLock::new();

/// Pin the data directory, optionally to a custom location. Call once early
/// in main(), before any other path function.
pub fn init_data_dir(custom_path: Option<PathBuf>) {
    let path = custom_path.unwrap_or_else(default_data_dir);
    if DATA_DIR.set(path.clone()).is_err() {
        tracing::debug!(path = %path.display(), "Data directory already initialized");
    }
}

fn default_data_dir() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join(".promptstash"))
        .unwrap_or_else(|| PathBuf::from(".promptstash"))
}

/// Base data directory: the pinned path, or ~/.promptstash.
pub fn data_dir() -> PathBuf {
    DATA_DIR.get().cloned().unwrap_or_else(default_data_dir)
}

/// Durable settings file (~/.promptstash/settings.json)
pub fn settings_path() -> PathBuf {
    data_dir().join("settings.json")
}

/// Volatile session state file (~/.promptstash/session.json)
///
/// Holds the encrypted token, its expiry, and the session key. The 2-hour
/// token TTL bounds how long anything in this file stays usable.
pub fn session_path() -> PathBuf {
    data_dir().join("session.json")
}

/// Logs directory (~/.promptstash/logs)
pub fn logs_dir() -> PathBuf {
    data_dir().join("logs")
}

/// Log file path (~/.promptstash/logs/promptstash.log)
pub fn log_file_path() -> PathBuf {
    logs_dir().join("promptstash.log")
}

//! Error types for prompt-store operations.

use thiserror::Error;

/// Error type shared across configuration, gateway, and registry operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Repository coordinates or credentials are missing.
    #[error("GitHub configuration is not set. Please configure your settings first.")]
    ConfigurationMissing,

    /// Non-2xx response from the GitHub API.
    #[error("GitHub API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// Write rejected because the supplied SHA no longer matches the remote file.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Input rejected before any network call was attempted.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Local file I/O failure.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON (de)serialization failure.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

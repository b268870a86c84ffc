//! Settings error types.

use thiserror::Error;

/// Errors that can occur when loading or saving settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    /// Failed to read or write a settings file.
    #[error("failed to access settings file: {0}")]
    Io(#[from] std::io::Error),
    /// Failed to parse or encode settings JSON.
    #[error("failed to parse settings JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A settings value was invalid (e.g., out of range).
    #[error("invalid settings value: {0}")]
    InvalidValue(String),
}

/// Result type for settings operations.
pub type Result<T> = std::result::Result<T, SettingsError>;

//! # Error Types
//!
//! Custom error types for Drive Shaper using `thiserror`.

use thiserror::Error;

/// Main error type for Drive Shaper
#[derive(Debug, Error)]
pub enum DriveShaperError {
    /// Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    /// Gamepad errors (open, read, disconnect)
    #[error("Gamepad error: {0}")]
    Gamepad(String),

    /// No usable gamepad was found
    #[error("No gamepad found exposing the configured axes")]
    GamepadNotFound,

    /// Telemetry sink errors
    #[error("Telemetry error: {0}")]
    Telemetry(String),

    /// JSON encoding errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for Drive Shaper
pub type Result<T> = std::result::Result<T, DriveShaperError>;

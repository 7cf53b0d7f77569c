//! Error types for the Fitbot service.

use thiserror::Error;

/// Main error type for Fitbot operations.
#[derive(Error, Debug)]
pub enum FitbotError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input (unknown sport, goal, fitness level)
    #[error("{0}")]
    InvalidRequest(String),

    /// Profile store failures
    #[error("Store error: {0}")]
    Store(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<config::ConfigError> for FitbotError {
    fn from(err: config::ConfigError) -> Self {
        FitbotError::Config(err.to_string())
    }
}

/// Result type alias for Fitbot operations.
pub type Result<T> = std::result::Result<T, FitbotError>;

//! Error types for jobwatch

use thiserror::Error;

/// Result type alias using jobwatch's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for jobwatch operations
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// HTTP transport error talking to the platform
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The platform API answered with an error
    #[error("Platform API error ({status}): {message}")]
    Platform {
        /// HTTP status code
        status: u16,
        /// Error type and message from the response body
        message: String,
    },

    /// Authentication error
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// A bounded operation ran out of time
    #[error("Timed out after {after:?}: {operation}")]
    Timeout {
        /// What was being waited on
        operation: String,
        /// The limit that expired
        after: std::time::Duration,
    },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl Error {
    /// Create a validation error
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a config error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an authentication error
    pub fn auth(msg: impl Into<String>) -> Self {
        Self::Auth(msg.into())
    }
}

impl From<config::ConfigError> for Error {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

//! Common error types for ECGX

use thiserror::Error;

/// Common result type for ECGX setup operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised while loading configuration or initializing logging
#[derive(Error, Debug)]
pub enum Error {
    /// Config file or log file I/O failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or command-line value
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

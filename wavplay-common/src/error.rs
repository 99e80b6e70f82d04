//! Common error types for wavplay

use thiserror::Error;

/// Common result type for wavplay operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by every wavplay front end
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

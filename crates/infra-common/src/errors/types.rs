use thiserror::Error;

/// Result alias for infrastructure operations
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by shared infrastructure
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Anything else
    #[error("Internal error: {0}")]
    Internal(String),
}

//! Error types for the signaling relay

use std::io;
use thiserror::Error;

/// Result alias for relay operations
pub type Result<T> = std::result::Result<T, SignalingError>;

/// Errors raised while configuring or running the relay
#[derive(Error, Debug)]
pub enum SignalingError {
    /// Configuration could not be loaded
    #[error("Failed to load configuration: {0}")]
    ConfigLoad(#[from] config::ConfigError),

    /// A configuration value is unusable
    #[error("Invalid configuration for {field}: {message}")]
    Config { field: &'static str, message: String },

    /// The listener could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    /// The HTTP server stopped with an error
    #[error("Server error: {0}")]
    Serve(#[source] io::Error),

    /// A client sent something that is not a relay message
    #[error("Protocol error: {0}")]
    Protocol(String),
}

impl SignalingError {
    pub(crate) fn config(field: &'static str, message: impl Into<String>) -> Self {
        Self::Config {
            field,
            message: message.into(),
        }
    }
}

//! Error types for call-core

use thiserror::Error;

use crate::types::CallStatus;

/// Result type for call-core operations
pub type ShopCallResult<T> = Result<T, ShopCallError>;

/// Failures reported by a microphone capture adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MediaError {
    /// The user or platform refused microphone access
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// No capture device is available
    #[error("no audio input device found")]
    NoDevice,

    /// Any other capture failure
    #[error("capture failed: {0}")]
    Capture(String),
}

/// Failures reported by the signaling transport
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Could not reach or lost the signaling relay
    #[error("signaling connection failed: {0}")]
    Connection(String),

    /// The remote peer id is not connected to the relay
    #[error("peer unavailable: {0}")]
    PeerUnavailable(String),

    /// Media negotiation or delivery failed
    #[error("media call failed: {0}")]
    Media(String),

    /// Sending on the data channel failed
    #[error("data channel send failed: {0}")]
    Send(String),
}

/// Failures reported by the identity provider adapter
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum IdentityError {
    /// The SDK could not be loaded or initialised
    #[error("identity provider initialization failed: {0}")]
    InitializationFailed(String),

    /// Signed in, but no profile could be produced
    #[error("profile unavailable: {0}")]
    ProfileUnavailable(String),

    /// The sign-in redirect could not be started
    #[error("sign-in failed: {0}")]
    SignIn(String),
}

/// Configuration loading and validation failures
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A source could not be read or parsed
    #[error("failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    /// A value is out of range or malformed
    #[error("invalid configuration value for {field}: {message}")]
    Invalid {
        /// Offending field
        field: &'static str,
        /// What is wrong with it
        message: String,
    },
}

impl ConfigError {
    /// Create an invalid-value error
    pub fn invalid(field: &'static str, message: impl Into<String>) -> Self {
        Self::Invalid {
            field,
            message: message.into(),
        }
    }
}

/// Top-level error for call-core
///
/// Capture and transport failures during an attempt are not errors here:
/// they end the attempt in `Failed` with a [`crate::FailureReason`].
#[derive(Debug, Error)]
pub enum ShopCallError {
    /// Configuration could not be loaded or is invalid
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// `start()` while an attempt is already underway
    #[error("A call attempt is already in progress (status {status})")]
    CallInProgress {
        /// Status at the time of the rejected call
        status: CallStatus,
    },

    /// `start()` before the signaling transport is open
    #[error("Signaling transport is not ready")]
    TransportNotReady,
}

impl ShopCallError {
    /// Create a call-in-progress rejection
    pub fn in_progress(status: CallStatus) -> Self {
        Self::CallInProgress { status }
    }

    /// Whether this error rejected a `start()` without changing state
    pub fn is_rejection(&self) -> bool {
        matches!(self, Self::CallInProgress { .. } | Self::TransportNotReady)
    }
}

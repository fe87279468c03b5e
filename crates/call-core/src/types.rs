//! Core data types for customer-to-shop calls
//!
//! - **UserProfile** - the signed-in caller, as produced by the identity adapter
//! - **CallStatus** - the six-valued call lifecycle status
//! - **FailureReason** - why an attempt ended in `Failed`
//! - **DataMessage** - messages sent over the auxiliary data channel
//! - **CallSnapshot** - an atomic view of status and last error for observers

use serde::{Deserialize, Serialize};
use std::fmt;

/// Profile of the signed-in caller
///
/// Serialized in the camelCase shape the shop side expects inside a
/// `CLIENT_PROFILE` message.
///
/// ```rust
/// use shopcall_call_core::UserProfile;
///
/// let profile = UserProfile::new("U123", "Somchai");
/// let json = serde_json::to_value(&profile).unwrap();
/// assert_eq!(json["userId"], "U123");
/// assert_eq!(json["displayName"], "Somchai");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Opaque identifier assigned by the identity provider
    pub user_id: String,
    /// Name shown to the shop
    pub display_name: String,
    /// Avatar URL, if the provider has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub picture_url: Option<String>,
    /// Free-form status line, if set
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status_message: Option<String>,
}

impl UserProfile {
    /// Create a profile with only the required fields
    pub fn new(user_id: impl Into<String>, display_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            display_name: display_name.into(),
            picture_url: None,
            status_message: None,
        }
    }

    /// Attach a picture URL
    pub fn with_picture_url(mut self, url: impl Into<String>) -> Self {
        self.picture_url = Some(url.into());
        self
    }

    /// Attach a status message
    pub fn with_status_message(mut self, message: impl Into<String>) -> Self {
        self.status_message = Some(message.into());
        self
    }
}

/// Status of the outbound call
///
/// Exactly one value is active at a time. The controller moves between them
/// according to [`CallStatus::can_transition_to`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CallStatus {
    /// No call in progress
    Idle,
    /// Microphone requested, waiting for capture
    Connecting,
    /// Call request sent to the shop, waiting for its audio
    Ringing,
    /// Remote audio is playing
    Connected,
    /// Attempt failed; see the accompanying reason
    Failed,
    /// Reserved for presentation layers that want to show a hang-up screen.
    /// The controller itself always returns to `Idle`.
    Ended,
}

impl CallStatus {
    /// Whether an attempt is underway (capture, ringing or connected)
    pub fn is_active(&self) -> bool {
        matches!(self, CallStatus::Connecting | CallStatus::Ringing | CallStatus::Connected)
    }

    /// Whether `start()` may begin a fresh attempt from this status
    pub fn can_start(&self) -> bool {
        matches!(self, CallStatus::Idle | CallStatus::Failed | CallStatus::Ended)
    }

    /// Transition table of the call lifecycle
    pub fn can_transition_to(&self, next: CallStatus) -> bool {
        use CallStatus::*;
        match (self, next) {
            (Idle | Failed | Ended, Connecting) => true,
            // Relay failure with no call in progress
            (Idle | Ended, Failed) => true,
            (Connecting, Ringing | Failed | Idle) => true,
            (Ringing, Connected | Failed | Idle) => true,
            (Connected, Failed | Idle) => true,
            (Failed | Ended, Idle) => true,
            _ => false,
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CallStatus::Idle => "IDLE",
            CallStatus::Connecting => "CONNECTING",
            CallStatus::Ringing => "RINGING",
            CallStatus::Connected => "CONNECTED",
            CallStatus::Failed => "FAILED",
            CallStatus::Ended => "ENDED",
        };
        f.write_str(s)
    }
}

/// Reason an attempt ended in [`CallStatus::Failed`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FailureReason {
    /// Microphone permission was refused or no capture device exists
    MediaAcquisitionDenied(String),
    /// Signaling or media call failure
    TransportError(String),
}

impl FailureReason {
    /// Stable identifier of the failure kind
    pub fn kind(&self) -> &'static str {
        match self {
            FailureReason::MediaAcquisitionDenied(_) => "MediaAcquisitionDenied",
            FailureReason::TransportError(_) => "TransportError",
        }
    }

    /// Human-readable reason surfaced through `last_error`
    pub fn message(&self) -> String {
        match self {
            FailureReason::MediaAcquisitionDenied(detail) => {
                format!("Microphone access denied or error occurred: {}", detail)
            }
            FailureReason::TransportError(detail) => format!("Connection error: {}", detail),
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message())
    }
}

/// Messages carried on the auxiliary data channel
///
/// ```rust
/// use shopcall_call_core::{DataMessage, UserProfile};
///
/// let msg = DataMessage::client_profile(UserProfile::new("U1", "Ann"));
/// let json = serde_json::to_value(&msg).unwrap();
/// assert_eq!(json["type"], "CLIENT_PROFILE");
/// assert_eq!(json["profile"]["userId"], "U1");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum DataMessage {
    /// Caller identity, sent once when the channel opens
    #[serde(rename = "CLIENT_PROFILE")]
    ClientProfile {
        /// The caller
        profile: UserProfile,
    },
}

impl DataMessage {
    /// Build a `CLIENT_PROFILE` message
    pub fn client_profile(profile: UserProfile) -> Self {
        DataMessage::ClientProfile { profile }
    }

    /// Encode as the JSON text the data channel transmits
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Point-in-time view of the controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallSnapshot {
    /// Current status
    pub status: CallStatus,
    /// Reason of the most recent failure, cleared when a new attempt starts
    pub last_error: Option<String>,
    /// Kind and detail of the same failure
    pub failure: Option<FailureReason>,
    /// Number of the current (or most recent) attempt; 0 before the first
    pub attempt: u64,
}

impl Default for CallSnapshot {
    fn default() -> Self {
        Self {
            status: CallStatus::Idle,
            last_error: None,
            failure: None,
            attempt: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [CallStatus; 6] = [
        CallStatus::Idle,
        CallStatus::Connecting,
        CallStatus::Ringing,
        CallStatus::Connected,
        CallStatus::Failed,
        CallStatus::Ended,
    ];

    #[test]
    fn test_connected_only_reachable_from_ringing() {
        for from in ALL {
            let allowed = from.can_transition_to(CallStatus::Connected);
            assert_eq!(allowed, from == CallStatus::Ringing, "{} -> CONNECTED", from);
        }
    }

    #[test]
    fn test_every_state_can_reach_idle_except_idle() {
        for from in ALL {
            assert_eq!(from.can_transition_to(CallStatus::Idle), from != CallStatus::Idle);
        }
    }

    #[test]
    fn test_failed_reachable_without_call() {
        assert!(CallStatus::Idle.can_transition_to(CallStatus::Failed));
        assert!(!CallStatus::Failed.can_transition_to(CallStatus::Failed));
        assert!(CallStatus::Ringing.is_active());
        assert!(!CallStatus::Idle.is_active());
        assert!(!CallStatus::Failed.is_active());
    }

    #[test]
    fn test_start_allowed_states() {
        assert!(CallStatus::Idle.can_start());
        assert!(CallStatus::Failed.can_start());
        assert!(!CallStatus::Connecting.can_start());
        assert!(!CallStatus::Ringing.can_start());
        assert!(!CallStatus::Connected.can_start());
    }

    #[test]
    fn test_profile_optional_fields_omitted() {
        let json = serde_json::to_string(&UserProfile::new("U1", "Ann")).unwrap();
        assert!(!json.contains("pictureUrl"));
        assert!(!json.contains("statusMessage"));

        let full = UserProfile::new("U1", "Ann")
            .with_picture_url("https://example.com/a.png")
            .with_status_message("hi");
        let value = serde_json::to_value(&full).unwrap();
        assert_eq!(value["pictureUrl"], "https://example.com/a.png");
        assert_eq!(value["statusMessage"], "hi");
    }

    #[test]
    fn test_data_message_wire_shape() {
        let text = DataMessage::client_profile(UserProfile::new("U9", "Nok")).to_json().unwrap();
        let parsed: DataMessage = serde_json::from_str(
            r#"{"type":"CLIENT_PROFILE","profile":{"userId":"U9","displayName":"Nok"}}"#,
        )
        .unwrap();
        assert_eq!(serde_json::from_str::<DataMessage>(&text).unwrap(), parsed);
    }

    #[test]
    fn test_failure_reason_messages_non_empty() {
        let denied = FailureReason::MediaAcquisitionDenied("permission denied".into());
        assert_eq!(denied.kind(), "MediaAcquisitionDenied");
        assert!(denied.message().contains("permission denied"));

        let transport = FailureReason::TransportError("peer-unavailable".into());
        assert_eq!(transport.kind(), "TransportError");
        assert_eq!(transport.to_string(), "Connection error: peer-unavailable");
    }

    #[test]
    fn test_status_serializes_upper_case() {
        assert_eq!(serde_json::to_string(&CallStatus::Ringing).unwrap(), "\"RINGING\"");
        assert_eq!(CallStatus::Connected.to_string(), "CONNECTED");
    }
}

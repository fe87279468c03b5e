//! PeerJS relay wire messages
//!
//! Every frame is a JSON object with a `type` tag. Peers address each other
//! with `dst`; the relay stamps `src` before forwarding so a client can
//! never impersonate another id.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::SignalingError;

/// Relay message kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MessageType {
    #[serde(rename = "OPEN")]
    Open,
    #[serde(rename = "LEAVE")]
    Leave,
    #[serde(rename = "CANDIDATE")]
    Candidate,
    #[serde(rename = "OFFER")]
    Offer,
    #[serde(rename = "ANSWER")]
    Answer,
    #[serde(rename = "EXPIRE")]
    Expire,
    #[serde(rename = "HEARTBEAT")]
    Heartbeat,
    #[serde(rename = "ID-TAKEN")]
    IdTaken,
    #[serde(rename = "ERROR")]
    Error,
}

impl MessageType {
    /// Whether clients may address this kind to another peer
    pub fn is_relayed(self) -> bool {
        matches!(
            self,
            MessageType::Leave
                | MessageType::Candidate
                | MessageType::Offer
                | MessageType::Answer
                | MessageType::Expire
        )
    }

    /// Whether an undeliverable message of this kind is kept for later
    pub fn is_queued(self) -> bool {
        self.is_relayed() && !matches!(self, MessageType::Leave | MessageType::Expire)
    }
}

/// One relay frame
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelayMessage {
    #[serde(rename = "type")]
    pub kind: MessageType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub src: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dst: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub payload: Option<Value>,
}

impl RelayMessage {
    fn bare(kind: MessageType) -> Self {
        Self {
            kind,
            src: None,
            dst: None,
            payload: None,
        }
    }

    /// Registration accepted
    pub fn open() -> Self {
        Self::bare(MessageType::Open)
    }

    /// Requested id belongs to another client
    pub fn id_taken() -> Self {
        Self {
            payload: Some(json!({ "msg": "ID is taken" })),
            ..Self::bare(MessageType::IdTaken)
        }
    }

    /// Error notice shown by the client library
    pub fn error(msg: impl Into<String>) -> Self {
        Self {
            payload: Some(json!({ "msg": msg.into() })),
            ..Self::bare(MessageType::Error)
        }
    }

    /// Tell `sender` that its message to `unreachable` was never delivered
    pub fn expire(unreachable: impl Into<String>, sender: impl Into<String>) -> Self {
        Self {
            src: Some(unreachable.into()),
            dst: Some(sender.into()),
            ..Self::bare(MessageType::Expire)
        }
    }

    pub fn parse(text: &str) -> Result<Self, SignalingError> {
        serde_json::from_str(text).map_err(|e| SignalingError::Protocol(e.to_string()))
    }

    pub fn to_json(&self) -> Result<String, SignalingError> {
        serde_json::to_string(self).map_err(|e| SignalingError::Protocol(e.to_string()))
    }
}

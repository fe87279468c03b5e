//! Peer-signaling transport seam
//!
//! Each outbound handle comes paired with its own event receiver. Dropping
//! the receiver is the unsubscription: once the controller lets go of it,
//! nothing the transport emits for that handle reaches the controller.
//!
//! Errors that belong to the relay connection rather than to one call
//! (remote peer offline, network loss, server error) are broadcast through
//! [`SignalingTransport::subscribe_errors`].

use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};

use super::media::{LocalAudioStream, RemoteAudioStream};
use crate::error::TransportError;

/// Events raised for an outbound media call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaCallEvent {
    /// The remote peer answered and its audio is available
    Stream(RemoteAudioStream),
    /// The remote peer (or the transport) closed the call
    Close,
    /// The call failed
    Error(TransportError),
}

/// Events raised for an outbound data channel
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataChannelEvent {
    /// The channel is ready to send
    Open,
    /// The channel was closed
    Close,
    /// The channel failed
    Error(TransportError),
}

/// Handle to an outbound media call
pub trait MediaCallHandle: Send + Sync {
    /// Remote peer id
    fn peer_id(&self) -> &str;

    /// Hang up. Must be idempotent.
    fn close(&self);
}

/// Handle to an outbound data channel
pub trait DataChannelHandle: Send + Sync {
    /// Remote peer id
    fn peer_id(&self) -> &str;

    /// Send a text payload
    fn send(&self, payload: &str) -> Result<(), TransportError>;

    /// Close the channel. Must be idempotent.
    fn close(&self);
}

/// A media call handle and its event subscription
pub struct MediaCall {
    /// Control handle
    pub handle: Box<dyn MediaCallHandle>,
    /// Events for this call only
    pub events: mpsc::UnboundedReceiver<MediaCallEvent>,
}

/// A data channel handle and its event subscription
pub struct DataChannel {
    /// Control handle
    pub handle: Box<dyn DataChannelHandle>,
    /// Events for this channel only
    pub events: mpsc::UnboundedReceiver<DataChannelEvent>,
}

/// Client of the hosted peer-signaling relay
///
/// NAT traversal, relay selection and ICE are the transport's business.
#[async_trait]
pub trait SignalingTransport: Send + Sync {
    /// Whether the relay has registered this client (an id was assigned)
    fn is_open(&self) -> bool {
        true
    }

    /// Relay-level errors, reported whether or not a call is in progress
    fn subscribe_errors(&self) -> broadcast::Receiver<TransportError>;

    /// Open the auxiliary data channel to `remote_peer_id`
    async fn open_data_channel(&self, remote_peer_id: &str) -> Result<DataChannel, TransportError>;

    /// Place an audio call to `remote_peer_id`, sending `local_audio`
    async fn connect(
        &self,
        remote_peer_id: &str,
        local_audio: Arc<dyn LocalAudioStream>,
    ) -> Result<MediaCall, TransportError>;
}

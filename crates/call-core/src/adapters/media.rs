//! Local capture and remote playback seams

use async_trait::async_trait;
use std::fmt;
use std::sync::Arc;

use crate::error::MediaError;

/// A captured local microphone stream
pub trait LocalAudioStream: Send + Sync + fmt::Debug {
    /// Platform identifier of the stream
    fn id(&self) -> &str;

    /// Stop every track of the stream. Must be idempotent.
    fn stop(&self);

    /// Number of tracks still live
    fn active_tracks(&self) -> usize;
}

/// Microphone access
#[async_trait]
pub trait AudioCapture: Send + Sync {
    /// Request an audio-only capture stream. May prompt the user.
    async fn acquire(&self) -> Result<Arc<dyn LocalAudioStream>, MediaError>;
}

/// Audio received from the remote peer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteAudioStream {
    /// Platform identifier of the stream
    pub id: String,
    /// Peer that sent it
    pub peer_id: String,
}

impl RemoteAudioStream {
    /// Create a stream descriptor
    pub fn new(id: impl Into<String>, peer_id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            peer_id: peer_id.into(),
        }
    }
}

/// Output for remote audio
pub trait AudioPlayback: Send + Sync {
    /// Route the stream to the speaker and start playing
    fn attach(&self, stream: RemoteAudioStream);

    /// Stop playback and release the attached stream
    fn detach(&self);
}

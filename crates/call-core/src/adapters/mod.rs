//! Capabilities the call controller and bootstrap flow depend on
//!
//! Everything platform-specific sits behind one of these traits: the login
//! SDK, microphone capture, remote audio playback, the peer-signaling
//! transport and speech synthesis. Production builds plug in platform
//! bindings; tests plug in channel-driven doubles.

pub mod identity;
pub mod media;
pub mod signaling;
pub mod speech;

use std::sync::Arc;

pub use identity::IdentityProvider;
pub use media::{AudioCapture, AudioPlayback, LocalAudioStream, RemoteAudioStream};
pub use signaling::{
    DataChannel, DataChannelEvent, DataChannelHandle, MediaCall, MediaCallEvent, MediaCallHandle,
    SignalingTransport,
};
pub use speech::{NoopSpeech, SpeechSynthesizer, Utterance};

/// The set of adapters a [`crate::CallSessionController`] drives
#[derive(Clone)]
pub struct CallAdapters {
    /// Microphone capture
    pub capture: Arc<dyn AudioCapture>,
    /// Peer-signaling transport
    pub transport: Arc<dyn SignalingTransport>,
    /// Remote audio output
    pub playback: Arc<dyn AudioPlayback>,
    /// Greeting voice
    pub speech: Arc<dyn SpeechSynthesizer>,
}

impl CallAdapters {
    /// Bundle adapters; speech defaults to [`NoopSpeech`]
    pub fn new(
        capture: Arc<dyn AudioCapture>,
        transport: Arc<dyn SignalingTransport>,
        playback: Arc<dyn AudioPlayback>,
    ) -> Self {
        Self {
            capture,
            transport,
            playback,
            speech: Arc::new(NoopSpeech),
        }
    }

    /// Use a specific speech synthesizer for the greeting
    pub fn with_speech(mut self, speech: Arc<dyn SpeechSynthesizer>) -> Self {
        self.speech = speech;
        self
    }
}

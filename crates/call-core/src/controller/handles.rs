//! Per-attempt resources owned by the controller

use std::sync::Arc;
use tokio::task::JoinHandle;

use crate::adapters::{CallAdapters, DataChannelHandle, LocalAudioStream, MediaCallHandle};

/// Everything one call attempt holds on to.
///
/// Created empty at `start()`, filled as the attempt progresses, and taken
/// out wholesale when the attempt ends so it can be released without the
/// state lock held.
#[derive(Default)]
pub(crate) struct SessionHandles {
    pub local_audio: Option<Arc<dyn LocalAudioStream>>,
    pub media_call: Option<Box<dyn MediaCallHandle>>,
    pub data_channel: Option<Arc<dyn DataChannelHandle>>,
    pub pump: Option<JoinHandle<()>>,
    pub playback_attached: bool,
    pub profile_sent: bool,
}

impl SessionHandles {
    pub fn is_empty(&self) -> bool {
        self.local_audio.is_none()
            && self.media_call.is_none()
            && self.data_channel.is_none()
            && self.pump.is_none()
            && !self.playback_attached
    }

    /// Stop and close everything. Each step is idempotent on the adapter side.
    pub fn release(self, adapters: &CallAdapters) {
        // Unsubscribe first so nothing fires into a half-released attempt
        if let Some(pump) = self.pump {
            pump.abort();
        }
        if let Some(call) = self.media_call {
            tracing::debug!("Closing media call to {}", call.peer_id());
            call.close();
        }
        if let Some(channel) = self.data_channel {
            channel.close();
        }
        if let Some(stream) = self.local_audio {
            tracing::debug!("Stopping local audio stream {}", stream.id());
            stream.stop();
        }
        if self.playback_attached {
            adapters.playback.detach();
        }
        adapters.speech.cancel();
    }
}

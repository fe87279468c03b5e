//! Tasks forwarding transport events into the controller

use std::sync::Weak;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::warn;

use super::Inner;
use crate::adapters::{DataChannelEvent, MediaCallEvent};
use crate::error::TransportError;

/// Spawn the pump for `attempt`. Aborting the returned handle unsubscribes
/// from both event streams.
pub(super) fn spawn(
    inner: Weak<Inner>,
    attempt: u64,
    media_events: mpsc::UnboundedReceiver<MediaCallEvent>,
    data_events: Option<mpsc::UnboundedReceiver<DataChannelEvent>>,
) -> JoinHandle<()> {
    tokio::spawn(run(inner, attempt, media_events, data_events))
}

async fn run(
    inner: Weak<Inner>,
    attempt: u64,
    mut media_events: mpsc::UnboundedReceiver<MediaCallEvent>,
    mut data_events: Option<mpsc::UnboundedReceiver<DataChannelEvent>>,
) {
    loop {
        tokio::select! {
            event = media_events.recv() => {
                let Some(inner) = inner.upgrade() else { break };
                match event {
                    Some(event) => inner.on_media_event(attempt, event),
                    None => {
                        // Transport dropped the call without a close event
                        tracing::debug!("Media call events ended for attempt {}", attempt);
                        inner.on_media_event(attempt, MediaCallEvent::Close);
                        break;
                    }
                }
            }
            event = next_data_event(&mut data_events) => {
                let Some(inner) = inner.upgrade() else { break };
                match event {
                    Some(event) => inner.on_data_event(attempt, event),
                    None => data_events = None,
                }
            }
        }
    }
}

async fn next_data_event(
    events: &mut Option<mpsc::UnboundedReceiver<DataChannelEvent>>,
) -> Option<DataChannelEvent> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

/// Spawn the controller-lifetime listener for relay-level errors
pub(super) fn spawn_relay_listener(
    inner: Weak<Inner>,
    mut errors: broadcast::Receiver<TransportError>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        loop {
            match errors.recv().await {
                Ok(error) => {
                    let Some(inner) = inner.upgrade() else { break };
                    inner.on_relay_error(error);
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!("Missed {} signaling errors", skipped);
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    })
}

//! Call Session Controller
//!
//! Drives one outbound call at a time from the customer to the fixed shop
//! peer and owns the [`CallStatus`] state machine.
//!
//! ```text
//!            start()              capture ok             remote stream
//!   Idle ───────────► Connecting ───────────► Ringing ───────────────► Connected
//!    ▲  ▲                 │                     │  │                     │  │
//!    │  │ end()/close     │ capture denied      │  │ transport error     │  │
//!    │  └─────────────────┼─────────────────────┘  ▼                     │  │
//!    │                    └──────────────────► Failed ◄──────────────────┘  │
//!    │                                           │ start() → Connecting     │
//!    └───────────────────────────────────────────┴──────────── end()/close ─┘
//! ```
//!
//! # Concurrency
//!
//! All state sits behind one lock that is never held across an `.await`.
//! Every attempt gets a number and a cancellation token; `end()` cancels the
//! token, so a `start()` suspended on microphone permission or on the
//! transport gives up at its next step, and transport events tagged with a
//! superseded attempt are dropped.
//!
//! Relay-level errors from [`SignalingTransport::subscribe_errors`] are
//! watched for the controller's whole lifetime. They fail the live attempt,
//! and move an idle controller to `Failed` so the reason is shown.
//!
//! [`SignalingTransport::subscribe_errors`]: crate::adapters::SignalingTransport::subscribe_errors
//!
//! Adapter callbacks made on a transition (attaching playback, speaking the
//! greeting) run while the lock is held and must not call back into the
//! controller.
//!
//! # Example
//!
//! ```rust,no_run
//! use shopcall_call_core::{CallAdapters, CallSessionController, ShopCallConfig, UserProfile};
//!
//! async fn call_shop(adapters: CallAdapters) -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ShopCallConfig::default();
//!     let controller = CallSessionController::new(
//!         UserProfile::new("U123", "Somchai"),
//!         &config,
//!         adapters,
//!     );
//!
//!     let mut status = controller.watch();
//!     controller.start().await?;
//!     status.changed().await?;
//!     println!("Call status: {}", status.borrow().status);
//!
//!     controller.end();
//!     Ok(())
//! }
//! ```

mod handles;
mod pump;

use parking_lot::Mutex;
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::adapters::{
    CallAdapters, DataChannelEvent, DataChannelHandle, MediaCallEvent, RemoteAudioStream, Utterance,
};
use crate::config::ShopCallConfig;
use crate::error::{ShopCallError, ShopCallResult, TransportError};
use crate::events::{CallEvent, EventEmitter};
use crate::types::{CallSnapshot, CallStatus, DataMessage, FailureReason, UserProfile};

use handles::SessionHandles;

/// Mutable controller state, guarded by a single lock
struct SessionState {
    status: CallStatus,
    failure: Option<FailureReason>,
    attempt: u64,
    greeted: bool,
    cancel: Option<CancellationToken>,
    handles: SessionHandles,
}

impl SessionState {
    fn snapshot(&self) -> CallSnapshot {
        CallSnapshot {
            status: self.status,
            last_error: self.failure.as_ref().map(FailureReason::message),
            failure: self.failure.clone(),
            attempt: self.attempt,
        }
    }

    /// Whether `attempt` is still the live one and in one of `statuses`
    fn is_live(&self, attempt: u64, statuses: &[CallStatus]) -> bool {
        self.attempt == attempt && statuses.contains(&self.status)
    }
}

pub(crate) struct Inner {
    remote_peer_id: String,
    profile: UserProfile,
    greeting: Utterance,
    adapters: CallAdapters,
    state: Mutex<SessionState>,
    events: EventEmitter,
    relay_listener: Mutex<Option<JoinHandle<()>>>,
}

/// Controller for a single customer-to-shop call
///
/// Not `Clone`: share it behind an `Arc`. Dropping it ends any call in
/// progress.
pub struct CallSessionController {
    inner: Arc<Inner>,
}

impl CallSessionController {
    /// Create a controller ringing `config.admin_peer_id` on behalf of `profile`
    pub fn new(profile: UserProfile, config: &ShopCallConfig, adapters: CallAdapters) -> Self {
        Self::with_remote_peer(profile, config.admin_peer_id.clone(), config.greeting.utterance(), adapters)
    }

    /// Create a controller for an explicit remote peer and greeting
    pub fn with_remote_peer(
        profile: UserProfile,
        remote_peer_id: impl Into<String>,
        greeting: Utterance,
        adapters: CallAdapters,
    ) -> Self {
        let inner = Inner {
            remote_peer_id: remote_peer_id.into(),
            profile,
            greeting,
            adapters,
            state: Mutex::new(SessionState {
                status: CallStatus::Idle,
                failure: None,
                attempt: 0,
                greeted: false,
                cancel: None,
                handles: SessionHandles::default(),
            }),
            events: EventEmitter::default(),
            relay_listener: Mutex::new(None),
        };
        let inner = Arc::new(inner);
        // Outside a runtime the listener starts with the first `start()`
        if Handle::try_current().is_ok() {
            Inner::ensure_relay_listener(&inner);
        }
        Self { inner }
    }

    /// Current status
    pub fn status(&self) -> CallStatus {
        self.inner.state.lock().status
    }

    /// Reason of the most recent failure, if the last attempt failed
    pub fn last_error(&self) -> Option<String> {
        self.inner.state.lock().failure.as_ref().map(FailureReason::message)
    }

    /// Kind and detail of the most recent failure
    pub fn last_failure(&self) -> Option<FailureReason> {
        self.inner.state.lock().failure.clone()
    }

    /// Status, last error and attempt number read atomically
    pub fn snapshot(&self) -> CallSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Subscribe to call events
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.inner.events.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.inner.events.watch()
    }

    /// Peer this controller calls
    pub fn remote_peer_id(&self) -> &str {
        &self.inner.remote_peer_id
    }

    /// Caller profile sent to the shop
    pub fn profile(&self) -> &UserProfile {
        &self.inner.profile
    }

    /// Whether any per-attempt resource (audio, call, channel, playback) is held
    pub fn holds_resources(&self) -> bool {
        !self.inner.state.lock().handles.is_empty()
    }

    /// Begin a call attempt.
    ///
    /// Requests the microphone, opens the profile data channel and places
    /// the media call, leaving the controller in `Ringing`. Failures are not
    /// returned: they land the controller in `Failed` with `last_error` set.
    ///
    /// # Errors
    ///
    /// * `ShopCallError::CallInProgress` - an attempt is already underway
    /// * `ShopCallError::TransportNotReady` - the relay has not registered us yet
    ///
    /// Both leave the status untouched.
    pub async fn start(&self) -> ShopCallResult<()> {
        let inner = &self.inner;
        Inner::ensure_relay_listener(inner);

        let (attempt, token) = {
            let mut state = inner.state.lock();
            if !state.status.can_start() {
                debug!("Rejecting start while {}", state.status);
                return Err(ShopCallError::in_progress(state.status));
            }
            if !inner.adapters.transport.is_open() {
                debug!("Rejecting start: signaling transport not open");
                return Err(ShopCallError::TransportNotReady);
            }
            let token = CancellationToken::new();
            state.attempt += 1;
            state.greeted = false;
            state.cancel = Some(token.clone());
            state.handles = SessionHandles::default();
            inner.transition(&mut state, CallStatus::Connecting, None);
            (state.attempt, token)
        };

        // 1. Microphone
        let captured = tokio::select! {
            biased;
            _ = token.cancelled() => {
                debug!("Attempt {} abandoned while waiting for the microphone", attempt);
                return Ok(());
            }
            result = inner.adapters.capture.acquire() => result,
        };

        let local_audio = match captured {
            Ok(stream) => stream,
            Err(e) => {
                warn!("Failed to get local stream: {}", e);
                inner.fail(attempt, FailureReason::MediaAcquisitionDenied(e.to_string()));
                return Ok(());
            }
        };

        {
            let mut state = inner.state.lock();
            if !state.is_live(attempt, &[CallStatus::Connecting]) {
                drop(state);
                debug!("Attempt {} ended before capture completed, stopping stream", attempt);
                local_audio.stop();
                return Ok(());
            }
            state.handles.local_audio = Some(local_audio.clone());
        }

        // 2. Profile data channel, best effort
        let opened = tokio::select! {
            biased;
            _ = token.cancelled() => return Ok(()),
            result = inner.adapters.transport.open_data_channel(&inner.remote_peer_id) => result,
        };
        let data_channel = match opened {
            Ok(channel) => Some(channel),
            Err(e) => {
                warn!("Could not open data channel to {}: {}", inner.remote_peer_id, e);
                None
            }
        };

        // 3. Media call
        let connected = tokio::select! {
            biased;
            _ = token.cancelled() => {
                if let Some(channel) = data_channel {
                    channel.handle.close();
                }
                return Ok(());
            }
            result = inner.adapters.transport.connect(&inner.remote_peer_id, local_audio) => result,
        };

        let media_call = match connected {
            Ok(call) => call,
            Err(e) => {
                if let Some(channel) = data_channel {
                    channel.handle.close();
                }
                warn!("Call to {} failed: {}", inner.remote_peer_id, e);
                inner.fail(attempt, FailureReason::TransportError(e.to_string()));
                return Ok(());
            }
        };

        // 4. Ringing
        let mut state = inner.state.lock();
        if !state.is_live(attempt, &[CallStatus::Connecting]) {
            drop(state);
            debug!("Attempt {} ended before the call was placed, hanging up", attempt);
            media_call.handle.close();
            if let Some(channel) = data_channel {
                channel.handle.close();
            }
            return Ok(());
        }

        let (data_handle, data_events) = match data_channel {
            Some(channel) => (Some(Arc::<dyn DataChannelHandle>::from(channel.handle)), Some(channel.events)),
            None => (None, None),
        };
        state.handles.media_call = Some(media_call.handle);
        state.handles.data_channel = data_handle;
        state.handles.pump = Some(pump::spawn(Arc::downgrade(inner), attempt, media_call.events, data_events));
        inner.transition(&mut state, CallStatus::Ringing, None);
        info!("Calling {} (attempt {})", inner.remote_peer_id, attempt);
        Ok(())
    }

    /// End the call.
    ///
    /// Abandons any in-flight capture or connection, stops local audio,
    /// cancels the greeting, hangs up and returns to `Idle`. Every resource
    /// is released by the time this returns. A no-op when already `Idle`.
    pub fn end(&self) {
        self.inner.end_attempt(None);
    }
}

impl Drop for CallSessionController {
    fn drop(&mut self) {
        self.inner.end_attempt(None);
        if let Some(listener) = self.inner.relay_listener.lock().take() {
            listener.abort();
        }
    }
}

impl Inner {
    /// Subscribe to relay-level transport errors once per controller
    fn ensure_relay_listener(inner: &Arc<Inner>) {
        let mut listener = inner.relay_listener.lock();
        if listener.is_none() {
            let errors = inner.adapters.transport.subscribe_errors();
            *listener = Some(pump::spawn_relay_listener(Arc::downgrade(inner), errors));
        }
    }

    /// Relay-level failure (shop offline, network, server error). Fails the
    /// live attempt; while idle the failure is still surfaced.
    fn on_relay_error(&self, error: TransportError) {
        let reason = FailureReason::TransportError(error.to_string());
        let mut state = self.state.lock();
        let status = state.status;
        match status {
            _ if status.is_active() => {
                let attempt = state.attempt;
                drop(state);
                warn!("Signaling error during attempt {}: {}", attempt, error);
                self.fail(attempt, reason);
            }
            CallStatus::Idle | CallStatus::Ended => {
                warn!("Signaling error while idle: {}", error);
                self.transition(&mut state, CallStatus::Failed, Some(reason));
            }
            _ => debug!("Signaling error while already failed: {}", error),
        }
    }

    /// Apply a transition if the table allows it, publishing it to observers
    fn transition(&self, state: &mut SessionState, next: CallStatus, reason: Option<FailureReason>) -> bool {
        let previous = state.status;
        if !previous.can_transition_to(next) {
            warn!("Ignoring invalid call transition {} -> {}", previous, next);
            return false;
        }

        state.status = next;
        match (&reason, next) {
            (Some(reason), _) => state.failure = Some(reason.clone()),
            (None, CallStatus::Connecting) => state.failure = None,
            _ => {}
        }

        info!("Call status {} -> {} (attempt {})", previous, next, state.attempt);
        self.events.publish(state.snapshot());
        self.events.emit(CallEvent::StatusChanged {
            attempt: state.attempt,
            previous,
            current: next,
            reason,
        });
        true
    }

    /// End the live attempt in `Failed` and release its handles
    fn fail(&self, attempt: u64, reason: FailureReason) {
        let released = {
            let mut state = self.state.lock();
            if !state.is_live(attempt, &[CallStatus::Connecting, CallStatus::Ringing, CallStatus::Connected]) {
                debug!("Dropping {} for superseded attempt {}", reason.kind(), attempt);
                return;
            }
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            let handles = std::mem::take(&mut state.handles);
            self.transition(&mut state, CallStatus::Failed, Some(reason));
            handles
        };
        released.release(&self.adapters);
    }

    /// Return to `Idle`, releasing everything. With `Some(attempt)` only acts
    /// if that attempt is still live (remote close); with `None` always acts
    /// (local `end()`).
    fn end_attempt(&self, attempt: Option<u64>) {
        let released = {
            let mut state = self.state.lock();
            if state.status == CallStatus::Idle {
                return;
            }
            if let Some(attempt) = attempt {
                if !state.is_live(attempt, &[CallStatus::Ringing, CallStatus::Connected]) {
                    debug!("Ignoring close for superseded attempt {}", attempt);
                    return;
                }
            }
            if let Some(token) = state.cancel.take() {
                token.cancel();
            }
            let handles = std::mem::take(&mut state.handles);
            self.transition(&mut state, CallStatus::Idle, None);
            handles
        };
        released.release(&self.adapters);
    }

    fn on_media_event(&self, attempt: u64, event: MediaCallEvent) {
        match event {
            MediaCallEvent::Stream(remote) => self.on_remote_stream(attempt, remote),
            MediaCallEvent::Close => {
                info!("Remote peer closed the call (attempt {})", attempt);
                self.end_attempt(Some(attempt));
            }
            MediaCallEvent::Error(e) => {
                warn!("Call error: {}", e);
                self.fail(attempt, FailureReason::TransportError(e.to_string()));
            }
        }
    }

    fn on_remote_stream(&self, attempt: u64, remote: RemoteAudioStream) {
        let mut state = self.state.lock();
        if !state.is_live(attempt, &[CallStatus::Ringing, CallStatus::Connected]) {
            debug!("Discarding remote stream {} for abandoned attempt {}", remote.id, attempt);
            return;
        }

        if state.status == CallStatus::Ringing && !self.transition(&mut state, CallStatus::Connected, None) {
            return;
        }

        self.adapters.playback.attach(remote);
        state.handles.playback_attached = true;

        if !state.greeted {
            state.greeted = true;
            self.adapters.speech.speak(&self.greeting);
            self.events.emit(CallEvent::GreetingSpoken { attempt });
        }
    }

    fn on_data_event(&self, attempt: u64, event: DataChannelEvent) {
        match event {
            DataChannelEvent::Open => self.send_profile(attempt),
            DataChannelEvent::Close => {
                let mut state = self.state.lock();
                if state.attempt == attempt {
                    if let Some(channel) = state.handles.data_channel.take() {
                        channel.close();
                    }
                }
            }
            DataChannelEvent::Error(e) => {
                warn!("Data channel error (attempt {}): {}", attempt, e);
            }
        }
    }

    fn send_profile(&self, attempt: u64) {
        let channel = {
            let mut state = self.state.lock();
            if !state.is_live(attempt, &[CallStatus::Ringing, CallStatus::Connected]) || state.handles.profile_sent {
                return;
            }
            let Some(channel) = state.handles.data_channel.clone() else {
                return;
            };
            state.handles.profile_sent = true;
            channel
        };

        let payload = match DataMessage::client_profile(self.profile.clone()).to_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!("Could not encode profile message: {}", e);
                return;
            }
        };

        match channel.send(&payload) {
            Ok(()) => {
                debug!("Sent profile of {} to {}", self.profile.user_id, channel.peer_id());
                self.events.emit(CallEvent::ProfileSent { attempt });
            }
            Err(e) => warn!("Failed to send profile (call continues): {}", e),
        }
    }
}

//! Channel-driven adapter doubles shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch, Notify};

use shopcall_call_core::adapters::{
    AudioCapture, AudioPlayback, DataChannel, DataChannelEvent, DataChannelHandle, IdentityProvider,
    LocalAudioStream, MediaCall, MediaCallEvent, MediaCallHandle, RemoteAudioStream, SignalingTransport,
    SpeechSynthesizer, Utterance,
};
use shopcall_call_core::{
    CallAdapters, CallSessionController, CallSnapshot, CallStatus, IdentityError, MediaError,
    ShopCallConfig, TransportError, UserProfile,
};

pub const SHOP_PEER: &str = "shop-admin-001";

// ===== MICROPHONE =====

#[derive(Debug)]
pub struct MockAudioStream {
    id: String,
    live_tracks: AtomicUsize,
}

impl MockAudioStream {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            live_tracks: AtomicUsize::new(1),
        }
    }
}

impl LocalAudioStream for MockAudioStream {
    fn id(&self) -> &str {
        &self.id
    }

    fn stop(&self) {
        self.live_tracks.store(0, Ordering::SeqCst);
    }

    fn active_tracks(&self) -> usize {
        self.live_tracks.load(Ordering::SeqCst)
    }
}

pub enum CaptureMode {
    Grant,
    Deny(MediaError),
    /// Grant only after the notify fires
    Gated(Arc<Notify>),
}

pub struct MockCapture {
    mode: Mutex<CaptureMode>,
    pub requests: AtomicUsize,
    pub granted: Mutex<Vec<Arc<MockAudioStream>>>,
}

impl MockCapture {
    pub fn new(mode: CaptureMode) -> Self {
        Self {
            mode: Mutex::new(mode),
            requests: AtomicUsize::new(0),
            granted: Mutex::new(Vec::new()),
        }
    }

    pub fn set_mode(&self, mode: CaptureMode) {
        *self.mode.lock() = mode;
    }

    pub fn last_stream(&self) -> Arc<MockAudioStream> {
        self.granted.lock().last().cloned().expect("no stream granted")
    }

    fn grant(&self) -> Arc<dyn LocalAudioStream> {
        let mut granted = self.granted.lock();
        let stream = Arc::new(MockAudioStream::new(format!("mic-{}", granted.len() + 1)));
        granted.push(stream.clone());
        stream
    }
}

#[async_trait]
impl AudioCapture for MockCapture {
    async fn acquire(&self) -> Result<Arc<dyn LocalAudioStream>, MediaError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        let gate = {
            match &*self.mode.lock() {
                CaptureMode::Grant => None,
                CaptureMode::Deny(e) => return Err(e.clone()),
                CaptureMode::Gated(notify) => Some(notify.clone()),
            }
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }
        Ok(self.grant())
    }
}

// ===== SIGNALING =====

pub struct CallRecord {
    pub peer_id: String,
    pub local_audio_id: String,
    pub closed: AtomicBool,
    events: mpsc::UnboundedSender<MediaCallEvent>,
}

impl CallRecord {
    /// Deliver an event; returns false once the controller unsubscribed
    pub fn emit(&self, event: MediaCallEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockMediaCall(Arc<CallRecord>);

impl MediaCallHandle for MockMediaCall {
    fn peer_id(&self) -> &str {
        &self.0.peer_id
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

pub struct ChannelRecord {
    pub peer_id: String,
    pub closed: AtomicBool,
    pub sent: Mutex<Vec<String>>,
    pub fail_send: AtomicBool,
    events: mpsc::UnboundedSender<DataChannelEvent>,
}

impl ChannelRecord {
    pub fn emit(&self, event: DataChannelEvent) -> bool {
        self.events.send(event).is_ok()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

struct MockDataChannel(Arc<ChannelRecord>);

impl DataChannelHandle for MockDataChannel {
    fn peer_id(&self) -> &str {
        &self.0.peer_id
    }

    fn send(&self, payload: &str) -> Result<(), TransportError> {
        if self.0.fail_send.load(Ordering::SeqCst) {
            return Err(TransportError::Send("channel not writable".to_string()));
        }
        self.0.sent.lock().push(payload.to_string());
        Ok(())
    }

    fn close(&self) {
        self.0.closed.store(true, Ordering::SeqCst);
    }
}

pub struct MockTransport {
    pub open: AtomicBool,
    pub fail_connect: Mutex<Option<TransportError>>,
    pub fail_data_channel: Mutex<Option<TransportError>>,
    pub fail_send: AtomicBool,
    pub calls: Mutex<Vec<Arc<CallRecord>>>,
    pub channels: Mutex<Vec<Arc<ChannelRecord>>>,
    relay_errors: broadcast::Sender<TransportError>,
}

impl MockTransport {
    pub fn new() -> Self {
        Self {
            open: AtomicBool::new(true),
            fail_connect: Mutex::new(None),
            fail_data_channel: Mutex::new(None),
            fail_send: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
            channels: Mutex::new(Vec::new()),
            relay_errors: broadcast::channel(16).0,
        }
    }

    /// Report an error on the relay connection itself
    pub fn relay_error(&self, error: TransportError) -> bool {
        self.relay_errors.send(error).is_ok()
    }

    pub fn call(&self, index: usize) -> Arc<CallRecord> {
        self.calls.lock()[index].clone()
    }

    pub fn last_call(&self) -> Arc<CallRecord> {
        self.calls.lock().last().cloned().expect("no call placed")
    }

    pub fn last_channel(&self) -> Arc<ChannelRecord> {
        self.channels.lock().last().cloned().expect("no data channel opened")
    }
}

#[async_trait]
impl SignalingTransport for MockTransport {
    fn is_open(&self) -> bool {
        self.open.load(Ordering::SeqCst)
    }

    fn subscribe_errors(&self) -> broadcast::Receiver<TransportError> {
        self.relay_errors.subscribe()
    }

    async fn open_data_channel(&self, remote_peer_id: &str) -> Result<DataChannel, TransportError> {
        if let Some(e) = self.fail_data_channel.lock().clone() {
            return Err(e);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let record = Arc::new(ChannelRecord {
            peer_id: remote_peer_id.to_string(),
            closed: AtomicBool::new(false),
            sent: Mutex::new(Vec::new()),
            fail_send: AtomicBool::new(self.fail_send.load(Ordering::SeqCst)),
            events: tx,
        });
        self.channels.lock().push(record.clone());
        Ok(DataChannel {
            handle: Box::new(MockDataChannel(record)),
            events: rx,
        })
    }

    async fn connect(
        &self,
        remote_peer_id: &str,
        local_audio: Arc<dyn LocalAudioStream>,
    ) -> Result<MediaCall, TransportError> {
        if let Some(e) = self.fail_connect.lock().clone() {
            return Err(e);
        }
        let (tx, rx) = mpsc::unbounded_channel();
        let record = Arc::new(CallRecord {
            peer_id: remote_peer_id.to_string(),
            local_audio_id: local_audio.id().to_string(),
            closed: AtomicBool::new(false),
            events: tx,
        });
        self.calls.lock().push(record.clone());
        Ok(MediaCall {
            handle: Box::new(MockMediaCall(record)),
            events: rx,
        })
    }
}

// ===== PLAYBACK & SPEECH =====

#[derive(Default)]
pub struct MockPlayback {
    pub attached: Mutex<Option<RemoteAudioStream>>,
    pub attach_count: AtomicUsize,
}

impl AudioPlayback for MockPlayback {
    fn attach(&self, stream: RemoteAudioStream) {
        self.attach_count.fetch_add(1, Ordering::SeqCst);
        *self.attached.lock() = Some(stream);
    }

    fn detach(&self) {
        *self.attached.lock() = None;
    }
}

#[derive(Default)]
pub struct MockSpeech {
    pub spoken: Mutex<Vec<Utterance>>,
    pub cancels: AtomicUsize,
}

impl MockSpeech {
    pub fn spoken_count(&self) -> usize {
        self.spoken.lock().len()
    }
}

impl SpeechSynthesizer for MockSpeech {
    fn speak(&self, utterance: &Utterance) {
        self.spoken.lock().push(utterance.clone());
    }

    fn cancel(&self) {
        self.cancels.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== IDENTITY =====

pub struct MockIdentity {
    pub init_ok: bool,
    pub authenticated: bool,
    pub profile: Result<Option<UserProfile>, IdentityError>,
    pub sign_in_result: Result<(), IdentityError>,
    pub sign_in_calls: AtomicUsize,
    pub sign_out_calls: AtomicUsize,
}

impl MockIdentity {
    pub fn signed_in(profile: UserProfile) -> Self {
        Self {
            init_ok: true,
            authenticated: true,
            profile: Ok(Some(profile)),
            sign_in_result: Ok(()),
            sign_in_calls: AtomicUsize::new(0),
            sign_out_calls: AtomicUsize::new(0),
        }
    }
}

#[async_trait]
impl IdentityProvider for MockIdentity {
    async fn initialize(&self) -> bool {
        self.init_ok
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }

    async fn sign_in(&self) -> Result<(), IdentityError> {
        self.sign_in_calls.fetch_add(1, Ordering::SeqCst);
        self.sign_in_result.clone()
    }

    async fn current_user(&self) -> Result<Option<UserProfile>, IdentityError> {
        self.profile.clone()
    }

    async fn sign_out(&self) {
        self.sign_out_calls.fetch_add(1, Ordering::SeqCst);
    }
}

// ===== HARNESS =====

pub fn customer() -> UserProfile {
    UserProfile::new("U4af4980629", "Somchai").with_picture_url("https://profile.example.com/u.png")
}

pub struct Harness {
    pub controller: Arc<CallSessionController>,
    pub capture: Arc<MockCapture>,
    pub transport: Arc<MockTransport>,
    pub playback: Arc<MockPlayback>,
    pub speech: Arc<MockSpeech>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_capture(CaptureMode::Grant)
    }

    pub fn with_capture(mode: CaptureMode) -> Self {
        let capture = Arc::new(MockCapture::new(mode));
        let transport = Arc::new(MockTransport::new());
        let playback = Arc::new(MockPlayback::default());
        let speech = Arc::new(MockSpeech::default());

        let adapters = CallAdapters::new(capture.clone(), transport.clone(), playback.clone())
            .with_speech(speech.clone());
        let controller = Arc::new(CallSessionController::new(customer(), &ShopCallConfig::default(), adapters));

        Self {
            controller,
            capture,
            transport,
            playback,
            speech,
        }
    }

    /// Start and expect to reach Ringing
    pub async fn ring(&self) {
        self.controller.start().await.expect("start rejected");
        assert_eq!(self.controller.status(), CallStatus::Ringing);
    }

    /// Ring, then deliver the shop's audio and wait for Connected
    pub async fn connect(&self) {
        self.ring().await;
        let mut rx = self.controller.watch();
        assert!(self.transport.last_call().emit(MediaCallEvent::Stream(shop_stream())));
        wait_for_status(&mut rx, CallStatus::Connected).await;
    }
}

pub fn shop_stream() -> RemoteAudioStream {
    RemoteAudioStream::new("remote-audio-1", SHOP_PEER)
}

/// Wait (bounded) until the watched snapshot reaches `status`
pub async fn wait_for_status(rx: &mut watch::Receiver<CallSnapshot>, status: CallStatus) -> CallSnapshot {
    let snapshot = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.status == status))
        .await
        .unwrap_or_else(|_| panic!("timed out waiting for {}", status))
        .expect("controller dropped");
    snapshot.clone()
}

/// Give spawned tasks a chance to run
pub async fn settle() {
    tokio::time::sleep(Duration::from_millis(50)).await;
}

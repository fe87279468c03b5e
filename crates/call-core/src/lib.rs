//! # ShopCall call-core
//!
//! Customer-to-shop voice calling: a signed-in customer presses a button and
//! is put through to a fixed shop peer over WebRTC, via a hosted signaling
//! relay.
//!
//! The crate owns the call lifecycle and nothing platform-specific. The
//! login SDK, microphone, speaker, signaling transport and speech synthesis
//! are all reached through the traits in [`adapters`].
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────────┐
//! │   IdentityProvider   │────►│       ShopCallApp        │  bootstrap()
//! └──────────────────────┘     └────────────┬─────────────┘
//!                                           │ UserProfile
//!                              ┌────────────▼─────────────┐
//!                              │  CallSessionController   │  start() / end()
//!                              └──┬─────────┬─────────┬───┘
//!                   AudioCapture  │  SignalingTransport │  AudioPlayback, Speech
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shopcall_call_core::{AppState, CallAdapters, ShopCallApp, ShopCallConfig};
//! use shopcall_call_core::adapters::IdentityProvider;
//! use std::sync::Arc;
//!
//! async fn run(identity: Arc<dyn IdentityProvider>, adapters: CallAdapters) {
//!     let app = ShopCallApp::new(ShopCallConfig::default(), identity);
//!     if let AppState::Ready(profile) = app.bootstrap().await {
//!         let controller = app.controller(profile, adapters);
//!         let _ = controller.start().await;
//!     }
//! }
//! ```

pub mod adapters;
pub mod app;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod types;

pub use adapters::CallAdapters;
pub use app::{AppError, AppState, ShopCallApp};
pub use config::{GreetingConfig, PeerServerConfig, ShopCallConfig};
pub use controller::CallSessionController;
pub use error::{ConfigError, IdentityError, MediaError, ShopCallError, ShopCallResult, TransportError};
pub use events::{CallEvent, EventEmitter};
pub use types::{CallSnapshot, CallStatus, DataMessage, FailureReason, UserProfile};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

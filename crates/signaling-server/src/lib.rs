//! # ShopCall signaling relay
//!
//! PeerJS-compatible relay the call widget and the shop console register
//! with. It only brokers offers, answers and ICE candidates between peers;
//! audio never passes through it.
//!
//! ```rust,no_run
//! use shopcall_signaling_server::{SignalingServer, SignalingServerConfig};
//!
//! # async fn run() -> shopcall_signaling_server::Result<()> {
//! let server = SignalingServer::new(SignalingServerConfig::default());
//! server.run(async { let _ = tokio::signal::ctrl_c().await; }).await
//! # }
//! ```

pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod routes;
pub mod server;
pub mod ws;

pub use config::SignalingServerConfig;
pub use error::{Result, SignalingError};
pub use protocol::{MessageType, RelayMessage};
pub use registry::{Delivery, PeerRegistry, Registration, RelayEvent, RelayLimits};
pub use routes::{create_router, RelayState};
pub use server::SignalingServer;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

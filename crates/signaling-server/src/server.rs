//! Listener, sweeper and graceful shutdown

use axum::Router;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::SignalingServerConfig;
use crate::error::{Result, SignalingError};
use crate::registry::PeerRegistry;
use crate::routes::{create_router, RelayState};

/// The relay process
pub struct SignalingServer {
    state: RelayState,
}

impl SignalingServer {
    pub fn new(config: SignalingServerConfig) -> Self {
        Self {
            state: RelayState::new(config),
        }
    }

    pub fn config(&self) -> &SignalingServerConfig {
        &self.state.config
    }

    pub fn registry(&self) -> Arc<PeerRegistry> {
        self.state.registry.clone()
    }

    pub fn router(&self) -> Router {
        create_router(self.state.clone())
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.state.config.bind_addr();
        TcpListener::bind(&addr)
            .await
            .map_err(|source| SignalingError::Bind { addr, source })
    }

    /// Bind and serve until `shutdown` resolves
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    pub async fn serve<F>(self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let local: Option<SocketAddr> = listener.local_addr().ok();
        info!(
            "Signaling server listening on {:?}, relay mounted at {}",
            local, self.state.config.path
        );

        let sweeper = spawn_sweeper(self.registry(), self.state.config.sweep_interval());
        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;
        sweeper.abort();

        info!("Signaling server stopped");
        result.map_err(SignalingError::Serve)
    }
}

/// Periodically expire queued messages and drop silent clients
pub fn spawn_sweeper(registry: Arc<PeerRegistry>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            let report = registry.prune(Instant::now());
            if report.expired > 0 || !report.disconnected.is_empty() {
                debug!(
                    "Sweep expired {} messages, disconnected {:?}",
                    report.expired, report.disconnected
                );
            }
        }
    })
}

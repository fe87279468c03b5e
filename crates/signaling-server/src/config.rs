//! Relay configuration
//!
//! Values come from defaults, an optional TOML file, `SHOPCALL_SIGNALING__*`
//! environment variables and finally the bare `PORT` variable most hosting
//! platforms inject. Command-line flags are applied on top by the binary.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{Result, SignalingError};

/// Environment prefix for relay settings
pub const ENV_PREFIX: &str = "SHOPCALL_SIGNALING";

/// Relay server configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalingServerConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// Mount path of the relay endpoints
    pub path: String,
    /// Key clients must present
    pub key: String,
    /// Frontend build served as the fallback; `None` disables static files
    pub static_dir: Option<PathBuf>,
    /// Seconds of silence before a client is dropped
    pub alive_timeout_secs: u64,
    /// Seconds an undelivered message waits before the sender gets EXPIRE
    pub expire_timeout_secs: u64,
    /// Maximum simultaneously registered clients
    pub concurrent_limit: usize,
    /// Whether `GET {path}/{key}/peers` lists connected ids
    pub allow_discovery: bool,
}

impl Default for SignalingServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 9000,
            path: "/peerjs".to_string(),
            key: "peerjs".to_string(),
            static_dir: Some(PathBuf::from("dist")),
            alive_timeout_secs: 60,
            expire_timeout_secs: 5,
            concurrent_limit: 5000,
            allow_discovery: false,
        }
    }
}

impl SignalingServerConfig {
    /// Load from environment only
    pub fn from_env() -> Result<Self> {
        Self::load(None)
    }

    /// Load from an optional file, the environment and `PORT`
    pub fn load(file: Option<&Path>) -> Result<Self> {
        let mut builder = config::Config::builder();
        if let Some(path) = file {
            builder = builder.add_source(config::File::from(path).required(false));
        }
        builder = builder.add_source(
            config::Environment::with_prefix(ENV_PREFIX)
                .prefix_separator("__")
                .separator("__")
                .try_parsing(true),
        );

        let mut loaded: SignalingServerConfig = builder.build()?.try_deserialize()?;
        if let Ok(port) = std::env::var("PORT") {
            loaded.port = port
                .parse()
                .map_err(|_| SignalingError::config("port", format!("PORT is not a port number: {}", port)))?;
        }
        loaded.validate()?;
        Ok(loaded)
    }

    /// Address to bind, as `host:port`
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Mount path without a trailing slash; empty when mounted at the root
    pub fn mount_path(&self) -> &str {
        self.path.trim_end_matches('/')
    }

    pub fn alive_timeout(&self) -> Duration {
        Duration::from_secs(self.alive_timeout_secs)
    }

    pub fn expire_timeout(&self) -> Duration {
        Duration::from_secs(self.expire_timeout_secs)
    }

    /// How often the sweeper looks for expired messages and silent clients
    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.expire_timeout_secs.clamp(1, 5))
    }

    pub fn validate(&self) -> Result<()> {
        if !self.path.starts_with('/') {
            return Err(SignalingError::config("path", "must start with '/'"));
        }
        if self.key.is_empty() {
            return Err(SignalingError::config("key", "must not be empty"));
        }
        if self.alive_timeout_secs == 0 {
            return Err(SignalingError::config("alive_timeout_secs", "must be positive"));
        }
        if self.concurrent_limit == 0 {
            return Err(SignalingError::config("concurrent_limit", "must be positive"));
        }
        Ok(())
    }
}

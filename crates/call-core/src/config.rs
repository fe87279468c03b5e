//! Static configuration for the call widget
//!
//! Everything here is fixed at startup: which identity app to initialise,
//! which shop peer to ring, where the signaling relay lives and what the
//! greeting says. Values come from defaults, an optional TOML file and
//! `SHOPCALL__*` environment variables, in increasing priority.
//!
//! ```rust
//! use shopcall_call_core::ShopCallConfig;
//!
//! let config = ShopCallConfig::default();
//! assert_eq!(config.admin_peer_id, "shop-admin-001");
//! assert_eq!(config.peer_server.path, "/peerjs");
//! config.validate().unwrap();
//! ```

use serde::{Deserialize, Serialize};
use std::path::Path;
use url::Url;

use crate::adapters::Utterance;
use crate::error::ConfigError;

/// Thai greeting the shop plays when the call connects
pub const SHOP_GREETING_TEXT: &str =
    "ร้าน ABC สวัสดีครับ กำลังต่อสายไปยังเจ้าหน้าที่ กรุณารอสักครู่ครับ";

/// Peer id of the shop/admin endpoint that receives calls
pub const DEFAULT_ADMIN_PEER_ID: &str = "shop-admin-001";

/// Prefix for environment overrides (`SHOPCALL__PEER_SERVER__PORT=9000`)
pub const ENV_PREFIX: &str = "SHOPCALL";

/// Connection parameters for the signaling relay
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PeerServerConfig {
    /// Relay host name
    pub host: String,
    /// Relay port
    pub port: u16,
    /// Mount path of the relay on the host
    pub path: String,
    /// Use TLS (`https`/`wss`)
    pub secure: bool,
    /// Client-side transport log verbosity (0-3)
    pub debug: u8,
}

impl Default for PeerServerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 443,
            path: "/peerjs".to_string(),
            secure: true,
            debug: 2,
        }
    }
}

impl PeerServerConfig {
    /// Settings for a relay on the local machine without TLS
    pub fn local(port: u16) -> Self {
        Self {
            host: "localhost".to_string(),
            port,
            secure: false,
            ..Default::default()
        }
    }

    fn mount(&self) -> String {
        let trimmed = self.path.trim_end_matches('/');
        format!("{}/", trimmed)
    }

    /// HTTP base URL of the relay mount, with a trailing slash
    pub fn base_url(&self) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "https" } else { "http" };
        let raw = format!("{}://{}:{}{}", scheme, self.host, self.port, self.mount());
        Url::parse(&raw).map_err(|e| ConfigError::invalid("peer_server", e.to_string()))
    }

    /// WebSocket URL a client opens to register as `id`
    pub fn websocket_url(&self, key: &str, id: &str, token: &str) -> Result<Url, ConfigError> {
        let scheme = if self.secure { "wss" } else { "ws" };
        let raw = format!("{}://{}:{}{}peerjs", scheme, self.host, self.port, self.mount());
        let mut url = Url::parse(&raw).map_err(|e| ConfigError::invalid("peer_server", e.to_string()))?;
        url.query_pairs_mut()
            .append_pair("key", key)
            .append_pair("id", id)
            .append_pair("token", token);
        Ok(url)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.host.trim().is_empty() {
            return Err(ConfigError::invalid("peer_server.host", "must not be empty"));
        }
        if self.port == 0 {
            return Err(ConfigError::invalid("peer_server.port", "must not be zero"));
        }
        if !self.path.starts_with('/') {
            return Err(ConfigError::invalid("peer_server.path", "must start with '/'"));
        }
        if self.debug > 3 {
            return Err(ConfigError::invalid("peer_server.debug", "must be between 0 and 3"));
        }
        Ok(())
    }
}

/// Greeting spoken once the shop's audio arrives
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GreetingConfig {
    /// Text to speak
    pub text: String,
    /// Language tag for the synthesizer
    pub lang: String,
    /// Speaking rate
    pub rate: f32,
}

impl Default for GreetingConfig {
    fn default() -> Self {
        Self {
            text: SHOP_GREETING_TEXT.to_string(),
            lang: "th-TH".to_string(),
            rate: 0.9,
        }
    }
}

impl GreetingConfig {
    /// Build the utterance handed to the synthesizer
    pub fn utterance(&self) -> Utterance {
        Utterance {
            text: self.text.clone(),
            lang: self.lang.clone(),
            rate: self.rate,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShopCallConfig {
    /// App id registered with the identity provider
    pub identity_app_id: String,
    /// Fixed peer id of the shop endpoint
    pub admin_peer_id: String,
    /// Signaling relay connection
    pub peer_server: PeerServerConfig,
    /// Automated greeting
    pub greeting: GreetingConfig,
}

impl Default for ShopCallConfig {
    fn default() -> Self {
        Self {
            identity_app_id: String::new(),
            admin_peer_id: DEFAULT_ADMIN_PEER_ID.to_string(),
            peer_server: PeerServerConfig::default(),
            greeting: GreetingConfig::default(),
        }
    }
}

impl ShopCallConfig {
    /// Load from environment only
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Load defaults, then `file` (if given and present), then environment
    pub fn load(file: Option<&Path>) -> Result<Self, ConfigError> {
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

        let loaded: ShopCallConfig = builder.build()?.try_deserialize()?;
        loaded.validate()?;
        Ok(loaded)
    }

    /// Set the shop peer id
    pub fn with_admin_peer_id(mut self, peer_id: impl Into<String>) -> Self {
        self.admin_peer_id = peer_id.into();
        self
    }

    /// Set the relay connection
    pub fn with_peer_server(mut self, peer_server: PeerServerConfig) -> Self {
        self.peer_server = peer_server;
        self
    }

    /// Set the greeting
    pub fn with_greeting(mut self, greeting: GreetingConfig) -> Self {
        self.greeting = greeting;
        self
    }

    /// Check values that would otherwise fail late
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.admin_peer_id.trim().is_empty() {
            return Err(ConfigError::invalid("admin_peer_id", "must not be empty"));
        }
        if !(self.greeting.rate > 0.0 && self.greeting.rate <= 10.0) {
            return Err(ConfigError::invalid(
                "greeting.rate",
                format!("{} is outside (0, 10]", self.greeting.rate),
            ));
        }
        self.peer_server.validate()
    }
}

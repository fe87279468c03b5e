//! Connected peers and undelivered messages
//!
//! Each registered id owns an outbound channel drained by its websocket
//! task. Dropping a client's entry drops that sender, which closes the
//! socket; the sweeper relies on this to disconnect silent clients.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::{broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::config::SignalingServerConfig;
use crate::protocol::RelayMessage;

/// Outbound half of a client connection
pub type ClientSender = mpsc::UnboundedSender<RelayMessage>;

/// Peer presence changes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RelayEvent {
    PeerConnected { id: String },
    PeerDisconnected { id: String },
}

/// Outcome of [`PeerRegistry::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Registration {
    /// Registered; `connection` identifies this socket for unregistering
    Accepted { connection: u64 },
    /// Another client holds the id under a different token
    IdTaken,
    /// `concurrent_limit` clients are already registered
    LimitReached,
}

/// Outcome of [`PeerRegistry::route`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Delivered,
    Queued,
    Dropped,
}

/// What a sweep removed
#[derive(Debug, Default, PartialEq, Eq)]
pub struct PruneReport {
    /// Queued messages given up on
    pub expired: usize,
    /// Clients dropped for silence
    pub disconnected: Vec<String>,
}

/// Timeouts and limits the registry enforces
#[derive(Debug, Clone, Copy)]
pub struct RelayLimits {
    pub alive_timeout: Duration,
    pub expire_timeout: Duration,
    pub concurrent_limit: usize,
}

impl From<&SignalingServerConfig> for RelayLimits {
    fn from(config: &SignalingServerConfig) -> Self {
        Self {
            alive_timeout: config.alive_timeout(),
            expire_timeout: config.expire_timeout(),
            concurrent_limit: config.concurrent_limit,
        }
    }
}

struct ClientEntry {
    token: String,
    connection: u64,
    sender: ClientSender,
    last_seen: Instant,
}

struct QueuedMessage {
    message: RelayMessage,
    queued_at: Instant,
}

/// Registry of connected peers
pub struct PeerRegistry {
    limits: RelayLimits,
    clients: DashMap<String, ClientEntry>,
    /// Undelivered messages keyed by destination id
    queue: Mutex<HashMap<String, Vec<QueuedMessage>>>,
    next_connection: AtomicU64,
    /// Slots taken against `concurrent_limit`
    registered: AtomicUsize,
    events: broadcast::Sender<RelayEvent>,
}

impl PeerRegistry {
    pub fn new(limits: RelayLimits) -> Self {
        let (events, _) = broadcast::channel(256);
        Self {
            limits,
            clients: DashMap::new(),
            queue: Mutex::new(HashMap::new()),
            next_connection: AtomicU64::new(0),
            registered: AtomicUsize::new(0),
            events,
        }
    }

    pub fn limits(&self) -> RelayLimits {
        self.limits
    }

    /// Subscribe to connect/disconnect notifications
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.events.subscribe()
    }

    /// Register `id`, send OPEN and flush anything queued for it.
    ///
    /// A client reconnecting with the token it registered under takes over
    /// the id; the previous socket is closed.
    pub fn register(&self, id: &str, token: &str, sender: ClientSender) -> Registration {
        let connection = self.next_connection.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = ClientEntry {
            token: token.to_string(),
            connection,
            sender: sender.clone(),
            last_seen: Instant::now(),
        };

        match self.clients.entry(id.to_string()) {
            Entry::Occupied(mut occupied) => {
                if occupied.get().token != token {
                    warn!("Rejected registration for {}: id is taken", id);
                    return Registration::IdTaken;
                }
                debug!("Peer {} reconnected, replacing previous socket", id);
                occupied.insert(entry);
            }
            Entry::Vacant(vacant) => {
                if !self.reserve_slot() {
                    warn!("Rejected registration for {}: concurrent limit reached", id);
                    return Registration::LimitReached;
                }
                vacant.insert(entry);
            }
        }

        let _ = sender.send(RelayMessage::open());
        let pending = self.queue.lock().remove(id).unwrap_or_default();
        if !pending.is_empty() {
            debug!("Flushing {} queued messages to {}", pending.len(), id);
        }
        for queued in pending {
            let _ = sender.send(queued.message);
        }

        info!("Peer connected: {}", id);
        let _ = self.events.send(RelayEvent::PeerConnected { id: id.to_string() });
        Registration::Accepted { connection }
    }

    /// Take a slot unless `concurrent_limit` are in use
    fn reserve_slot(&self) -> bool {
        let limit = self.limits.concurrent_limit;
        self.registered
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |n| (n < limit).then_some(n + 1))
            .is_ok()
    }

    fn release_slot(&self) {
        self.registered.fetch_sub(1, Ordering::AcqRel);
    }

    /// Remove `id` if it is still held by `connection`
    pub fn unregister(&self, id: &str, connection: u64) -> bool {
        if self
            .clients
            .remove_if(id, |_, client| client.connection == connection)
            .is_none()
        {
            return false;
        }
        self.release_slot();
        info!("Peer disconnected: {}", id);
        let _ = self.events.send(RelayEvent::PeerDisconnected { id: id.to_string() });
        true
    }

    /// Record that `id` is alive
    pub fn heartbeat(&self, id: &str) {
        if let Some(mut client) = self.clients.get_mut(id) {
            client.last_seen = Instant::now();
        }
    }

    /// Forward `message` from `src` to its `dst`, stamping `src`
    pub fn route(&self, src: &str, mut message: RelayMessage) -> Delivery {
        if !message.kind.is_relayed() {
            warn!("Peer {} sent non-relayable {:?}", src, message.kind);
            return Delivery::Dropped;
        }
        let Some(dst) = message.dst.clone() else {
            warn!("Peer {} sent {:?} without dst", src, message.kind);
            return Delivery::Dropped;
        };
        message.src = Some(src.to_string());
        self.heartbeat(src);

        let message = match self.clients.get(&dst) {
            Some(client) => match client.sender.send(message) {
                Ok(()) => return Delivery::Delivered,
                Err(err) => err.0,
            },
            None => message,
        };

        if !message.kind.is_queued() {
            debug!("Dropping {:?} from {} for absent {}", message.kind, src, dst);
            return Delivery::Dropped;
        }
        debug!("Queueing {:?} from {} for absent {}", message.kind, src, dst);
        self.queue.lock().entry(dst).or_default().push(QueuedMessage {
            message,
            queued_at: Instant::now(),
        });
        Delivery::Queued
    }

    /// Expire stale queued messages and drop silent clients as of `now`
    pub fn prune(&self, now: Instant) -> PruneReport {
        let mut expired = Vec::new();
        {
            let mut queue = self.queue.lock();
            for (dst, messages) in queue.iter_mut() {
                messages.retain(|queued| {
                    if now.saturating_duration_since(queued.queued_at) >= self.limits.expire_timeout {
                        expired.push((dst.clone(), queued.message.src.clone()));
                        false
                    } else {
                        true
                    }
                });
            }
            queue.retain(|_, messages| !messages.is_empty());
        }

        for (dst, src) in &expired {
            let Some(src) = src else { continue };
            if let Some(client) = self.clients.get(src) {
                let _ = client.sender.send(RelayMessage::expire(dst.clone(), src.clone()));
            }
        }

        let stale: Vec<String> = self
            .clients
            .iter()
            .filter(|client| now.saturating_duration_since(client.last_seen) > self.limits.alive_timeout)
            .map(|client| client.key().clone())
            .collect();

        let mut disconnected = Vec::new();
        for id in stale {
            let removed = self.clients.remove_if(&id, |_, client| {
                now.saturating_duration_since(client.last_seen) > self.limits.alive_timeout
            });
            if removed.is_some() {
                self.release_slot();
                info!("Peer disconnected: {} (no heartbeat)", id);
                let _ = self.events.send(RelayEvent::PeerDisconnected { id: id.clone() });
                disconnected.push(id);
            }
        }

        PruneReport {
            expired: expired.len(),
            disconnected,
        }
    }

    pub fn is_connected(&self, id: &str) -> bool {
        self.clients.contains_key(id)
    }

    /// Connected ids, sorted
    pub fn peer_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.clients.iter().map(|client| client.key().clone()).collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    /// Messages waiting for `dst`
    pub fn queued_for(&self, dst: &str) -> usize {
        self.queue.lock().get(dst).map_or(0, Vec::len)
    }
}

//! Event system for the call controller
//!
//! Two views are offered. [`CallEvent`]s are broadcast as they happen, for
//! consumers that care about each transition. A `watch` of
//! [`CallSnapshot`] always holds the latest status for consumers that only
//! render the current state.

use tokio::sync::{broadcast, watch};

use crate::types::{CallSnapshot, CallStatus, FailureReason};

/// Events emitted by the call controller
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallEvent {
    /// Status changed
    StatusChanged {
        /// Attempt the transition belongs to
        attempt: u64,
        /// Previous status
        previous: CallStatus,
        /// New status
        current: CallStatus,
        /// Failure reason when `current` is `Failed`
        reason: Option<FailureReason>,
    },

    /// The caller's profile went out on the data channel
    ProfileSent {
        /// Attempt number
        attempt: u64,
    },

    /// The automated greeting was handed to the synthesizer
    GreetingSpoken {
        /// Attempt number
        attempt: u64,
    },
}

impl CallEvent {
    /// Attempt this event belongs to
    pub fn attempt(&self) -> u64 {
        match self {
            CallEvent::StatusChanged { attempt, .. }
            | CallEvent::ProfileSent { attempt }
            | CallEvent::GreetingSpoken { attempt } => *attempt,
        }
    }
}

/// Event emitter for the call controller
///
/// ```rust
/// use shopcall_call_core::{CallEvent, CallStatus, EventEmitter};
///
/// # tokio_test::block_on(async {
/// let emitter = EventEmitter::new(16);
/// let mut events = emitter.subscribe();
/// emitter.emit(CallEvent::StatusChanged {
///     attempt: 1,
///     previous: CallStatus::Idle,
///     current: CallStatus::Connecting,
///     reason: None,
/// });
/// assert_eq!(events.recv().await.unwrap().attempt(), 1);
/// # });
/// ```
#[derive(Clone)]
pub struct EventEmitter {
    sender: broadcast::Sender<CallEvent>,
    snapshot: watch::Sender<CallSnapshot>,
}

impl EventEmitter {
    /// Create a new event emitter with the specified capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        let (snapshot, _) = watch::channel(CallSnapshot::default());
        Self { sender, snapshot }
    }

    /// Emit an event
    pub fn emit(&self, event: CallEvent) {
        // No receivers is fine
        let _ = self.sender.send(event);
    }

    /// Publish the latest snapshot
    pub fn publish(&self, snapshot: CallSnapshot) {
        self.snapshot.send_replace(snapshot);
    }

    /// Subscribe to events
    pub fn subscribe(&self) -> broadcast::Receiver<CallEvent> {
        self.sender.subscribe()
    }

    /// Watch the latest snapshot
    pub fn watch(&self) -> watch::Receiver<CallSnapshot> {
        self.snapshot.subscribe()
    }
}

impl Default for EventEmitter {
    fn default() -> Self {
        Self::new(64)
    }
}

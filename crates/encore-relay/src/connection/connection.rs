//! Individual WebSocket connection
//!
//! Represents a single live client session and its outbound queue.

use super::ConnectionId;
use crate::events::Event;
use crate::protocol::{CloseCode, GatewayMessage};
use parking_lot::{Mutex, RwLock};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::mpsc;

/// Item queued for a connection's writer task
#[derive(Debug, Clone)]
pub enum Outbound {
    /// Application event, shared between all recipients of one fan-out
    Event(Arc<Event>),
    /// Protocol frame (Hello, Heartbeat ACK)
    Control(GatewayMessage),
    /// Close the socket with this code
    Close(CloseCode),
}

/// Why an item could not be queued for a connection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DeliveryError {
    #[error("Outbound queue is full")]
    QueueFull,

    #[error("Connection is closed")]
    Closed,
}

/// Application identity a client attached to its connection
///
/// Supplied by the client and never verified by the relay.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Identity {
    pub user_id: Option<String>,
    pub username: Option<String>,
}

/// A single WebSocket connection
pub struct Connection {
    /// Identifier assigned at connect time
    id: ConnectionId,

    /// Identity supplied with `join_room`
    identity: RwLock<Identity>,

    /// Channel to the writer task
    sender: mpsc::Sender<Outbound>,

    /// Last sequence number stamped on an outgoing dispatch
    sequence: AtomicU64,

    /// Last time any frame arrived from the client
    last_seen: Mutex<Instant>,

    /// Connection creation time
    created_at: Instant,
}

impl Connection {
    /// Create a new connection
    pub fn new(id: ConnectionId, sender: mpsc::Sender<Outbound>) -> Arc<Self> {
        let now = Instant::now();
        Arc::new(Self {
            id,
            identity: RwLock::new(Identity::default()),
            sender,
            sequence: AtomicU64::new(0),
            last_seen: Mutex::new(now),
            created_at: now,
        })
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn identity(&self) -> Identity {
        self.identity.read().clone()
    }

    /// Record the client-supplied identity
    ///
    /// Fields that are `None` keep their previous value.
    pub fn set_identity(&self, user_id: Option<String>, username: Option<String>) {
        let mut identity = self.identity.write();
        if user_id.is_some() {
            identity.user_id = user_id;
        }
        if username.is_some() {
            identity.username = username;
        }
    }

    /// Get the next sequence number
    pub fn next_sequence(&self) -> u64 {
        self.sequence.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Get the current sequence number
    pub fn current_sequence(&self) -> u64 {
        self.sequence.load(Ordering::SeqCst)
    }

    /// Record that the client is alive
    pub fn touch(&self) {
        *self.last_seen.lock() = Instant::now();
    }

    /// Time since the client last sent anything
    pub fn idle_for(&self) -> Duration {
        self.last_seen.lock().elapsed()
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    /// Queue an item without waiting
    ///
    /// Never blocks, so it is safe to call while holding the membership lock.
    pub fn deliver(&self, item: Outbound) -> Result<(), DeliveryError> {
        self.sender.try_send(item).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => DeliveryError::QueueFull,
            mpsc::error::TrySendError::Closed(_) => DeliveryError::Closed,
        })
    }

    /// Check if the writer side has gone away
    pub fn is_closed(&self) -> bool {
        self.sender.is_closed()
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("sequence", &self.sequence.load(Ordering::SeqCst))
            .field("created_at", &self.created_at)
            .finish()
    }
}

//! Connection manager
//!
//! Owns every live connection and the room membership table.
//!
//! Connection handles live in a `DashMap` so per-connection lookups never
//! contend on the membership lock. Membership changes, fan-out, and removal
//! all run under the `RwLock` around the [`MembershipTable`]: fan-out holds
//! the read guard while it queues events, and disconnect holds the write
//! guard while it removes the connection, so no event is queued for a
//! connection after its disconnect has been processed.
//!
//! Lock order is always table first, then `DashMap` shard.

use super::{Connection, ConnectionId, DeliveryError, Outbound};
use crate::events::Event;
use crate::protocol::CloseCode;
use crate::rooms::{JoinOutcome, LeaveOutcome, MembershipTable, RoomId};
use dashmap::DashMap;
use parking_lot::RwLock;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Outcome of one fan-out
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Delivery {
    /// Recipients the event was queued for
    pub sent: usize,
    /// Recipients skipped because their queue was full or closed
    pub dropped: usize,
}

/// Origin of a fan-out
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Publisher {
    /// A client connection; `echo` decides whether it receives its own event
    Client { id: ConnectionId, echo: bool },
    /// The backend, through the HTTP publish hook
    Server,
}

impl Publisher {
    /// Whether the publisher may still reach anyone
    fn is_live(self, table: &MembershipTable) -> bool {
        match self {
            Self::Client { id, .. } => table.is_registered(id),
            Self::Server => true,
        }
    }

    fn excluded(self) -> Option<ConnectionId> {
        match self {
            Self::Client { id, echo: false } => Some(id),
            _ => None,
        }
    }
}

/// Manages all active WebSocket connections
pub struct ConnectionManager {
    /// Active connections by id
    connections: DashMap<ConnectionId, Arc<Connection>>,

    /// Room membership, also the authority on which ids are still connected
    table: RwLock<MembershipTable>,
}

impl ConnectionManager {
    /// Create a new connection manager
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
            table: RwLock::new(MembershipTable::new()),
        }
    }

    /// Create a new connection manager wrapped in Arc
    #[must_use]
    pub fn new_shared() -> Arc<Self> {
        Arc::new(Self::new())
    }

    /// Register a new connection with a fresh id and no rooms
    pub fn on_connect(&self, sender: mpsc::Sender<Outbound>) -> Arc<Connection> {
        let id = ConnectionId::new();
        let connection = Connection::new(id, sender);

        {
            let mut table = self.table.write();
            table.register(id);
            self.connections.insert(id, connection.clone());
        }

        tracing::debug!(connection_id = %id, "Connection added");

        connection
    }

    /// Remove a connection from every room and forget it
    ///
    /// Returns false if the connection was already gone, which makes
    /// overlapping close signals harmless.
    pub fn on_disconnect(&self, connection_id: ConnectionId) -> bool {
        let rooms = {
            let mut table = self.table.write();
            let Some(rooms) = table.unregister(connection_id) else {
                tracing::trace!(connection_id = %connection_id, "Duplicate disconnect ignored");
                return false;
            };
            self.connections.remove(&connection_id);
            rooms
        };

        tracing::debug!(
            connection_id = %connection_id,
            rooms = rooms.len(),
            "Connection removed"
        );

        true
    }

    /// Add a connection to a room
    ///
    /// Idempotent; unknown connections are ignored.
    pub fn join(&self, connection_id: ConnectionId, room: &str) -> JoinOutcome {
        let outcome = self.table.write().join(connection_id, room);

        tracing::trace!(
            connection_id = %connection_id,
            room = %room,
            outcome = ?outcome,
            "Join room"
        );

        outcome
    }

    /// Remove a connection from a room, reclaiming the room when it empties
    pub fn leave(&self, connection_id: ConnectionId, room: &str) -> LeaveOutcome {
        let outcome = self.table.write().leave(connection_id, room);

        tracing::trace!(
            connection_id = %connection_id,
            room = %room,
            outcome = ?outcome,
            "Leave room"
        );

        outcome
    }

    /// Record the identity a client supplied
    pub fn set_identity(
        &self,
        connection_id: ConnectionId,
        user_id: Option<String>,
        username: Option<String>,
    ) -> bool {
        if let Some(connection) = self.connections.get(&connection_id) {
            connection.set_identity(user_id, username);
            true
        } else {
            false
        }
    }

    /// Get a connection by id
    pub fn get_connection(&self, connection_id: ConnectionId) -> Option<Arc<Connection>> {
        self.connections.get(&connection_id).map(|r| r.clone())
    }

    /// Queue an item for a single connection
    pub fn send_to_connection(
        &self,
        connection_id: ConnectionId,
        item: Outbound,
    ) -> Result<(), DeliveryError> {
        let _table = self.table.read();
        match self.connections.get(&connection_id) {
            Some(connection) => connection.deliver(item),
            None => Err(DeliveryError::Closed),
        }
    }

    /// Queue an event for every member of a room
    ///
    /// An unknown room is a delivery to zero recipients. An event from a
    /// client that has already disconnected is dropped.
    pub fn send_to_room(&self, room: &str, event: &Arc<Event>, publisher: Publisher) -> Delivery {
        let table = self.table.read();
        let mut delivery = Delivery::default();

        if !publisher.is_live(&table) {
            tracing::trace!(
                room = %room,
                event = %event.name,
                "Publisher disconnected, event dropped"
            );
            return delivery;
        }

        let exclude = publisher.excluded();
        for member in table.members(room) {
            if Some(member) == exclude {
                continue;
            }
            if let Some(connection) = self.connections.get(&member) {
                deliver_event(&connection, event, &mut delivery);
            }
        }

        tracing::trace!(
            room = %room,
            event = %event.name,
            sent = delivery.sent,
            dropped = delivery.dropped,
            "Event sent to room"
        );

        delivery
    }

    /// Queue an event for every connection, regardless of room membership
    pub fn broadcast(&self, event: &Arc<Event>, publisher: Publisher) -> Delivery {
        let table = self.table.read();
        let mut delivery = Delivery::default();

        if !publisher.is_live(&table) {
            tracing::trace!(event = %event.name, "Publisher disconnected, event dropped");
            return delivery;
        }

        let exclude = publisher.excluded();
        for connection in &self.connections {
            if Some(*connection.key()) == exclude {
                continue;
            }
            deliver_event(&connection, event, &mut delivery);
        }

        tracing::debug!(
            event = %event.name,
            sent = delivery.sent,
            dropped = delivery.dropped,
            "Event broadcast to all connections"
        );

        delivery
    }

    /// Rooms a connection has joined
    pub fn rooms_of(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        self.table.read().rooms_of(connection_id)
    }

    /// Current members of a room
    pub fn room_members(&self, room: &str) -> Vec<ConnectionId> {
        self.table.read().members(room).collect()
    }

    /// Get the total number of active connections
    pub fn connection_count(&self) -> usize {
        self.connections.len()
    }

    /// Get the number of rooms with at least one member
    pub fn room_count(&self) -> usize {
        self.table.read().room_count()
    }

    /// Check if a connection is still registered
    pub fn has_connection(&self, connection_id: ConnectionId) -> bool {
        self.connections.contains_key(&connection_id)
    }

    /// Ask every connection's writer to close the socket with `code`
    ///
    /// Returns the number of connections the close was queued for.
    pub fn close_all(&self, code: CloseCode) -> usize {
        let _table = self.table.read();
        self.connections
            .iter()
            .filter(|connection| connection.deliver(Outbound::Close(code)).is_ok())
            .count()
    }

    /// Clean up connections whose writer task is gone
    pub fn cleanup_closed_connections(&self) -> usize {
        let closed: Vec<ConnectionId> = self
            .connections
            .iter()
            .filter(|r| r.is_closed())
            .map(|r| *r.key())
            .collect();

        let count = closed
            .into_iter()
            .filter(|id| self.on_disconnect(*id))
            .count();

        if count > 0 {
            tracing::info!(count = count, "Cleaned up closed connections");
        }

        count
    }
}

fn deliver_event(connection: &Connection, event: &Arc<Event>, delivery: &mut Delivery) {
    match connection.deliver(Outbound::Event(Arc::clone(event))) {
        Ok(()) => delivery.sent += 1,
        Err(DeliveryError::QueueFull) => {
            delivery.dropped += 1;
            tracing::warn!(
                connection_id = %connection.id(),
                event = %event.name,
                "Outbound queue full, event dropped"
            );
        }
        Err(DeliveryError::Closed) => {
            delivery.dropped += 1;
            tracing::debug!(
                connection_id = %connection.id(),
                event = %event.name,
                "Connection closing, event dropped"
            );
        }
    }
}

impl Default for ConnectionManager {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ConnectionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionManager")
            .field("connections", &self.connections.len())
            .field("rooms", &self.room_count())
            .finish()
    }
}

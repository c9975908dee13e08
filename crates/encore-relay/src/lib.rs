//! # encore-relay
//!
//! WebSocket relay for real-time room and global events.
//!
//! Clients join named rooms and emit named events; the relay fans each event
//! out to the other members of the room, or to every connected client for
//! global topics such as live-status updates. Nothing is persisted.

pub mod broadcast;
pub mod connection;
pub mod events;
pub mod handlers;
pub mod protocol;
pub mod rooms;
pub mod server;

#[cfg(test)]
mod test_support;

pub use broadcast::{EventDispatcher, EventRoute, EventRoutes, TopicTemplate};
pub use connection::{Connection, ConnectionId, ConnectionManager, Publisher};
pub use events::Event;
pub use rooms::{room_key_for, RoomId};
pub use server::{create_app, create_relay_state, run, RelayState};

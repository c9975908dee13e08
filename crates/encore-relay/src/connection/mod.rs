//! Connection management
//!
//! Tracks live WebSocket connections, their room memberships, and the
//! per-connection outbound queues events are delivered through.

mod connection;
mod id;
mod manager;

pub use connection::{Connection, DeliveryError, Identity, Outbound};
pub use id::ConnectionId;
pub use manager::{ConnectionManager, Delivery, Publisher};

//! Server payload definitions

use crate::connection::ConnectionId;
use serde::{Deserialize, Serialize};

/// Payload for op 10 (Hello)
///
/// Sent by the server immediately after connection.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HelloPayload {
    /// Heartbeat interval in milliseconds
    pub heartbeat_interval: u64,
    /// Identifier the relay assigned to this connection
    pub connection_id: ConnectionId,
}

impl HelloPayload {
    #[must_use]
    pub fn new(connection_id: ConnectionId, heartbeat_interval: u64) -> Self {
        Self {
            heartbeat_interval,
            connection_id,
        }
    }
}

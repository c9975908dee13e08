//! Heartbeat handler (op 1)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, DeliveryError, Outbound};
use crate::protocol::GatewayMessage;
use std::sync::Arc;

/// Handles heartbeat messages
pub struct HeartbeatHandler;

impl HeartbeatHandler {
    /// Acknowledge a heartbeat from the client
    ///
    /// Liveness itself is recorded for every inbound frame by the socket
    /// loop; this only sends the ACK. `last_sequence` is the client's last
    /// received sequence number, if any.
    pub fn handle(connection: &Arc<Connection>, last_sequence: Option<u64>) -> HandlerResult<()> {
        tracing::trace!(
            connection_id = %connection.id(),
            client_seq = ?last_sequence,
            server_seq = connection.current_sequence(),
            "Heartbeat received"
        );

        match connection.deliver(Outbound::Control(GatewayMessage::heartbeat_ack())) {
            Ok(()) => Ok(()),
            Err(DeliveryError::QueueFull) => {
                // The client is still alive, it just reads slowly
                tracing::warn!(
                    connection_id = %connection.id(),
                    "Outbound queue full, heartbeat ACK skipped"
                );
                Ok(())
            }
            Err(DeliveryError::Closed) => Err(HandlerError::ConnectionClosed),
        }
    }
}

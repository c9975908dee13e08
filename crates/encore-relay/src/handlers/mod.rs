//! Frame handlers
//!
//! Handles incoming WebSocket frames based on their operation code.

mod emit;
mod error;
mod heartbeat;
mod room;

pub use emit::EmitHandler;
pub use error::{HandlerError, HandlerResult};
pub use heartbeat::HeartbeatHandler;
pub use room::RoomHandler;

use crate::connection::Connection;
use crate::protocol::{GatewayMessage, OpCode};
use crate::server::RelayState;
use std::sync::Arc;

/// Dispatch incoming client frames to the appropriate handler
pub struct MessageDispatcher;

impl MessageDispatcher {
    /// Handle one parsed client frame
    pub fn dispatch(
        state: &RelayState,
        connection: &Arc<Connection>,
        message: GatewayMessage,
    ) -> HandlerResult<()> {
        match message.op {
            OpCode::Heartbeat => {
                let seq = message.as_heartbeat_seq().flatten();
                HeartbeatHandler::handle(connection, seq)
            }
            OpCode::Dispatch => {
                let event = message.into_event().ok_or_else(|| {
                    HandlerError::InvalidPayload("Dispatch frame without event name".to_string())
                })?;

                EmitHandler::handle(state, connection, event)
            }
            op => Err(HandlerError::ServerOnlyOp(op)),
        }
    }

    /// Parse and handle one text frame
    pub fn dispatch_text(
        state: &RelayState,
        connection: &Arc<Connection>,
        text: &str,
    ) -> HandlerResult<()> {
        let message = GatewayMessage::from_json(text)?;

        tracing::trace!(
            connection_id = %connection.id(),
            op = %message.op,
            "Received message"
        );

        Self::dispatch(state, connection, message)
    }
}

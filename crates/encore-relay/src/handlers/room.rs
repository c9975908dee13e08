//! Room membership handlers (`join_room` / `leave_room`)

use super::{HandlerError, HandlerResult};
use crate::connection::{Connection, DeliveryError, Outbound};
use crate::events::{Event, JoinRoomPayload, LeaveRoomPayload, RelayEventName, RoomAckPayload};
use crate::rooms::{JoinOutcome, LeaveOutcome};
use crate::server::RelayState;
use std::sync::Arc;

/// Handles room membership requests
pub struct RoomHandler;

impl RoomHandler {
    /// Join the room named in the payload and record the client's identity
    ///
    /// Joining a room twice is acknowledged both times but changes nothing.
    pub fn join(state: &RelayState, connection: &Arc<Connection>, event: Event) -> HandlerResult<()> {
        let payload: JoinRoomPayload = serde_json::from_value(event.payload)
            .map_err(|e| HandlerError::InvalidPayload(format!("{}: {e}", event.name)))?;

        let manager = state.connection_manager();
        manager.set_identity(connection.id(), payload.user_id.clone(), payload.username);

        match manager.join(connection.id(), &payload.room_id) {
            JoinOutcome::UnknownConnection => return Ok(()),
            JoinOutcome::Joined => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    room = %payload.room_id,
                    user_id = ?payload.user_id,
                    "Joined room"
                );
            }
            JoinOutcome::AlreadyMember => {}
        }

        Self::acknowledge(state, connection, RelayEventName::RoomJoined, payload.room_id)
    }

    /// Leave the room named in the payload
    pub fn leave(state: &RelayState, connection: &Arc<Connection>, event: Event) -> HandlerResult<()> {
        let payload: LeaveRoomPayload = serde_json::from_value(event.payload)
            .map_err(|e| HandlerError::InvalidPayload(format!("{}: {e}", event.name)))?;

        match state.connection_manager().leave(connection.id(), &payload.room_id) {
            LeaveOutcome::UnknownConnection => return Ok(()),
            LeaveOutcome::Left { room_reclaimed } => {
                tracing::debug!(
                    connection_id = %connection.id(),
                    room = %payload.room_id,
                    room_reclaimed,
                    "Left room"
                );
            }
            LeaveOutcome::NotMember => {}
        }

        Self::acknowledge(state, connection, RelayEventName::RoomLeft, payload.room_id)
    }

    fn acknowledge(
        state: &RelayState,
        connection: &Arc<Connection>,
        name: RelayEventName,
        room_id: String,
    ) -> HandlerResult<()> {
        let payload = serde_json::to_value(RoomAckPayload { room_id })?;
        let ack = Outbound::Event(Arc::new(Event::new(name.as_str(), payload)));

        match state.connection_manager().send_to_connection(connection.id(), ack) {
            Ok(()) => Ok(()),
            Err(DeliveryError::QueueFull) => {
                tracing::warn!(
                    connection_id = %connection.id(),
                    event = %name,
                    "Outbound queue full, acknowledgement dropped"
                );
                Ok(())
            }
            // Disconnected meanwhile, nothing left to acknowledge
            Err(DeliveryError::Closed) => Ok(()),
        }
    }
}

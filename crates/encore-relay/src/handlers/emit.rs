//! Application event handler (op 0)

use super::{HandlerResult, RoomHandler};
use crate::broadcast::{ControlEvent, EventRoute};
use crate::connection::Connection;
use crate::events::Event;
use crate::server::RelayState;
use std::sync::Arc;

/// Handles events emitted by clients
pub struct EmitHandler;

impl EmitHandler {
    /// Apply a control event or fan the event out according to its route
    pub fn handle(state: &RelayState, connection: &Arc<Connection>, event: Event) -> HandlerResult<()> {
        match state.event_dispatcher().routes().resolve(&event.name) {
            EventRoute::Control(ControlEvent::Join) => RoomHandler::join(state, connection, event),
            EventRoute::Control(ControlEvent::Leave) => RoomHandler::leave(state, connection, event),
            EventRoute::Room { .. } | EventRoute::Global { .. } => {
                let name = event.name.clone();
                let sent = state.event_dispatcher().dispatch(connection.id(), event)?;

                tracing::trace!(
                    connection_id = %connection.id(),
                    event = %name,
                    sent = sent,
                    "Event relayed"
                );

                Ok(())
            }
        }
    }
}

//! Event dispatcher
//!
//! Routes one named event from its publisher to the right set of
//! connections. Delivery is fire-and-forget: events are queued on each
//! recipient's outbound channel and never retried.

use super::{EventRoute, EventRoutes};
use crate::connection::{ConnectionId, ConnectionManager, Publisher};
use crate::events::Event;
use serde_json::Value;
use std::sync::Arc;
use thiserror::Error;

/// Why a client event could not be routed
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RouteError {
    #[error("Event {0} does not name a room")]
    MissingRoom(String),

    #[error("Event {0} is handled by the relay, not dispatched")]
    ControlEvent(String),
}

/// Routes events to room members or to everyone
pub struct EventDispatcher {
    /// Connection manager for sending messages
    connection_manager: Arc<ConnectionManager>,
    /// Per-event routing policy
    routes: EventRoutes,
}

impl EventDispatcher {
    /// Create a new event dispatcher
    pub fn new(connection_manager: Arc<ConnectionManager>, routes: EventRoutes) -> Self {
        Self {
            connection_manager,
            routes,
        }
    }

    pub fn routes(&self) -> &EventRoutes {
        &self.routes
    }

    /// Publish an event from `sender` to every member of `room`
    ///
    /// The sender is skipped unless the route for `event_name` echoes.
    /// Nothing is sent once the sender has disconnected. Returns the number
    /// of recipients the event was queued for.
    pub fn publish_to_room(
        &self,
        sender: ConnectionId,
        room: &str,
        event_name: &str,
        payload: Value,
    ) -> usize {
        let publisher = Publisher::Client {
            id: sender,
            echo: self.routes.echoes_sender(event_name),
        };
        self.fan_out_room(room, Event::new(event_name, payload), publisher)
    }

    /// Publish an event from the backend to every connected client
    pub fn publish_global(&self, event_name: &str, payload: Value) -> usize {
        self.fan_out_global(Event::new(event_name, payload), Publisher::Server)
    }

    /// Route an event a client emitted
    pub fn dispatch(&self, sender: ConnectionId, event: Event) -> Result<usize, RouteError> {
        match self.routes.resolve(&event.name) {
            EventRoute::Control(_) => Err(RouteError::ControlEvent(event.name)),
            EventRoute::Room { echo_sender } => {
                let room = event
                    .room()
                    .ok_or_else(|| RouteError::MissingRoom(event.name.clone()))?;
                let publisher = Publisher::Client {
                    id: sender,
                    echo: *echo_sender,
                };
                Ok(self.fan_out_room(&room, event, publisher))
            }
            EventRoute::Global { .. } => {
                let topic = self.routes.global_topic(&event);
                let publisher = Publisher::Client {
                    id: sender,
                    echo: true,
                };
                Ok(self.fan_out_global(Event::new(topic, event.payload), publisher))
            }
        }
    }

    /// Route an event injected by the backend
    ///
    /// With a room it reaches every member; without one it is broadcast
    /// under its global topic name.
    pub fn publish_from_server(&self, room: Option<&str>, event: Event) -> usize {
        match room {
            Some(room) => self.fan_out_room(room, event, Publisher::Server),
            None => {
                let topic = self.routes.global_topic(&event);
                self.publish_global(&topic, event.payload)
            }
        }
    }

    fn fan_out_room(&self, room: &str, event: Event, publisher: Publisher) -> usize {
        let event = Arc::new(event);
        let delivery = self.connection_manager.send_to_room(room, &event, publisher);

        tracing::trace!(
            room = %room,
            event = %event.name,
            sent = delivery.sent,
            "Event dispatched to room"
        );

        delivery.sent
    }

    fn fan_out_global(&self, event: Event, publisher: Publisher) -> usize {
        let event = Arc::new(event);
        self.connection_manager.broadcast(&event, publisher).sent
    }
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("routes", &self.routes)
            .finish()
    }
}

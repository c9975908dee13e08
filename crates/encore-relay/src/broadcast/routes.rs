//! Per-event routing policy
//!
//! Which audience an event name reaches, and whether its sender hears the
//! echo, is application policy. The relay ships a table for the platform's
//! events; callers can override entries or add their own.

use crate::events::{Event, RelayEventName};
use std::collections::HashMap;

/// Membership operations handled by the relay itself
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlEvent {
    Join,
    Leave,
}

/// Topic name rendered for a global event: `{entity}-{id}-{event}`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TopicTemplate {
    /// Entity prefix, e.g. `station`
    pub entity: String,
    /// Payload field holding the entity id, e.g. `stationId`
    pub id_field: String,
}

impl TopicTemplate {
    #[must_use]
    pub fn new(entity: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            id_field: id_field.into(),
        }
    }

    /// Render the topic for `event`, falling back to the bare event name
    /// when the payload carries no id
    #[must_use]
    pub fn render(&self, event: &Event) -> String {
        match event.key_field(&self.id_field) {
            Some(id) => format!("{}-{}-{}", self.entity, id, event.name),
            None => event.name.clone(),
        }
    }
}

/// Where an event goes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventRoute {
    /// Handled by the relay (join/leave)
    Control(ControlEvent),
    /// Re-emitted to the room named in the payload
    Room { echo_sender: bool },
    /// Re-emitted to every connection, optionally under a derived topic name
    Global { topic: Option<TopicTemplate> },
}

/// Routing table from event name to [`EventRoute`]
#[derive(Debug, Clone)]
pub struct EventRoutes {
    routes: HashMap<String, EventRoute>,
    /// Route for names not in the table
    fallback: EventRoute,
}

impl EventRoutes {
    /// An empty table where every event is relayed to its room without echo
    #[must_use]
    pub fn empty() -> Self {
        Self {
            routes: HashMap::new(),
            fallback: EventRoute::Room { echo_sender: false },
        }
    }

    /// The platform's routing table
    ///
    /// `chat_echo` decides whether chat senders receive their own message.
    #[must_use]
    pub fn platform(chat_echo: bool) -> Self {
        use RelayEventName as Name;

        Self::empty()
            .with_route(Name::JoinRoom.as_str(), EventRoute::Control(ControlEvent::Join))
            .with_route(Name::LeaveRoom.as_str(), EventRoute::Control(ControlEvent::Leave))
            .with_route(
                Name::ChatMessage.as_str(),
                EventRoute::Room {
                    echo_sender: chat_echo,
                },
            )
            .with_route(Name::Typing.as_str(), EventRoute::Room { echo_sender: false })
            .with_route(Name::StopTyping.as_str(), EventRoute::Room { echo_sender: false })
            .with_route(
                Name::LiveStatus.as_str(),
                EventRoute::Global {
                    topic: Some(TopicTemplate::new("station", "stationId")),
                },
            )
            .with_route(
                Name::NewFollower.as_str(),
                EventRoute::Global {
                    topic: Some(TopicTemplate::new("user", "userId")),
                },
            )
            .with_route(
                Name::TrackUpdate.as_str(),
                EventRoute::Global {
                    topic: Some(TopicTemplate::new("track", "trackId")),
                },
            )
    }

    /// Add or replace the route for an event name
    #[must_use]
    pub fn with_route(mut self, name: impl Into<String>, route: EventRoute) -> Self {
        self.routes.insert(name.into(), route);
        self
    }

    /// Route for an event name
    #[must_use]
    pub fn resolve(&self, name: &str) -> &EventRoute {
        self.routes.get(name).unwrap_or(&self.fallback)
    }

    /// Whether a room event is echoed back to its sender
    #[must_use]
    pub fn echoes_sender(&self, name: &str) -> bool {
        matches!(self.resolve(name), EventRoute::Room { echo_sender: true })
    }

    /// Name under which a global event is delivered
    #[must_use]
    pub fn global_topic(&self, event: &Event) -> String {
        match self.resolve(&event.name) {
            EventRoute::Global { topic: Some(template) } => template.render(event),
            _ => event.name.clone(),
        }
    }
}

impl Default for EventRoutes {
    fn default() -> Self {
        Self::platform(false)
    }
}

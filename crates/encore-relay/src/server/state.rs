//! Relay state
//!
//! Application state shared by the HTTP and WebSocket handlers.

use crate::broadcast::{EventDispatcher, EventRoutes};
use crate::connection::ConnectionManager;
use encore_common::AppConfig;
use std::sync::Arc;

/// Relay application state
///
/// Cheap to clone; every clone shares the same connections and rooms.
#[derive(Clone)]
pub struct RelayState {
    /// Connection manager for WebSocket connections
    connection_manager: Arc<ConnectionManager>,
    /// Routes events to rooms or to everyone
    event_dispatcher: Arc<EventDispatcher>,
    /// Application configuration
    config: Arc<AppConfig>,
}

impl RelayState {
    /// Create state with the platform routing table
    #[must_use]
    pub fn new(config: AppConfig) -> Self {
        let routes = EventRoutes::platform(config.relay.chat_echo);
        Self::with_routes(config, routes)
    }

    /// Create state with a custom routing table
    #[must_use]
    pub fn with_routes(config: AppConfig, routes: EventRoutes) -> Self {
        let connection_manager = ConnectionManager::new_shared();
        let event_dispatcher = Arc::new(EventDispatcher::new(connection_manager.clone(), routes));

        Self {
            connection_manager,
            event_dispatcher,
            config: Arc::new(config),
        }
    }

    /// Get the connection manager
    pub fn connection_manager(&self) -> &ConnectionManager {
        &self.connection_manager
    }

    /// Get the event dispatcher
    pub fn event_dispatcher(&self) -> &EventDispatcher {
        &self.event_dispatcher
    }

    /// Get the application configuration
    pub fn config(&self) -> &AppConfig {
        &self.config
    }
}

impl std::fmt::Debug for RelayState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RelayState")
            .field("connections", &self.connection_manager.connection_count())
            .field("rooms", &self.connection_manager.room_count())
            .field("event_dispatcher", &self.event_dispatcher)
            .finish_non_exhaustive()
    }
}

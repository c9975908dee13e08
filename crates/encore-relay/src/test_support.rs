//! Shared fixtures for unit tests

use crate::connection::{Connection, Outbound};
use crate::events::Event;
use crate::server::RelayState;
use encore_common::AppConfig;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Relay state built from default configuration
pub fn test_state() -> RelayState {
    RelayState::new(AppConfig::from_lookup(|_| None).unwrap())
}

/// Register a connection and return its handle with the writer side of its queue
pub fn connect(state: &RelayState) -> (Arc<Connection>, mpsc::Receiver<Outbound>) {
    let (tx, rx) = mpsc::channel(state.config().relay.outbound_buffer);
    (state.connection_manager().on_connect(tx), rx)
}

/// Take every queued application event, skipping protocol frames
pub fn drain_events(rx: &mut mpsc::Receiver<Outbound>) -> Vec<Event> {
    let mut events = Vec::new();
    while let Ok(item) = rx.try_recv() {
        if let Outbound::Event(event) = item {
            events.push((*event).clone());
        }
    }
    events
}

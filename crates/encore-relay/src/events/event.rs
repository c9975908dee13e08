//! Application event

use serde::Serialize;
use serde_json::Value;

/// A named event with an opaque JSON payload
///
/// Events exist only while being dispatched; the relay never stores them.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Event {
    pub name: String,
    pub payload: Value,
}

impl Event {
    #[must_use]
    pub fn new(name: impl Into<String>, payload: Value) -> Self {
        Self {
            name: name.into(),
            payload,
        }
    }

    /// Read a string or numeric identifier field from an object payload
    #[must_use]
    pub fn key_field(&self, field: &str) -> Option<String> {
        self.payload.get(field).and_then(super::key_from_value)
    }

    /// Room targeted by this event (`room`, falling back to `roomId`)
    #[must_use]
    pub fn room(&self) -> Option<String> {
        self.key_field("room").or_else(|| self.key_field("roomId"))
    }
}

//! Relay message format
//!
//! Defines the envelope for every WebSocket text frame.

use super::{HelloPayload, OpCode};
use crate::events::Event;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Relay message format
///
/// All frames exchanged over the WebSocket connection follow this format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayMessage {
    /// Operation code
    pub op: OpCode,

    /// Event name (only for op=0 Dispatch)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub t: Option<String>,

    /// Per-connection sequence number (server dispatches only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub s: Option<u64>,

    /// Event data payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub d: Option<Value>,
}

/// Borrowed dispatch frame, serialized once per recipient without cloning the payload
#[derive(Serialize)]
struct DispatchFrame<'a> {
    op: OpCode,
    t: &'a str,
    s: u64,
    d: &'a Value,
}

impl GatewayMessage {
    // === Server Messages ===

    /// Create a Hello message (op=10)
    #[must_use]
    pub fn hello(payload: &HelloPayload) -> Self {
        Self {
            op: OpCode::Hello,
            t: None,
            s: None,
            d: Some(serde_json::to_value(payload).unwrap_or_default()),
        }
    }

    /// Create a Heartbeat ACK message (op=11)
    #[must_use]
    pub fn heartbeat_ack() -> Self {
        Self {
            op: OpCode::HeartbeatAck,
            t: None,
            s: None,
            d: None,
        }
    }

    /// Serialize a dispatch of `event` stamped with `sequence`
    pub fn encode_dispatch(event: &Event, sequence: u64) -> Result<String, serde_json::Error> {
        serde_json::to_string(&DispatchFrame {
            op: OpCode::Dispatch,
            t: &event.name,
            s: sequence,
            d: &event.payload,
        })
    }

    // === Parsing Client Messages ===

    /// Try to read an application event (op=0 with an event name)
    ///
    /// A missing payload is treated as `null`.
    pub fn into_event(self) -> Option<Event> {
        if self.op != OpCode::Dispatch {
            return None;
        }
        let name = self.t.filter(|t| !t.is_empty())?;
        Some(Event::new(name, self.d.unwrap_or(Value::Null)))
    }

    /// Try to parse the heartbeat sequence number (op=1)
    pub fn as_heartbeat_seq(&self) -> Option<Option<u64>> {
        if self.op != OpCode::Heartbeat {
            return None;
        }
        Some(self.d.as_ref().and_then(Value::as_u64))
    }

    // === Utilities ===

    /// Serialize to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserialize from JSON string
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

impl std::fmt::Display for GatewayMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if let Some(t) = &self.t {
            write!(f, "GatewayMessage(op={}, t={}", self.op, t)?;
            if let Some(s) = self.s {
                write!(f, ", s={s}")?;
            }
            write!(f, ")")
        } else {
            write!(f, "GatewayMessage(op={})", self.op)
        }
    }
}

//! Relay events
//!
//! Application events carried by Dispatch frames, the names the relay
//! interprets, and the payloads of its own control events.

mod event;
mod names;
mod payloads;

pub use event::Event;
pub use names::RelayEventName;
pub use payloads::{key_from_value, JoinRoomPayload, LeaveRoomPayload, RoomAckPayload};

//! Rooms
//!
//! Room identifiers, the direct-conversation key derivation, and the
//! room membership table shared by all connections.

mod key;
mod table;

pub use key::{room_key_for, RoomId, ROOM_KEY_SEPARATOR};
pub use table::{JoinOutcome, LeaveOutcome, MembershipTable};

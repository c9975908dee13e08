//! Event names the relay gives meaning to

use std::fmt;

/// Event names recognized by the relay
///
/// Every other name is passed through according to the routing table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RelayEventName {
    /// Client asks to join a room
    JoinRoom,
    /// Client asks to leave a room
    LeaveRoom,
    /// Sent back to a client after it joined a room
    RoomJoined,
    /// Sent back to a client after it left a room
    RoomLeft,
    /// Chat line within a room
    ChatMessage,
    /// Transient typing indicator
    Typing,
    /// Typing indicator cleared
    StopTyping,
    /// A station went live or offline
    LiveStatus,
    /// A creator gained a follower
    NewFollower,
    /// A track's metadata or processing state changed
    TrackUpdate,
}

impl RelayEventName {
    /// Get the wire name of the event
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::JoinRoom => "join_room",
            Self::LeaveRoom => "leave_room",
            Self::RoomJoined => "room_joined",
            Self::RoomLeft => "room_left",
            Self::ChatMessage => "chat_message",
            Self::Typing => "typing",
            Self::StopTyping => "stop_typing",
            Self::LiveStatus => "live-status",
            Self::NewFollower => "new-follower",
            Self::TrackUpdate => "track-update",
        }
    }
}

impl fmt::Display for RelayEventName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

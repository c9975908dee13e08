//! Room membership table
//!
//! Two-way index between connections and the rooms they have joined.
//! A room exists exactly while it has at least one member: the entry is
//! created by the first join and deleted when the last member leaves or
//! disconnects.

use super::RoomId;
use crate::connection::ConnectionId;
use std::collections::{HashMap, HashSet};

/// Result of [`MembershipTable::join`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JoinOutcome {
    /// Membership added
    Joined,
    /// Connection was already a member (no change)
    AlreadyMember,
    /// Connection is not registered (already disconnected)
    UnknownConnection,
}

/// Result of [`MembershipTable::leave`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeaveOutcome {
    /// Membership removed; `room_reclaimed` when the room became empty
    Left { room_reclaimed: bool },
    /// Connection was not a member of the room
    NotMember,
    /// Connection is not registered (already disconnected)
    UnknownConnection,
}

/// Room membership table
#[derive(Debug, Default)]
pub struct MembershipTable {
    /// Room key to member connections
    rooms: HashMap<RoomId, HashSet<ConnectionId>>,
    /// Registered connections to the rooms they joined
    memberships: HashMap<ConnectionId, HashSet<RoomId>>,
}

impl MembershipTable {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection with no memberships
    ///
    /// Returns false if the id was already registered.
    pub fn register(&mut self, connection_id: ConnectionId) -> bool {
        if self.memberships.contains_key(&connection_id) {
            return false;
        }
        self.memberships.insert(connection_id, HashSet::new());
        true
    }

    /// Add a connection to a room, creating the room if needed
    pub fn join(&mut self, connection_id: ConnectionId, room: &str) -> JoinOutcome {
        let Some(joined) = self.memberships.get_mut(&connection_id) else {
            return JoinOutcome::UnknownConnection;
        };

        if joined.contains(room) {
            return JoinOutcome::AlreadyMember;
        }

        let room = RoomId::from(room);
        joined.insert(room.clone());
        self.rooms.entry(room).or_default().insert(connection_id);
        JoinOutcome::Joined
    }

    /// Remove a connection from a room, deleting the room once empty
    pub fn leave(&mut self, connection_id: ConnectionId, room: &str) -> LeaveOutcome {
        let Some(joined) = self.memberships.get_mut(&connection_id) else {
            return LeaveOutcome::UnknownConnection;
        };

        if !joined.remove(room) {
            return LeaveOutcome::NotMember;
        }

        LeaveOutcome::Left {
            room_reclaimed: self.remove_member(room, connection_id),
        }
    }

    /// Drop a connection and all of its memberships
    ///
    /// Returns the rooms it was removed from, or `None` if it was not registered.
    pub fn unregister(&mut self, connection_id: ConnectionId) -> Option<Vec<RoomId>> {
        let joined = self.memberships.remove(&connection_id)?;

        let rooms: Vec<RoomId> = joined.into_iter().collect();
        for room in &rooms {
            self.remove_member(room.as_str(), connection_id);
        }

        Some(rooms)
    }

    /// Returns true if the room entry was deleted
    fn remove_member(&mut self, room: &str, connection_id: ConnectionId) -> bool {
        let Some(members) = self.rooms.get_mut(room) else {
            return false;
        };

        members.remove(&connection_id);
        if members.is_empty() {
            self.rooms.remove(room);
            true
        } else {
            false
        }
    }

    /// Current members of a room (empty for unknown rooms)
    pub fn members(&self, room: &str) -> impl Iterator<Item = ConnectionId> + '_ {
        self.rooms.get(room).into_iter().flatten().copied()
    }

    /// Rooms a connection has joined
    #[must_use]
    pub fn rooms_of(&self, connection_id: ConnectionId) -> Vec<RoomId> {
        self.memberships
            .get(&connection_id)
            .map(|rooms| rooms.iter().cloned().collect())
            .unwrap_or_default()
    }

    #[must_use]
    pub fn is_registered(&self, connection_id: ConnectionId) -> bool {
        self.memberships.contains_key(&connection_id)
    }

    #[must_use]
    pub fn member_count(&self, room: &str) -> usize {
        self.rooms.get(room).map_or(0, HashSet::len)
    }

    #[must_use]
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    #[must_use]
    pub fn connection_count(&self) -> usize {
        self.memberships.len()
    }
}

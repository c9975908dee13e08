//! Room identifiers

use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;

/// Separator used by [`room_key_for`]
pub const ROOM_KEY_SEPARATOR: &str = "-";

/// Key of a room (a station id, a sorted pair of user ids, or a static name)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    #[must_use]
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for RoomId {
    fn from(key: &str) -> Self {
        Self(key.to_string())
    }
}

impl From<String> for RoomId {
    fn from(key: String) -> Self {
        Self(key)
    }
}

impl Borrow<str> for RoomId {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Room key for a direct conversation between two participants
///
/// Both participants compute the same key regardless of who initiates:
/// the ids are sorted lexicographically and joined with `-`.
#[must_use]
pub fn room_key_for(a: &str, b: &str) -> RoomId {
    let (first, second) = if a <= b { (a, b) } else { (b, a) };
    RoomId(format!("{first}{ROOM_KEY_SEPARATOR}{second}"))
}

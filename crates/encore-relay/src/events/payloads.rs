//! Control event payloads
//!
//! Only the fields the relay itself acts on are modelled; anything else a
//! client sends along is ignored here and never validated.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Accept string or numeric identifiers, as clients send both
#[must_use]
pub fn key_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn de_opt_key<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Value>::deserialize(deserializer)?
        .as_ref()
        .and_then(key_from_value))
}

/// Room reference as clients send it: `roomId`, or the shorter `room`
///
/// When both are present `roomId` wins, matching the field the relay
/// acknowledges with.
#[derive(Debug, Deserialize)]
struct RoomRef {
    #[serde(rename = "roomId", default)]
    room_id: Option<Value>,
    #[serde(default)]
    room: Option<Value>,
}

impl RoomRef {
    fn resolve<E: serde::de::Error>(&self) -> Result<String, E> {
        self.room_id
            .as_ref()
            .and_then(key_from_value)
            .or_else(|| self.room.as_ref().and_then(key_from_value))
            .ok_or_else(|| E::custom("expected a non-empty roomId"))
    }
}

#[derive(Deserialize)]
struct RawJoinRoom {
    #[serde(rename = "roomId", default)]
    room_id: Option<Value>,
    #[serde(default)]
    room: Option<Value>,
    #[serde(rename = "userId", default, deserialize_with = "de_opt_key")]
    user_id: Option<String>,
    #[serde(default)]
    username: Option<String>,
}

/// Payload of `join_room`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoinRoomPayload {
    pub room_id: String,
    /// Application user id, recorded but never verified
    pub user_id: Option<String>,
    pub username: Option<String>,
}

impl<'de> Deserialize<'de> for JoinRoomPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = RawJoinRoom::deserialize(deserializer)?;
        let room = RoomRef {
            room_id: raw.room_id,
            room: raw.room,
        };
        Ok(Self {
            room_id: room.resolve()?,
            user_id: raw.user_id,
            username: raw.username,
        })
    }
}

/// Payload of `leave_room`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeaveRoomPayload {
    pub room_id: String,
}

impl<'de> Deserialize<'de> for LeaveRoomPayload {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let room = RoomRef::deserialize(deserializer)?;
        Ok(Self {
            room_id: room.resolve()?,
        })
    }
}

/// Payload of `room_joined` / `room_left` acknowledgements
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoomAckPayload {
    #[serde(rename = "roomId")]
    pub room_id: String,
}

//! Sync response model: the cursor plus invited / joined / left room deltas, and room events.
//!
//! Only the parts of `/sync` the bot loop reads are modelled; everything else in the payload is ignored.
//! Missing sections deserialize as empty so a sparse response is still valid.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Event type of a room message.
pub const ROOM_MESSAGE: &str = "m.room.message";
/// Event type of a membership change.
pub const ROOM_MEMBER: &str = "m.room.member";

/// A room event as delivered in a timeline or an invite-state snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    #[serde(rename = "type")]
    pub event_type: String,
    #[serde(default)]
    pub sender: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub state_key: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin_server_ts: Option<i64>,
    #[serde(default)]
    pub content: serde_json::Value,
}

impl Event {
    /// Text body of an `m.room.message`; `None` for any other event.
    pub fn body(&self) -> Option<&str> {
        if self.event_type != ROOM_MESSAGE {
            return None;
        }
        self.content.get("body").and_then(|v| v.as_str())
    }

    /// Membership value of an `m.room.member` event.
    pub fn membership(&self) -> Option<&str> {
        if self.event_type != ROOM_MEMBER {
            return None;
        }
        self.content.get("membership").and_then(|v| v.as_str())
    }
}

/// Response of one `/sync` call.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SyncResponse {
    /// Cursor to pass as `since` on the next call.
    pub next_batch: String,
    #[serde(default)]
    pub rooms: Rooms,
}

/// Room deltas keyed by room id. Ordered maps keep per-cycle processing deterministic.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Rooms {
    #[serde(default)]
    pub invite: BTreeMap<String, InvitedRoom>,
    #[serde(default)]
    pub join: BTreeMap<String, JoinedRoom>,
    #[serde(default)]
    pub leave: BTreeMap<String, LeftRoom>,
}

impl Rooms {
    pub fn is_empty(&self) -> bool {
        self.invite.is_empty() && self.join.is_empty() && self.leave.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EventList {
    #[serde(default)]
    pub events: Vec<Event>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Timeline {
    #[serde(default)]
    pub events: Vec<Event>,
    #[serde(default)]
    pub limited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prev_batch: Option<String>,
}

/// Room the bot has been invited to; carries the stripped invite state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvitedRoom {
    #[serde(default)]
    pub invite_state: EventList,
}

/// Room the bot is joined to; carries new timeline events.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JoinedRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

/// Room the bot has left or been removed from. Only its presence in the map matters.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LeftRoom {
    #[serde(default)]
    pub timeline: Timeline,
}

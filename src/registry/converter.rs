//! Converts raw registry room records into [`RoomSummary`] values.
//!
//! ## Mapping
//! | Raw field                                   | RoomSummary field          | Notes                          |
//! |---------------------------------------------|----------------------------|--------------------------------|
//! | `name`                                      | `name`                     | Later duplicates are dropped   |
//! | `num_participants` / `numParticipants`      | `participant_count`        | Omitted means 0                |
//! | `creation_time` / `creationTime`            | `created_at_epoch_seconds` | Number or numeric string       |

use std::collections::HashSet;

use serde::{Deserialize, Deserializer, Serialize};

/// One live session as shown in the directory.
///
/// Serialized with the field names browser clients already expect
/// (`numParticipants`, `creationTime`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoomSummary {
    pub name: String,
    #[serde(rename = "numParticipants")]
    pub participant_count: u32,
    #[serde(rename = "creationTime")]
    pub created_at_epoch_seconds: i64,
}

/// A room record as the registry sends it. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawRoom {
    #[serde(default)]
    pub name: String,
    #[serde(default, alias = "numParticipants")]
    pub num_participants: u32,
    #[serde(default, alias = "creationTime", deserialize_with = "epoch_seconds")]
    pub creation_time: i64,
}

/// Body of a `ListRooms` reply. An empty list may be omitted entirely.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRoomsResponse {
    #[serde(default)]
    pub rooms: Vec<RawRoom>,
}

impl From<RawRoom> for RoomSummary {
    fn from(raw: RawRoom) -> Self {
        RoomSummary {
            name: raw.name,
            participant_count: raw.num_participants,
            created_at_epoch_seconds: raw.creation_time,
        }
    }
}

/// Keep rooms with at least one participant, in registry order.
///
/// Names are unique in the result; if the registry repeats a name the first
/// record wins. Records without a name cannot be joined and are skipped.
pub fn active_rooms(raw: Vec<RawRoom>) -> Vec<RoomSummary> {
    let mut seen = HashSet::new();
    raw.into_iter()
        .filter(|room| room.num_participants > 0 && !room.name.is_empty())
        .filter(|room| seen.insert(room.name.clone()))
        .map(RoomSummary::from)
        .collect()
}

/// Protobuf JSON renders int64 as a string; older servers send a number.
fn epoch_seconds<'de, D>(deserializer: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum NumOrString {
        Num(i64),
        Float(f64),
        Str(String),
    }

    match NumOrString::deserialize(deserializer)? {
        NumOrString::Num(n) => Ok(n),
        NumOrString::Float(f) => Ok(f as i64),
        NumOrString::Str(s) if s.trim().is_empty() => Ok(0),
        NumOrString::Str(s) => s.trim().parse::<i64>().map_err(serde::de::Error::custom),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

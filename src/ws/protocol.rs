//! WebSocket protocol message definitions
//! These are the wire types for client-server communication.
//!
//! Every frame is a JSON object `{"event": "<name>", "data": {...}}` where the
//! event name is the human-readable label the browser client listens on.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Connection-scoped player identifier
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnId(String);

impl ConnId {
    /// Fresh id for a newly accepted connection
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ConnId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ConnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Round-scoped object identifier, `{prefix}{index}` (e.g. `G0`, `ER3`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ObjectId(String);

impl ObjectId {
    pub fn new(prefix: &str, index: usize) -> Self {
        Self(format!("{prefix}{index}"))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ObjectId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl fmt::Display for ObjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ClientMsg {
    /// Spawn the local player at its chosen start position
    #[serde(rename = "new player")]
    NewPlayer { x: f64, y: f64 },

    #[serde(rename = "move player")]
    MovePlayer { x: f64, y: f64 },

    #[serde(rename = "dead player")]
    DeadPlayer {},

    /// `shot_id` is the victim, `shooter_id` the player credited with the hit
    #[serde(rename = "player shot", rename_all = "camelCase")]
    PlayerShot { shot_id: ConnId, shooter_id: ConnId },

    /// Request final score computation under a display name
    #[serde(rename = "player score", rename_all = "camelCase")]
    PlayerScore { player_name: String },

    #[serde(rename = "catch object", rename_all = "camelCase")]
    CatchObject { object_id: ObjectId },

    #[serde(rename = "drop object", rename_all = "camelCase")]
    DropObject { object_id: ObjectId, x: f64, y: f64 },

    #[serde(rename = "object used", rename_all = "camelCase")]
    ObjectUsed { object_id: ObjectId, x: f64, y: f64 },

    #[serde(rename = "object fixed", rename_all = "camelCase")]
    ObjectFixed { object_id: ObjectId },

    /// Resource warning (oxygen, food, ...), relayed without mutation
    #[serde(rename = "low level")]
    LowLevel { kind: String },

    /// Round completion; regenerates the world for everyone
    #[serde(rename = "the end")]
    TheEnd {},
}

impl ClientMsg {
    /// Wire event name, used for log fields
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::NewPlayer { .. } => "new player",
            Self::MovePlayer { .. } => "move player",
            Self::DeadPlayer {} => "dead player",
            Self::PlayerShot { .. } => "player shot",
            Self::PlayerScore { .. } => "player score",
            Self::CatchObject { .. } => "catch object",
            Self::DropObject { .. } => "drop object",
            Self::ObjectUsed { .. } => "object used",
            Self::ObjectFixed { .. } => "object fixed",
            Self::LowLevel { .. } => "low level",
            Self::TheEnd {} => "the end",
        }
    }
}

/// Messages sent from server to client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data")]
pub enum ServerMsg {
    /// Identity assigned to the receiving connection
    #[serde(rename = "your id")]
    YourId { id: ConnId },

    #[serde(rename = "new player")]
    NewPlayer(PlayerInfo),

    /// One entry of an object snapshot
    #[serde(rename = "new object")]
    NewObject(ObjectInfo),

    #[serde(rename = "move player")]
    MovePlayer { id: ConnId, x: f64, y: f64 },

    #[serde(rename = "remove player")]
    RemovePlayer { id: ConnId },

    /// `stats` is empty until the player's score has been finalized
    #[serde(rename = "dead player")]
    DeadPlayer { id: ConnId, stats: Option<FinalStats> },

    #[serde(rename = "player shot", rename_all = "camelCase")]
    PlayerShot { shot_id: ConnId, shooter_id: ConnId },

    /// Reply to `player score`, sent to the requester only
    #[serde(rename = "highscores")]
    Highscores {
        scores: Vec<ScoreEntry>,
        stats: FinalStats,
    },

    #[serde(rename = "catch object", rename_all = "camelCase")]
    CatchObject { id: ConnId, object_id: ObjectId },

    #[serde(rename = "drop object", rename_all = "camelCase")]
    DropObject {
        id: ConnId,
        object_id: ObjectId,
        x: f64,
        y: f64,
    },

    #[serde(rename = "object used", rename_all = "camelCase")]
    ObjectUsed {
        id: ConnId,
        object_id: ObjectId,
        x: f64,
        y: f64,
    },

    #[serde(rename = "object fixed", rename_all = "camelCase")]
    ObjectFixed { id: ConnId, object_id: ObjectId },

    #[serde(rename = "low level")]
    LowLevel { id: ConnId, kind: String },

    /// Round reset: clear local objects and wait for a fresh snapshot
    #[serde(rename = "the end")]
    TheEnd {},
}

/// Player entry of a roster
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlayerInfo {
    pub id: ConnId,
    pub x: f64,
    pub y: f64,
    pub dead: bool,
}

/// Object entry of a snapshot
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObjectInfo {
    pub id: ObjectId,
    pub x: f64,
    pub y: f64,
    pub on_player: bool,
    pub used: bool,
    pub fixed: bool,
}

/// Leaderboard row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreEntry {
    pub name: String,
    pub score: f64,
}

/// Full stat breakdown computed when a player's round ends
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FinalStats {
    pub name: String,
    pub exploration: f64,
    pub move_amount: f64,
    pub objects_count: u32,
    pub objects_fixed: u32,
    pub players_shot_points: u32,
    pub start_time: DateTime<Utc>,
    /// Seconds between session start and death / round end
    pub play_time: i64,
    pub score: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_client_events_use_spaced_names_and_camel_case_fields() {
        let msg: ClientMsg = serde_json::from_value(json!({
            "event": "player shot",
            "data": { "shotId": "victim", "shooterId": "shooter" }
        }))
        .unwrap();

        match msg {
            ClientMsg::PlayerShot { shot_id, shooter_id } => {
                assert_eq!(shot_id.as_str(), "victim");
                assert_eq!(shooter_id.as_str(), "shooter");
            }
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_empty_payload_events_parse() {
        let msg: ClientMsg =
            serde_json::from_value(json!({ "event": "the end", "data": {} })).unwrap();
        assert!(matches!(msg, ClientMsg::TheEnd {}));

        let msg: ClientMsg =
            serde_json::from_value(json!({ "event": "dead player", "data": {} })).unwrap();
        assert_eq!(msg.event_name(), "dead player");
    }

    #[test]
    fn test_unknown_event_is_rejected() {
        let parsed = serde_json::from_value::<ClientMsg>(json!({
            "event": "teleport",
            "data": { "x": 1.0 }
        }));
        assert!(parsed.is_err());
    }

    #[test]
    fn test_object_snapshot_shape() {
        let msg = ServerMsg::NewObject(ObjectInfo {
            id: ObjectId::new("G", 2),
            x: 10.0,
            y: 300.0,
            on_player: false,
            used: false,
            fixed: true,
        });

        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["event"], "new object");
        assert_eq!(value["data"]["id"], "G2");
        assert_eq!(value["data"]["onPlayer"], false);
        assert_eq!(value["data"]["fixed"], true);
    }

    #[test]
    fn test_dead_player_without_stats_serializes_null() {
        let msg = ServerMsg::DeadPlayer {
            id: ConnId::from("p1"),
            stats: None,
        };
        let value = serde_json::to_value(&msg).unwrap();
        assert_eq!(value["data"]["id"], "p1");
        assert!(value["data"]["stats"].is_null());
    }
}

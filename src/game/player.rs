//! Player state held by the registry

use chrono::{DateTime, Utc};

use crate::ws::protocol::{ConnId, FinalStats, ObjectId, PlayerInfo};

/// Player state in the world (authoritative)
#[derive(Debug, Clone, PartialEq)]
pub struct Player {
    pub id: ConnId,

    // Position, only ever written by the player's own connection
    pub x: f64,
    pub y: f64,

    /// At most one carried object
    pub carrying: Option<ObjectId>,

    // Session counters
    pub objects_picked: u32,
    pub objects_fixed: u32,
    pub hits_scored: u32,
    /// Furthest horizontal distance from the origin reached this session
    pub exploration: f64,
    /// Total distance travelled (|dx| + |dy| per move)
    pub move_amount: f64,
    pub started_at: DateTime<Utc>,
    pub play_time_secs: i64,
    pub dead: bool,
    pub final_stats: Option<FinalStats>,
}

impl Player {
    pub fn new(id: ConnId, x: f64, y: f64, now: DateTime<Utc>) -> Self {
        Self {
            id,
            x,
            y,
            carrying: None,
            objects_picked: 0,
            objects_fixed: 0,
            hits_scored: 0,
            exploration: x.abs(),
            move_amount: 0.0,
            started_at: now,
            play_time_secs: 0,
            dead: false,
            final_stats: None,
        }
    }

    /// Overwrite the position and accumulate movement statistics
    pub fn move_to(&mut self, x: f64, y: f64) {
        self.move_amount += (x - self.x).abs() + (y - self.y).abs();
        self.exploration = self.exploration.max(x.abs());
        self.x = x;
        self.y = y;
    }

    /// Recompute elapsed session time
    pub fn stamp_play_time(&mut self, now: DateTime<Utc>) {
        self.play_time_secs = (now - self.started_at).num_seconds().max(0);
    }

    pub fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            x: self.x,
            y: self.y,
            dead: self.dead,
        }
    }
}

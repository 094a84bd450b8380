//! World state and the actor that serializes every mutation

pub mod actor;
pub mod object;
pub mod player;
pub mod registry;
pub mod round;
pub mod scoring;

pub use actor::{WorldActor, WorldHandle};
pub use registry::{Audience, Outbound, Rules, WorldError, WorldRegistry};

use chrono::{DateTime, Utc};
use tokio::sync::oneshot;

use crate::ws::protocol::{ClientMsg, ConnId, ScoreEntry};

/// Commands accepted by the world actor
#[derive(Debug)]
pub enum WorldCommand {
    /// Event received from a WebSocket connection
    Client {
        conn_id: ConnId,
        msg: ClientMsg,
        received_at: DateTime<Utc>,
    },
    /// Transport-level disconnect
    Disconnect { conn_id: ConnId },
    /// Read-only leaderboard query
    Leaderboard {
        reply: oneshot::Sender<Vec<ScoreEntry>>,
    },
}

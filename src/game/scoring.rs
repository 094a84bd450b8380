//! Score computation and the in-memory leaderboard

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use crate::ws::protocol::{FinalStats, ScoreEntry};

use super::player::Player;

/// Derived score for a finished session.
///
/// `exploration/2 + 70*fixed + 200*hits - play_time - picked/2`
pub fn compute_score(player: &Player) -> f64 {
    player.exploration / 2.0 + 70.0 * f64::from(player.objects_fixed)
        + 200.0 * f64::from(player.hits_scored)
        - player.play_time_secs as f64
        - f64::from(player.objects_picked) / 2.0
}

/// Leaderboard plus the unordered history of stat breakdowns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Scoreboard {
    pub scores: Vec<ScoreEntry>,
    pub stats: Vec<FinalStats>,
}

impl Scoreboard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Compute and record the final score of `player` under `name`.
    /// Returns the stat breakdown; the leaderboard stays sorted descending.
    pub fn finalize(&mut self, player: &Player, name: &str) -> FinalStats {
        let score = compute_score(player);
        let stats = FinalStats {
            name: name.to_string(),
            exploration: player.exploration,
            move_amount: player.move_amount,
            objects_count: player.objects_picked,
            objects_fixed: player.objects_fixed,
            players_shot_points: player.hits_scored,
            start_time: player.started_at,
            play_time: player.play_time_secs,
            score,
        };

        self.stats.push(stats.clone());
        self.scores.push(ScoreEntry {
            name: name.to_string(),
            score,
        });
        // Stable: equal scores keep insertion order
        self.scores
            .sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(Ordering::Equal));

        stats
    }

    pub fn leaderboard(&self) -> &[ScoreEntry] {
        &self.scores
    }
}

//! Authoritative world registry and its event mutation rules.
//!
//! Every handler validates the entities it references before touching any
//! state, so a failed lookup never leaves the registry partially mutated and
//! never produces a broadcast. Successful handlers return the envelopes the
//! caller must deliver, in order.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::ws::protocol::{ConnId, FinalStats, ObjectId, ObjectInfo, PlayerInfo, ServerMsg};

use super::object::WorldObject;
use super::player::Player;
use super::round::RoundGenerator;
use super::scoring::Scoreboard;

/// Who receives an outbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    Everyone,
    /// Everyone except the originating connection
    Others(ConnId),
    Only(ConnId),
}

impl Audience {
    pub fn includes(&self, conn: &ConnId) -> bool {
        match self {
            Self::Everyone => true,
            Self::Others(origin) => origin != conn,
            Self::Only(target) => target == conn,
        }
    }
}

/// Addressed server message
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub audience: Audience,
    pub msg: ServerMsg,
}

impl Outbound {
    pub fn everyone(msg: ServerMsg) -> Self {
        Self {
            audience: Audience::Everyone,
            msg,
        }
    }

    pub fn others(origin: &ConnId, msg: ServerMsg) -> Self {
        Self {
            audience: Audience::Others(origin.clone()),
            msg,
        }
    }

    pub fn only(target: &ConnId, msg: ServerMsg) -> Self {
        Self {
            audience: Audience::Only(target.clone()),
            msg,
        }
    }
}

/// Reasons a handler abandons an event
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum WorldError {
    #[error("player not found: {0}")]
    PlayerNotFound(ConnId),

    #[error("object not found: {0}")]
    ObjectNotFound(ObjectId),

    #[error("object {object_id} unavailable: {reason}")]
    ObjectUnavailable {
        object_id: ObjectId,
        reason: &'static str,
    },
}

impl WorldError {
    /// Whether this is an unknown-entity diagnostic
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::PlayerNotFound(_) | Self::ObjectNotFound(_))
    }
}

/// Behaviour switches with no single right answer
#[derive(Debug, Clone, Copy, Default)]
pub struct Rules {
    /// Allow claiming an object whose `used` flag is set. Off by default, so
    /// a consumed object stays out of play until the round ends.
    pub allow_used_reclaim: bool,
}

/// Result of registering a player
#[derive(Debug, Clone)]
pub struct Joined {
    pub id: ConnId,
    /// Everyone else currently in the world
    pub roster: Vec<PlayerInfo>,
    pub objects: Vec<ObjectInfo>,
    announce: PlayerInfo,
    /// Drop of the object a re-registering player was still carrying
    dropped: Option<Outbound>,
}

impl Joined {
    /// Envelopes in delivery order: any drop left over from a previous
    /// session, announcement to the others, identity, roster and object
    /// snapshot to the newcomer
    pub fn into_outbound(self) -> Vec<Outbound> {
        let mut out = Vec::with_capacity(3 + self.roster.len() + self.objects.len());
        out.extend(self.dropped);
        out.push(Outbound::others(&self.id, ServerMsg::NewPlayer(self.announce)));
        out.push(Outbound::only(
            &self.id,
            ServerMsg::YourId {
                id: self.id.clone(),
            },
        ));
        for player in self.roster {
            out.push(Outbound::only(&self.id, ServerMsg::NewPlayer(player)));
        }
        for object in self.objects {
            out.push(Outbound::only(&self.id, ServerMsg::NewObject(object)));
        }
        out
    }
}

type HandlerResult = Result<Vec<Outbound>, WorldError>;

/// Registry state (owned by the world actor)
pub struct WorldRegistry {
    players: HashMap<ConnId, Player>,
    objects: Vec<WorldObject>,
    generator: RoundGenerator,
    scoreboard: Scoreboard,
    rules: Rules,
    round: u64,
}

impl WorldRegistry {
    pub fn new(mut generator: RoundGenerator, rules: Rules) -> Self {
        let objects = generator.generate();
        Self {
            players: HashMap::new(),
            objects,
            generator,
            scoreboard: Scoreboard::new(),
            rules,
            round: 1,
        }
    }

    pub fn player(&self, id: &ConnId) -> Option<&Player> {
        self.players.get(id)
    }

    pub fn object(&self, id: &ObjectId) -> Option<&WorldObject> {
        self.objects.iter().find(|o| &o.id == id)
    }

    pub fn objects(&self) -> &[WorldObject] {
        &self.objects
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    pub fn round(&self) -> u64 {
        self.round
    }

    pub fn scoreboard(&self) -> &Scoreboard {
        &self.scoreboard
    }

    /// Seed the leaderboard from persisted history
    pub fn restore_scores(&mut self, scoreboard: Scoreboard) {
        self.scoreboard = scoreboard;
    }

    fn find_player(&self, id: &ConnId) -> Result<&Player, WorldError> {
        self.players
            .get(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))
    }

    fn object_index(&self, id: &ObjectId) -> Result<usize, WorldError> {
        self.objects
            .iter()
            .position(|o| &o.id == id)
            .ok_or_else(|| WorldError::ObjectNotFound(id.clone()))
    }

    /// Create a player at its spawn position. A connection that registers
    /// again is re-spawned with a fresh session.
    pub fn register_player(&mut self, id: ConnId, x: f64, y: f64, now: DateTime<Utc>) -> Joined {
        let dropped = if self.players.contains_key(&id) {
            info!(conn_id = %id, "Player re-registered, starting a fresh session");
            self.release_carried(&id)
        } else {
            None
        };

        let roster = self
            .players
            .values()
            .filter(|p| p.id != id)
            .map(Player::info)
            .collect();
        let objects = self.objects.iter().map(WorldObject::info).collect();

        let player = Player::new(id.clone(), x, y, now);
        let announce = player.info();
        self.players.insert(id.clone(), player);

        info!(conn_id = %id, x, y, player_count = self.players.len(), "Player joined");

        Joined {
            id,
            roster,
            objects,
            announce,
            dropped,
        }
    }

    /// Delete a player. A carried object is dropped where the player stood.
    pub fn remove_player(&mut self, id: &ConnId) -> HandlerResult {
        let player = self
            .players
            .remove(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))?;

        let mut out = Vec::new();
        if let Some(object_id) = &player.carrying {
            if let Some(object) = self.objects.iter_mut().find(|o| &o.id == object_id) {
                object.held_by = None;
                object.x = player.x;
                object.y = player.y;
                out.push(Outbound::others(
                    id,
                    ServerMsg::DropObject {
                        id: id.clone(),
                        object_id: object.id.clone(),
                        x: object.x,
                        y: object.y,
                    },
                ));
            }
        }

        out.push(Outbound::others(id, ServerMsg::RemovePlayer { id: id.clone() }));
        info!(conn_id = %id, player_count = self.players.len(), "Player left");
        Ok(out)
    }

    pub fn move_player(&mut self, id: &ConnId, x: f64, y: f64) -> HandlerResult {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))?;

        player.move_to(x, y);

        Ok(vec![Outbound::others(
            id,
            ServerMsg::MovePlayer {
                id: id.clone(),
                x,
                y,
            },
        )])
    }

    pub fn mark_dead(&mut self, id: &ConnId, now: DateTime<Utc>) -> HandlerResult {
        let player = self
            .players
            .get_mut(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))?;

        player.dead = true;
        player.stamp_play_time(now);
        info!(conn_id = %id, play_time = player.play_time_secs, "Player died");

        Ok(vec![Outbound::others(
            id,
            ServerMsg::DeadPlayer {
                id: id.clone(),
                stats: player.final_stats.clone(),
            },
        )])
    }

    /// Credit `shooter` with a hit on `victim`. Both must exist.
    pub fn record_hit(&mut self, origin: &ConnId, victim: &ConnId, shooter: &ConnId) -> HandlerResult {
        self.find_player(victim)?;
        let shooter_player = self
            .players
            .get_mut(shooter)
            .ok_or_else(|| WorldError::PlayerNotFound(shooter.clone()))?;

        shooter_player.hits_scored += 1;
        debug!(shooter = %shooter, victim = %victim, "Hit recorded");

        Ok(vec![Outbound::others(
            origin,
            ServerMsg::PlayerShot {
                shot_id: victim.clone(),
                shooter_id: shooter.clone(),
            },
        )])
    }

    /// Pick up an object. A different object already carried is dropped at
    /// the claimed object's position first.
    pub fn claim_object(&mut self, id: &ConnId, object_id: &ObjectId) -> HandlerResult {
        let player = self.find_player(id)?;
        let target = self.object_index(object_id)?;
        let previous = player.carrying.clone();

        let object = &self.objects[target];
        if object.is_held_by_other(id) {
            return Err(WorldError::ObjectUnavailable {
                object_id: object_id.clone(),
                reason: "held by another player",
            });
        }
        if object.used && !self.rules.allow_used_reclaim {
            return Err(WorldError::ObjectUnavailable {
                object_id: object_id.clone(),
                reason: "already used",
            });
        }
        if previous.as_ref() == Some(object_id) {
            debug!(conn_id = %id, object_id = %object_id, "Object already carried");
            return Ok(Vec::new());
        }

        let (claim_x, claim_y) = (object.x, object.y);
        let mut out = Vec::new();

        if let Some(previous) = previous {
            if let Some(dropped) = self.objects.iter_mut().find(|o| o.id == previous) {
                dropped.held_by = None;
                dropped.x = claim_x;
                dropped.y = claim_y;
                out.push(Outbound::everyone(ServerMsg::DropObject {
                    id: id.clone(),
                    object_id: previous,
                    x: claim_x,
                    y: claim_y,
                }));
            }
        }

        self.objects[target].held_by = Some(id.clone());
        if let Some(player) = self.players.get_mut(id) {
            player.carrying = Some(object_id.clone());
            player.objects_picked += 1;
        }

        out.push(Outbound::others(
            id,
            ServerMsg::CatchObject {
                id: id.clone(),
                object_id: object_id.clone(),
            },
        ));
        Ok(out)
    }

    pub fn release_object(&mut self, id: &ConnId, object_id: &ObjectId, x: f64, y: f64) -> HandlerResult {
        self.put_down(id, object_id, x, y, false)?;
        Ok(vec![Outbound::others(
            id,
            ServerMsg::DropObject {
                id: id.clone(),
                object_id: object_id.clone(),
                x,
                y,
            },
        )])
    }

    /// Like release, and the object is permanently marked used
    pub fn consume_object(&mut self, id: &ConnId, object_id: &ObjectId, x: f64, y: f64) -> HandlerResult {
        self.put_down(id, object_id, x, y, true)?;
        info!(conn_id = %id, object_id = %object_id, "Object used");
        Ok(vec![Outbound::others(
            id,
            ServerMsg::ObjectUsed {
                id: id.clone(),
                object_id: object_id.clone(),
                x,
                y,
            },
        )])
    }

    fn put_down(&mut self, id: &ConnId, object_id: &ObjectId, x: f64, y: f64, used: bool) -> Result<(), WorldError> {
        self.find_player(id)?;
        let index = self.object_index(object_id)?;
        if self.objects[index].is_held_by_other(id) {
            return Err(WorldError::ObjectUnavailable {
                object_id: object_id.clone(),
                reason: "held by another player",
            });
        }

        let object = &mut self.objects[index];
        object.held_by = None;
        object.x = x;
        object.y = y;
        object.used |= used;

        if let Some(player) = self.players.get_mut(id) {
            if player.carrying.as_ref() == Some(object_id) {
                player.carrying = None;
            }
        }
        Ok(())
    }

    pub fn repair_object(&mut self, id: &ConnId, object_id: &ObjectId) -> HandlerResult {
        self.find_player(id)?;
        let index = self.object_index(object_id)?;
        if !self.objects[index].kind.is_repairable() {
            return Err(WorldError::ObjectUnavailable {
                object_id: object_id.clone(),
                reason: "not repairable",
            });
        }

        self.objects[index].fixed = true;
        if let Some(player) = self.players.get_mut(id) {
            player.objects_fixed += 1;
        }
        info!(conn_id = %id, object_id = %object_id, "Object fixed");

        Ok(vec![Outbound::others(
            id,
            ServerMsg::ObjectFixed {
                id: id.clone(),
                object_id: object_id.clone(),
            },
        )])
    }

    /// Relay a resource warning; no state changes
    pub fn report_low_resource(&self, id: &ConnId, kind: &str) -> HandlerResult {
        self.find_player(id)?;
        Ok(vec![Outbound::others(
            id,
            ServerMsg::LowLevel {
                id: id.clone(),
                kind: kind.to_string(),
            },
        )])
    }

    /// Replace the whole object set with a fresh layout. The reset signal goes
    /// to the others; the new snapshot goes to everyone.
    pub fn end_round(&mut self, id: &ConnId, now: DateTime<Utc>) -> HandlerResult {
        self.find_player(id)?;

        let objects = self.generator.generate();
        self.objects = objects;
        self.round += 1;

        for player in self.players.values_mut() {
            player.carrying = None;
        }
        if let Some(player) = self.players.get_mut(id) {
            player.stamp_play_time(now);
        }

        info!(
            conn_id = %id,
            round = self.round,
            object_count = self.objects.len(),
            "Round ended, world regenerated"
        );

        let mut out = Vec::with_capacity(1 + self.objects.len());
        out.push(Outbound::others(id, ServerMsg::TheEnd {}));
        out.extend(
            self.objects
                .iter()
                .map(|o| Outbound::everyone(ServerMsg::NewObject(o.info()))),
        );
        Ok(out)
    }

    /// Compute the player's final score and reply with the full leaderboard
    pub fn finalize_score(&mut self, id: &ConnId, name: &str) -> Result<(FinalStats, Vec<Outbound>), WorldError> {
        let player = self
            .players
            .get(id)
            .ok_or_else(|| WorldError::PlayerNotFound(id.clone()))?;
        let stats = self.scoreboard.finalize(player, name);
        if let Some(player) = self.players.get_mut(id) {
            player.final_stats = Some(stats.clone());
        }
        info!(conn_id = %id, name, score = stats.score, "Score finalized");

        let reply = Outbound::only(
            id,
            ServerMsg::Highscores {
                scores: self.scoreboard.scores.clone(),
                stats: stats.clone(),
            },
        );
        Ok((stats, vec![reply]))
    }

    /// Put down whatever the player carries where it stands
    fn release_carried(&mut self, id: &ConnId) -> Option<Outbound> {
        let player = self.players.get_mut(id)?;
        let object_id = player.carrying.take()?;
        let (x, y) = (player.x, player.y);

        let object = self.objects.iter_mut().find(|o| o.id == object_id)?;
        object.held_by = None;
        object.x = x;
        object.y = y;

        Some(Outbound::others(
            id,
            ServerMsg::DropObject {
                id: id.clone(),
                object_id,
                x,
                y,
            },
        ))
    }
}

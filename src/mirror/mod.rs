//! Client-side mirror of the world
//!
//! Applies server events to a local view the way a game client does. Events
//! can arrive for ids the mirror has not seen yet (a claim racing the object
//! snapshot, a move for a player that already left); those are logged and
//! skipped, never fatal.

use std::collections::HashMap;

use tracing::{debug, warn};

use crate::ws::protocol::{ConnId, FinalStats, ObjectId, ObjectInfo, PlayerInfo, ScoreEntry, ServerMsg};

/// Object as seen by one client
#[derive(Debug, Clone, PartialEq)]
pub struct MirrorObject {
    pub info: ObjectInfo,
    /// Last player reported as holding it
    pub holder: Option<ConnId>,
}

/// Local view of the world held by one connection
#[derive(Debug, Default)]
pub struct ClientMirror {
    local_id: Option<ConnId>,
    players: HashMap<ConnId, PlayerInfo>,
    objects: HashMap<ObjectId, MirrorObject>,
    highscores: Option<(Vec<ScoreEntry>, FinalStats)>,
    hits_taken: u32,
}

impl ClientMirror {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn local_id(&self) -> Option<&ConnId> {
        self.local_id.as_ref()
    }

    /// Remote players only
    pub fn players(&self) -> &HashMap<ConnId, PlayerInfo> {
        &self.players
    }

    pub fn player(&self, id: &ConnId) -> Option<&PlayerInfo> {
        self.players.get(id)
    }

    pub fn objects(&self) -> &HashMap<ObjectId, MirrorObject> {
        &self.objects
    }

    pub fn object(&self, id: &ObjectId) -> Option<&MirrorObject> {
        self.objects.get(id)
    }

    pub fn highscores(&self) -> Option<&(Vec<ScoreEntry>, FinalStats)> {
        self.highscores.as_ref()
    }

    pub fn hits_taken(&self) -> u32 {
        self.hits_taken
    }

    fn is_local(&self, id: &ConnId) -> bool {
        self.local_id.as_ref() == Some(id)
    }

    /// Apply one server event. Returns whether the local view changed.
    pub fn apply(&mut self, msg: &ServerMsg) -> bool {
        match msg {
            ServerMsg::YourId { id } => {
                self.local_id = Some(id.clone());
                true
            }
            ServerMsg::NewPlayer(info) => {
                if self.is_local(&info.id) {
                    return false;
                }
                self.players.insert(info.id.clone(), info.clone());
                true
            }
            ServerMsg::NewObject(info) => {
                self.objects.insert(
                    info.id.clone(),
                    MirrorObject {
                        info: info.clone(),
                        holder: None,
                    },
                );
                true
            }
            ServerMsg::MovePlayer { id, x, y } => match self.players.get_mut(id) {
                Some(player) => {
                    player.x = *x;
                    player.y = *y;
                    true
                }
                None => unknown_player("move player", id),
            },
            ServerMsg::RemovePlayer { id } => match self.players.remove(id) {
                Some(_) => {
                    // Objects it held were dropped by a preceding event; clear stale links
                    for object in self.objects.values_mut() {
                        if object.holder.as_ref() == Some(id) {
                            object.holder = None;
                            object.info.on_player = false;
                        }
                    }
                    true
                }
                None => unknown_player("remove player", id),
            },
            ServerMsg::DeadPlayer { id, .. } => match self.players.get_mut(id) {
                Some(player) => {
                    player.dead = true;
                    true
                }
                None => unknown_player("dead player", id),
            },
            ServerMsg::PlayerShot { shot_id, .. } => {
                if self.is_local(shot_id) {
                    self.hits_taken += 1;
                    true
                } else if self.players.contains_key(shot_id) {
                    false
                } else {
                    unknown_player("player shot", shot_id)
                }
            }
            ServerMsg::Highscores { scores, stats } => {
                self.highscores = Some((scores.clone(), stats.clone()));
                true
            }
            ServerMsg::CatchObject { id, object_id } => {
                self.update_object("catch object", object_id, |object| {
                    object.info.on_player = true;
                    object.holder = Some(id.clone());
                })
            }
            ServerMsg::DropObject {
                object_id, x, y, ..
            } => self.update_object("drop object", object_id, |object| {
                object.info.on_player = false;
                object.holder = None;
                object.info.x = *x;
                object.info.y = *y;
            }),
            ServerMsg::ObjectUsed {
                object_id, x, y, ..
            } => self.update_object("object used", object_id, |object| {
                object.info.on_player = false;
                object.holder = None;
                object.info.used = true;
                object.info.x = *x;
                object.info.y = *y;
            }),
            ServerMsg::ObjectFixed { object_id, .. } => {
                self.update_object("object fixed", object_id, |object| {
                    object.info.fixed = true;
                })
            }
            ServerMsg::LowLevel { id, kind } => {
                if !self.players.contains_key(id) && !self.is_local(id) {
                    return unknown_player("low level", id);
                }
                debug!(player = %id, kind = %kind, "Low resource warning");
                false
            }
            ServerMsg::TheEnd {} => {
                self.begin_round();
                true
            }
        }
    }

    /// Forget the object layout; a fresh snapshot follows. The client that
    /// ends a round calls this itself since the reset is not echoed to it.
    pub fn begin_round(&mut self) {
        self.objects.clear();
    }

    fn update_object<F>(&mut self, event: &'static str, object_id: &ObjectId, update: F) -> bool
    where
        F: FnOnce(&mut MirrorObject),
    {
        match self.objects.get_mut(object_id) {
            Some(object) => {
                update(object);
                true
            }
            None => {
                warn!(event, object_id = %object_id, "Event for unknown object ignored");
                false
            }
        }
    }
}

fn unknown_player(event: &'static str, id: &ConnId) -> bool {
    warn!(event, player = %id, "Event for unknown player ignored");
    false
}

//! World actor: the single writer of the registry

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::{debug, info, warn};

use crate::store::{ScoreArchive, ScoreStore};
use crate::ws::protocol::{ClientMsg, ConnId, ScoreEntry};

use super::registry::{Outbound, WorldError, WorldRegistry};
use super::WorldCommand;

/// Bounded command queue depth
const COMMAND_QUEUE: usize = 256;
/// Envelopes kept for slow readers; a join or round reset emits one per object
const OUTBOUND_BUFFER: usize = 1024;

/// Counters published by the actor for health reporting
#[derive(Debug, Default)]
struct WorldGauges {
    connected: AtomicUsize,
    players: AtomicUsize,
    objects: AtomicUsize,
    round: AtomicU64,
}

/// Cloneable handle to the running world
#[derive(Clone)]
pub struct WorldHandle {
    pub input_tx: mpsc::Sender<WorldCommand>,
    pub outbound_tx: broadcast::Sender<Outbound>,
    gauges: Arc<WorldGauges>,
}

impl WorldHandle {
    /// Receive every envelope emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<Outbound> {
        self.outbound_tx.subscribe()
    }

    pub fn connection_opened(&self) {
        self.gauges.connected.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.gauges.connected.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn connected(&self) -> usize {
        self.gauges.connected.load(Ordering::Relaxed)
    }

    pub fn player_count(&self) -> usize {
        self.gauges.players.load(Ordering::Relaxed)
    }

    pub fn object_count(&self) -> usize {
        self.gauges.objects.load(Ordering::Relaxed)
    }

    pub fn round(&self) -> u64 {
        self.gauges.round.load(Ordering::Relaxed)
    }

    /// Current sorted leaderboard, `None` if the actor has stopped
    pub async fn leaderboard(&self) -> Option<Vec<ScoreEntry>> {
        let (reply, rx) = oneshot::channel();
        self.input_tx
            .send(WorldCommand::Leaderboard { reply })
            .await
            .ok()?;
        rx.await.ok()
    }
}

/// The authoritative world
pub struct WorldActor {
    registry: WorldRegistry,
    input_rx: mpsc::Receiver<WorldCommand>,
    outbound_tx: broadcast::Sender<Outbound>,
    store: Arc<dyn ScoreStore>,
    /// Latest archive for the saver task, set once `run` starts
    saves: Option<watch::Sender<ScoreArchive>>,
    gauges: Arc<WorldGauges>,
}

impl WorldActor {
    pub fn new(registry: WorldRegistry, store: Arc<dyn ScoreStore>) -> (Self, WorldHandle) {
        let (input_tx, input_rx) = mpsc::channel(COMMAND_QUEUE);
        let (outbound_tx, _) = broadcast::channel(OUTBOUND_BUFFER);
        let gauges = Arc::new(WorldGauges::default());

        let handle = WorldHandle {
            input_tx,
            outbound_tx: outbound_tx.clone(),
            gauges: gauges.clone(),
        };

        let actor = Self {
            registry,
            input_rx,
            outbound_tx,
            store,
            saves: None,
            gauges,
        };
        actor.publish_gauges();

        (actor, handle)
    }

    /// Process commands until every handle is dropped
    pub async fn run(mut self) {
        match self.store.load().await {
            Ok(archive) => {
                info!(scores = archive.scores.len(), "Restored leaderboard");
                self.registry.restore_scores(archive);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load score archive, starting empty");
            }
        }

        let (saves_tx, saves_rx) = watch::channel(self.registry.scoreboard().clone());
        tokio::spawn(save_scores(self.store.clone(), saves_rx));
        self.saves = Some(saves_tx);

        info!(
            round = self.registry.round(),
            objects = self.registry.objects().len(),
            "World started"
        );

        while let Some(command) = self.input_rx.recv().await {
            self.handle_command(command).await;
            self.publish_gauges();
        }

        info!("World stopped, all handles dropped");
    }

    async fn handle_command(&mut self, command: WorldCommand) {
        match command {
            WorldCommand::Client {
                conn_id,
                msg,
                received_at,
            } => {
                let event = msg.event_name();
                let finalizes_score = matches!(msg, ClientMsg::PlayerScore { .. });

                let result = match msg {
                    ClientMsg::NewPlayer { x, y } => Ok(self
                        .registry
                        .register_player(conn_id.clone(), x, y, received_at)
                        .into_outbound()),
                    ClientMsg::MovePlayer { x, y } => self.registry.move_player(&conn_id, x, y),
                    ClientMsg::DeadPlayer {} => self.registry.mark_dead(&conn_id, received_at),
                    ClientMsg::PlayerShot {
                        shot_id,
                        shooter_id,
                    } => self.registry.record_hit(&conn_id, &shot_id, &shooter_id),
                    ClientMsg::PlayerScore { player_name } => self
                        .registry
                        .finalize_score(&conn_id, &player_name)
                        .map(|(_, out)| out),
                    ClientMsg::CatchObject { object_id } => {
                        self.registry.claim_object(&conn_id, &object_id)
                    }
                    ClientMsg::DropObject { object_id, x, y } => {
                        self.registry.release_object(&conn_id, &object_id, x, y)
                    }
                    ClientMsg::ObjectUsed { object_id, x, y } => {
                        self.registry.consume_object(&conn_id, &object_id, x, y)
                    }
                    ClientMsg::ObjectFixed { object_id } => {
                        self.registry.repair_object(&conn_id, &object_id)
                    }
                    ClientMsg::LowLevel { kind } => {
                        self.registry.report_low_resource(&conn_id, &kind)
                    }
                    ClientMsg::TheEnd {} => self.registry.end_round(&conn_id, received_at),
                };

                let accepted = result.is_ok();
                self.dispatch(&conn_id, event, result);

                if finalizes_score && accepted {
                    self.persist_scores();
                }
            }
            WorldCommand::Disconnect { conn_id } => match self.registry.remove_player(&conn_id) {
                Err(WorldError::PlayerNotFound(_)) => {
                    debug!(conn_id = %conn_id, "Connection closed without joining");
                }
                result => self.dispatch(&conn_id, "disconnect", result),
            },
            WorldCommand::Leaderboard { reply } => {
                let _ = reply.send(self.registry.scoreboard().leaderboard().to_vec());
            }
        }
    }

    /// Publish the envelopes of a handled event, or log why it was abandoned
    fn dispatch(&self, conn_id: &ConnId, event: &'static str, result: Result<Vec<Outbound>, WorldError>) {
        match result {
            Ok(out) => {
                for envelope in out {
                    // No receivers is fine: nobody is connected
                    let _ = self.outbound_tx.send(envelope);
                }
            }
            Err(e) => {
                warn!(conn_id = %conn_id, event, error = %e, "Event abandoned");
            }
        }
    }

    /// Hand the current leaderboard to the saver task
    fn persist_scores(&self) {
        if let Some(saves) = &self.saves {
            saves.send_replace(self.registry.scoreboard().clone());
        }
    }

    fn publish_gauges(&self) {
        self.gauges
            .players
            .store(self.registry.player_count(), Ordering::Relaxed);
        self.gauges
            .objects
            .store(self.registry.objects().len(), Ordering::Relaxed);
        self.gauges.round.store(self.registry.round(), Ordering::Relaxed);
    }
}

/// Write each archive the actor publishes. Archives published while a write
/// is in flight collapse into the newest one.
async fn save_scores(store: Arc<dyn ScoreStore>, mut saves: watch::Receiver<ScoreArchive>) {
    while saves.changed().await.is_ok() {
        let archive = saves.borrow_and_update().clone();
        if let Err(e) = store.save(&archive).await {
            warn!(error = %e, "Failed to save score archive");
        }
    }
    debug!("Score saver stopped");
}

//! Application state shared across routes

use std::sync::Arc;

use tracing::info;

use crate::config::Config;
use crate::game::round::RoundGenerator;
use crate::game::{Rules, WorldActor, WorldHandle, WorldRegistry};
use crate::store::{JsonFileStore, NoopStore, ScoreStore};

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub world: WorldHandle,
}

impl AppState {
    /// Build the state and the world actor that backs it. The caller spawns
    /// the actor.
    pub fn new(config: Config) -> (Self, WorldActor) {
        let config = Arc::new(config);

        // Initialize round generation and registry rules
        let generator = RoundGenerator::new(config.round_seed, config.enable_pills);
        let rules = Rules {
            allow_used_reclaim: config.allow_used_reclaim,
        };
        let registry = WorldRegistry::new(generator, rules);

        // Initialize score persistence
        let store: Arc<dyn ScoreStore> = match &config.scores_file {
            Some(path) => {
                info!(path = %path.display(), "Persisting scores to file");
                Arc::new(JsonFileStore::new(path.clone()))
            }
            None => Arc::new(NoopStore),
        };

        let (actor, world) = WorldActor::new(registry, store);

        (Self { config, world }, actor)
    }
}

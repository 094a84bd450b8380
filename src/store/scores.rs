//! Leaderboard persistence port

use async_trait::async_trait;

use crate::game::scoring::Scoreboard;

/// Persisted leaderboard plus stat history
pub type ScoreArchive = Scoreboard;

/// Storage for finished-session scores.
///
/// The world actor loads once at startup and saves after every finalized
/// score. Failures are reported, never fatal.
#[async_trait]
pub trait ScoreStore: Send + Sync {
    async fn load(&self) -> Result<ScoreArchive, StoreError>;
    async fn save(&self, archive: &ScoreArchive) -> Result<(), StoreError>;
}

/// Keeps nothing; scores live only as long as the process
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopStore;

#[async_trait]
impl ScoreStore for NoopStore {
    async fn load(&self) -> Result<ScoreArchive, StoreError> {
        Ok(ScoreArchive::default())
    }

    async fn save(&self, _archive: &ScoreArchive) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Score file I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Score file is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_noop_store_loads_empty_archive() {
        let store = NoopStore;
        let archive = tokio_test::block_on(store.load()).unwrap();
        assert!(archive.scores.is_empty());
        assert!(archive.stats.is_empty());
        tokio_test::block_on(store.save(&archive)).unwrap();
    }
}

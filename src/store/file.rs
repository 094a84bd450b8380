//! JSON file backed score store

use std::io::ErrorKind;
use std::path::PathBuf;

use async_trait::async_trait;
use tracing::{debug, info};

use super::scores::{ScoreArchive, ScoreStore, StoreError};

/// Whole-archive JSON file, rewritten on every save
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn staging_path(&self) -> PathBuf {
        let mut staging = self.path.clone().into_os_string();
        staging.push(".tmp");
        PathBuf::from(staging)
    }
}

#[async_trait]
impl ScoreStore for JsonFileStore {
    async fn load(&self) -> Result<ScoreArchive, StoreError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %self.path.display(), "No score file yet, starting empty");
                return Ok(ScoreArchive::default());
            }
            Err(e) => return Err(e.into()),
        };

        let archive: ScoreArchive = serde_json::from_slice(&bytes)?;
        info!(
            path = %self.path.display(),
            scores = archive.scores.len(),
            "Loaded score archive"
        );
        Ok(archive)
    }

    async fn save(&self, archive: &ScoreArchive) -> Result<(), StoreError> {
        let json = serde_json::to_vec_pretty(archive)?;

        // Write then rename so a crash never leaves a truncated archive
        let staging = self.staging_path();
        tokio::fs::write(&staging, json).await?;
        tokio::fs::rename(&staging, &self.path).await?;

        debug!(path = %self.path.display(), scores = archive.scores.len(), "Saved score archive");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::player::Player;
    use crate::ws::protocol::ConnId;
    use chrono::Utc;
    use uuid::Uuid;

    fn scratch_path() -> PathBuf {
        std::env::temp_dir().join(format!("survival-relay-scores-{}.json", Uuid::new_v4()))
    }

    #[tokio::test]
    async fn test_missing_file_loads_empty() {
        let store = JsonFileStore::new(scratch_path());
        let archive = store.load().await.unwrap();
        assert_eq!(archive, ScoreArchive::default());
    }

    #[tokio::test]
    async fn test_save_then_load_keeps_order_and_history() {
        let path = scratch_path();
        let store = JsonFileStore::new(&path);

        let mut archive = ScoreArchive::default();
        let mut low = Player::new(ConnId::from("a"), 0.0, 300.0, Utc::now());
        low.objects_picked = 4;
        let mut high = Player::new(ConnId::from("b"), 0.0, 300.0, Utc::now());
        high.hits_scored = 2;
        archive.finalize(&low, "low");
        archive.finalize(&high, "high");

        store.save(&archive).await.unwrap();
        let loaded = store.load().await.unwrap();

        assert_eq!(loaded, archive);
        assert_eq!(loaded.leaderboard()[0].name, "high");
        assert_eq!(loaded.stats.len(), 2);

        tokio::fs::remove_file(&path).await.unwrap();
    }

    #[tokio::test]
    async fn test_corrupt_file_is_an_error() {
        let path = scratch_path();
        tokio::fs::write(&path, b"{not json").await.unwrap();

        let err = JsonFileStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, StoreError::Parse(_)));

        tokio::fs::remove_file(&path).await.unwrap();
    }
}

//! Score persistence

pub mod file;
pub mod scores;

pub use file::JsonFileStore;
pub use scores::{NoopStore, ScoreArchive, ScoreStore, StoreError};

//! Leaderboard port
//!
//! Append-only store of per-model standings. Only written after a run
//! reaches `done`.

use async_trait::async_trait;
use council_domain::{LeaderboardRecord, Standing};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LeaderboardError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt leaderboard data: {0}")]
    Corrupt(String),
}

#[async_trait]
pub trait LeaderboardSink: Send + Sync {
    async fn record(&self, record: &LeaderboardRecord) -> Result<(), LeaderboardError>;

    /// Standings for one council, best first
    async fn standings(&self, council_id: &str) -> Result<Vec<Standing>, LeaderboardError>;
}

/// Leaderboard disabled
pub struct NoLeaderboard;

#[async_trait]
impl LeaderboardSink for NoLeaderboard {
    async fn record(&self, _record: &LeaderboardRecord) -> Result<(), LeaderboardError> {
        Ok(())
    }

    async fn standings(&self, _council_id: &str) -> Result<Vec<Standing>, LeaderboardError> {
        Ok(Vec::new())
    }
}

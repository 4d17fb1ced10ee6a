//! JSON-file leaderboard store
//!
//! ```json
//! {
//!   "councils": { "<council_id>": [Standing, ...] },
//!   "last_updated": "2026-01-01T00:00:00Z"
//! }
//! ```
//!
//! Writes go to a sibling temp file that is renamed over the original, so a
//! crash mid-write never leaves a truncated leaderboard.

use async_trait::async_trait;
use council_application::ports::leaderboard::{LeaderboardError, LeaderboardSink};
use council_domain::ranking::leaderboard::{apply_record, sort_standings};
use council_domain::{LeaderboardRecord, Standing};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, warn};

#[derive(Debug, Default, Serialize, Deserialize)]
struct LeaderboardFile {
    #[serde(default)]
    councils: BTreeMap<String, Vec<Standing>>,
    #[serde(default)]
    last_updated: Option<String>,
}

pub struct JsonFileLeaderboard {
    path: PathBuf,
    /// Serializes read-modify-write cycles within this process
    lock: Mutex<()>,
}

impl JsonFileLeaderboard {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> Result<LeaderboardFile, LeaderboardError> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| LeaderboardError::Corrupt(format!("{}: {}", self.path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(LeaderboardFile::default()),
            Err(e) => Err(e.into()),
        }
    }

    async fn save(&self, data: &LeaderboardFile) -> Result<(), LeaderboardError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(data)
            .map_err(|e| LeaderboardError::Corrupt(e.to_string()))?;
        let temp = self.path.with_extension("json.tmp");
        tokio::fs::write(&temp, json).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl LeaderboardSink for JsonFileLeaderboard {
    async fn record(&self, record: &LeaderboardRecord) -> Result<(), LeaderboardError> {
        if record.results.is_empty() {
            debug!("Empty leaderboard record for {}, skipping", record.council_id);
            return Ok(());
        }
        let _guard = self.lock.lock().await;
        let mut data = match self.load().await {
            Ok(data) => data,
            Err(LeaderboardError::Corrupt(e)) => {
                warn!("Leaderboard unreadable, starting fresh: {}", e);
                LeaderboardFile::default()
            }
            Err(e) => return Err(e),
        };

        let standings = data.councils.entry(record.council_id.clone()).or_default();
        apply_record(standings, record);
        sort_standings(standings);
        data.last_updated = Some(
            chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
        );
        self.save(&data).await
    }

    async fn standings(&self, council_id: &str) -> Result<Vec<Standing>, LeaderboardError> {
        let _guard = self.lock.lock().await;
        let mut data = self.load().await?;
        let mut standings = data.councils.remove(council_id).unwrap_or_default();
        sort_standings(&mut standings);
        Ok(standings)
    }
}

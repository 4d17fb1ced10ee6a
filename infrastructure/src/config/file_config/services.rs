//! External service sections: `[tools]`, `[memory]`, `[leaderboard]`,
//! `[logging]` and `[server]`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Tool server; tools are disabled when `endpoint` is unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileToolsConfig {
    pub endpoint: Option<String>,
}

/// Memory service; the memory fast path is disabled when `endpoint` is unset
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileMemoryConfig {
    pub endpoint: Option<String>,
    /// Where finished answers are written back; unset disables write-back
    pub record_endpoint: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLeaderboardConfig {
    /// JSON file holding leaderboard records; unset disables recording
    pub path: Option<PathBuf>,
}

impl Default for FileLeaderboardConfig {
    fn default() -> Self {
        Self {
            path: dirs::data_dir().map(|d| d.join("council").join("leaderboard.json")),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Directory for JSONL conversation transcripts; unset disables them
    pub transcript_dir: Option<PathBuf>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileServerConfig {
    pub bind: String,
}

impl Default for FileServerConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8001".to_string(),
        }
    }
}

//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and converted once into the application
//! and domain types a run uses.

mod backend;
mod council;
mod deliberation;
mod services;

pub use backend::FileBackendConfig;
pub use council::{FileAdvisorConfig, FileCouncilConfig, FileCriterionConfig, FileRoutingConfig};
pub use deliberation::FileDeliberationConfig;
pub use services::{
    FileLeaderboardConfig, FileLoggingConfig, FileMemoryConfig, FileServerConfig, FileToolsConfig,
};

use council_domain::CouncilSnapshot;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Configuration validation errors
#[derive(Debug, Error, PartialEq)]
pub enum ConfigValidationError {
    #[error("{field} cannot be 0")]
    ZeroTimeout { field: String },

    #[error("model name cannot be empty ({field})")]
    EmptyModelName { field: String },

    #[error("rubric criterion '{criterion}' in council '{council}' needs a positive weight")]
    InvalidRubricWeight { council: String, criterion: String },

    #[error("council '{council}' needs at least 3 advisors, has {got}")]
    TooFewAdvisors { council: String, got: usize },

    #[error("council '{council}' lists advisor '{advisor}' twice")]
    DuplicateAdvisor { council: String, advisor: String },

    #[error("{field} must be between 0 and 1, got {value}")]
    OutOfRange { field: String, value: f64 },

    #[error("invalid council '{council}': {reason}")]
    InvalidCouncil { council: String, reason: String },
}

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Model backend connection
    pub backend: FileBackendConfig,
    /// Orchestrator parameters
    pub deliberation: FileDeliberationConfig,
    /// Tool server
    pub tools: FileToolsConfig,
    /// Memory service
    pub memory: FileMemoryConfig,
    /// Leaderboard persistence
    pub leaderboard: FileLeaderboardConfig,
    /// Transcript logging
    pub logging: FileLoggingConfig,
    /// HTTP server
    pub server: FileServerConfig,
    /// Councils keyed by id
    pub councils: BTreeMap<String, FileCouncilConfig>,
}

impl FileConfig {
    /// Validate the entire configuration, stopping at the first problem.
    pub fn validate(&self) -> Result<(), ConfigValidationError> {
        self.backend.validate()?;
        self.deliberation.validate()?;
        for (id, council) in &self.councils {
            council.validate(id)?;
        }
        Ok(())
    }

    /// Build every configured council snapshot.
    pub fn council_snapshots(&self) -> Result<Vec<CouncilSnapshot>, ConfigValidationError> {
        self.councils
            .iter()
            .map(|(id, council)| council.to_snapshot(id, &self.backend.default_model))
            .collect()
    }

    /// Id of the council used when a request names none
    pub fn default_council_id(&self) -> Option<&str> {
        self.deliberation
            .default_council
            .as_deref()
            .filter(|id| self.councils.contains_key(*id))
            .or_else(|| self.councils.keys().next().map(String::as_str))
    }
}

//! How far a deliberation runs

use serde::{Deserialize, Serialize};

/// Execution depth requested for a deliberation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// Independent answers only
    Stage1,
    /// Answers plus peer ranking
    Stages12,
    /// Answers, ranking and chairman synthesis
    #[default]
    Full,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Stage1 => "stage1",
            ExecutionMode::Stages12 => "stages12",
            ExecutionMode::Full => "full",
        }
    }

    pub fn runs_stage2(&self) -> bool {
        !matches!(self, ExecutionMode::Stage1)
    }

    pub fn runs_stage3(&self) -> bool {
        matches!(self, ExecutionMode::Full)
    }
}

impl std::fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "stage1" => Ok(ExecutionMode::Stage1),
            "stages12" | "stage12" => Ok(ExecutionMode::Stages12),
            "full" => Ok(ExecutionMode::Full),
            other => Err(format!(
                "unknown execution mode '{}' (expected stage1, stages12 or full)",
                other
            )),
        }
    }
}

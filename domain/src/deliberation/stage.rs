//! Pipeline stage identifiers

use serde::{Deserialize, Serialize};

/// A step of a run that can make backend calls and accrue usage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Classification,
    Routing,
    Tool,
    Direct,
    Stage1,
    Stage2,
    Stage3,
}

impl Stage {
    pub fn as_str(&self) -> &'static str {
        match self {
            Stage::Classification => "classification",
            Stage::Routing => "routing",
            Stage::Tool => "tool",
            Stage::Direct => "direct",
            Stage::Stage1 => "stage1",
            Stage::Stage2 => "stage2",
            Stage::Stage3 => "stage3",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

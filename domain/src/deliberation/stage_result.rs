//! Per-member result of one stage

use super::metrics::StageMetrics;
use crate::core::error::DomainError;
use crate::core::model::Model;
use serde::{Deserialize, Serialize};

/// Member id used for the chairman's single-call stages
pub const CHAIRMAN_ID: &str = "chairman";

/// Lifecycle of a [`StageResult`]. Moves forward only.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StageStatus {
    Pending,
    Streaming,
    Complete,
    Errored,
}

impl StageStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageStatus::Pending => "pending",
            StageStatus::Streaming => "streaming",
            StageStatus::Complete => "complete",
            StageStatus::Errored => "errored",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, StageStatus::Complete | StageStatus::Errored)
    }

    pub fn can_transition_to(&self, next: StageStatus) -> bool {
        use StageStatus::*;
        matches!(
            (self, next),
            (Pending, Streaming | Complete | Errored)
                | (Streaming, Streaming | Complete | Errored)
        )
    }
}

/// One member's output for one stage (Entity)
///
/// Owned and mutated only by the stage executor running that stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StageResult {
    pub member_id: String,
    pub model: Model,
    pub role: String,
    pub status: StageStatus,
    pub text: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub thinking: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metrics: Option<StageMetrics>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    pub fn pending(member_id: impl Into<String>, model: Model, role: impl Into<String>) -> Self {
        Self {
            member_id: member_id.into(),
            model,
            role: role.into(),
            status: StageStatus::Pending,
            text: String::new(),
            thinking: String::new(),
            metrics: None,
            error: None,
        }
    }

    pub fn for_chairman(model: Model) -> Self {
        Self::pending(CHAIRMAN_ID, model, "chairman")
    }

    fn transition(&mut self, next: StageStatus) -> Result<(), DomainError> {
        if !self.status.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.status = next;
        Ok(())
    }

    pub fn append_delta(&mut self, delta: &str) -> Result<(), DomainError> {
        self.transition(StageStatus::Streaming)?;
        self.text.push_str(delta);
        Ok(())
    }

    pub fn append_thinking(&mut self, delta: &str) -> Result<(), DomainError> {
        self.transition(StageStatus::Streaming)?;
        self.thinking.push_str(delta);
        Ok(())
    }

    /// Drop everything streamed so far before another attempt
    pub fn restart(&mut self) -> Result<(), DomainError> {
        if self.is_terminal() {
            return Err(DomainError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: StageStatus::Pending.as_str().to_string(),
            });
        }
        self.text.clear();
        self.thinking.clear();
        Ok(())
    }

    /// Finish successfully, replacing the accumulated text with the final answer
    pub fn complete(&mut self, text: String, metrics: StageMetrics) -> Result<(), DomainError> {
        self.transition(StageStatus::Complete)?;
        self.text = text;
        self.metrics = Some(metrics);
        Ok(())
    }

    /// Finish with an error; partial text is discarded
    pub fn fail(&mut self, error: impl Into<String>) -> Result<(), DomainError> {
        self.transition(StageStatus::Errored)?;
        self.text.clear();
        self.error = Some(error.into());
        Ok(())
    }

    pub fn is_complete(&self) -> bool {
        self.status == StageStatus::Complete
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}

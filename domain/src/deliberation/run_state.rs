//! Orchestrator state machine

use super::classification::Classification;
use super::stage_result::StageResult;
use super::usage::UsageLedger;
use crate::core::error::DomainError;
use crate::council::panel::Panel;
use crate::memory::MemoryHit;
use crate::ranking::AggregateRanking;
use crate::tool::ToolOutcome;
use serde::{Deserialize, Serialize};

/// Phase of a deliberation run.
///
/// ```text
/// MemoryCheck → Classify → { Direct | ToolCheck → (Direct | Route → PanelAwait? →
///     Stage1 → Stage2 → Stage3) } → UsageFinalize → Done
/// ```
///
/// `Error` is absorbing and only reached when a run is abandoned
/// (cancellation); escalated failures still pass through `UsageFinalize`
/// so the client receives `done`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunPhase {
    MemoryCheck,
    Classify,
    ToolCheck,
    Direct,
    Route,
    PanelAwait,
    Stage1,
    Stage2,
    Stage3,
    UsageFinalize,
    Done,
    Error,
}

impl RunPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunPhase::MemoryCheck => "memory_check",
            RunPhase::Classify => "classify",
            RunPhase::ToolCheck => "tool_check",
            RunPhase::Direct => "direct",
            RunPhase::Route => "route",
            RunPhase::PanelAwait => "panel_await",
            RunPhase::Stage1 => "stage1",
            RunPhase::Stage2 => "stage2",
            RunPhase::Stage3 => "stage3",
            RunPhase::UsageFinalize => "usage_finalize",
            RunPhase::Done => "done",
            RunPhase::Error => "error",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, RunPhase::Done | RunPhase::Error)
    }

    /// Allowed forward transitions. Nothing ever moves back.
    pub fn can_transition_to(&self, next: RunPhase) -> bool {
        use RunPhase::*;
        if next == Error {
            return !self.is_terminal();
        }
        matches!(
            (self, next),
            (MemoryCheck, Classify | ToolCheck | Direct | UsageFinalize)
                | (Classify, ToolCheck | Direct | Route)
                | (ToolCheck, Direct | Route | UsageFinalize)
                | (Route, PanelAwait | Stage1 | UsageFinalize)
                | (PanelAwait, Stage1 | UsageFinalize)
                | (Stage1, Stage2 | Stage3 | UsageFinalize)
                | (Stage2, Stage3 | UsageFinalize)
                | (Stage3, UsageFinalize)
                | (Direct, UsageFinalize)
                | (UsageFinalize, Done)
        )
    }
}

impl std::fmt::Display for RunPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Everything a run accumulates (Entity)
///
/// Owned by the orchestrator; stages write into it strictly one after
/// another.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunState {
    phase: RunPhase,
    /// Set when a stored fact answered the query
    pub memory_hit: Option<MemoryHit>,
    pub classification: Option<Classification>,
    pub tool_outcome: Option<ToolOutcome>,
    pub panel: Option<Panel>,
    pub stage1: Vec<StageResult>,
    pub stage2: Vec<StageResult>,
    pub ranking: Option<AggregateRanking>,
    pub stage3: Option<StageResult>,
    pub usage: UsageLedger,
    pub final_response: Option<String>,
}

impl Default for RunState {
    fn default() -> Self {
        Self::new()
    }
}

impl RunState {
    pub fn new() -> Self {
        Self {
            phase: RunPhase::MemoryCheck,
            memory_hit: None,
            classification: None,
            tool_outcome: None,
            panel: None,
            stage1: Vec::new(),
            stage2: Vec::new(),
            ranking: None,
            stage3: None,
            usage: UsageLedger::new(),
            final_response: None,
        }
    }

    pub fn phase(&self) -> RunPhase {
        self.phase
    }

    pub fn is_terminal(&self) -> bool {
        self.phase.is_terminal()
    }

    pub fn transition(&mut self, next: RunPhase) -> Result<(), DomainError> {
        if !self.phase.can_transition_to(next) {
            return Err(DomainError::InvalidTransition {
                from: self.phase.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        self.phase = next;
        Ok(())
    }

    /// Complete stage-1 results in panel order
    pub fn completed_stage1(&self) -> impl Iterator<Item = &StageResult> {
        self.stage1.iter().filter(|r| r.is_complete())
    }

    pub fn stage1_answer(&self, member_id: &str) -> Option<&str> {
        self.completed_stage1()
            .find(|r| r.member_id == member_id)
            .map(|r| r.text.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_deliberation_path_is_allowed() {
        let mut state = RunState::new();
        for phase in [
            RunPhase::Classify,
            RunPhase::Route,
            RunPhase::PanelAwait,
            RunPhase::Stage1,
            RunPhase::Stage2,
            RunPhase::Stage3,
            RunPhase::UsageFinalize,
            RunPhase::Done,
        ] {
            state.transition(phase).unwrap();
        }
        assert!(state.is_terminal());
    }

    #[test]
    fn direct_path_is_allowed() {
        let mut state = RunState::new();
        state.transition(RunPhase::Classify).unwrap();
        state.transition(RunPhase::Direct).unwrap();
        state.transition(RunPhase::UsageFinalize).unwrap();
        state.transition(RunPhase::Done).unwrap();
    }

    #[test]
    fn never_rewinds() {
        let mut state = RunState::new();
        state.transition(RunPhase::Classify).unwrap();
        state.transition(RunPhase::Route).unwrap();
        state.transition(RunPhase::Stage1).unwrap();
        state.transition(RunPhase::Stage2).unwrap();
        let err = state.transition(RunPhase::Stage1).unwrap_err();
        assert_eq!(
            err,
            DomainError::InvalidTransition {
                from: "stage2".to_string(),
                to: "stage1".to_string()
            }
        );
        assert!(state.transition(RunPhase::Classify).is_err());
    }

    #[test]
    fn error_is_absorbing() {
        let mut state = RunState::new();
        state.transition(RunPhase::Classify).unwrap();
        state.transition(RunPhase::Error).unwrap();
        assert!(state.transition(RunPhase::UsageFinalize).is_err());
        assert!(state.transition(RunPhase::Error).is_err());
    }

    #[test]
    fn done_accepts_nothing() {
        assert!(!RunPhase::Done.can_transition_to(RunPhase::Error));
        assert!(!RunPhase::Done.can_transition_to(RunPhase::MemoryCheck));
    }
}

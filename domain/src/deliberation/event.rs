//! Client-facing event stream
//!
//! Every observable step of a run is one [`DeliberationEvent`]. The enum is
//! closed and serializes as a flat JSON object tagged by `type`, which is
//! what the NDJSON writer and the SSE server send on the wire.

use super::classification::{Classification, QueryType};
use super::metrics::StageMetrics;
use super::stage::Stage;
use super::stage_result::StageResult;
use super::usage::{StageUsage, UsageBreakdown};
use crate::core::model::Model;
use crate::council::panel::Panel;
use crate::memory::MemoryHit;
use crate::ranking::AggregateRanking;
use crate::tool::{ToolOutcome, ToolSelection};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DeliberationEvent {
    MemoryHit {
        fact: String,
        confidence: f64,
    },
    ClassificationComplete {
        classification: QueryType,
        requires_tool: bool,
        reasoning: String,
    },
    RoutingComplete {
        panel: Panel,
        fallback: bool,
    },
    PanelConfirmed {
        panel: Panel,
    },
    ToolCallStart {
        server: String,
        tool: String,
        arguments: Value,
    },
    ToolCallComplete {
        server: String,
        tool: String,
        success: bool,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        content: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        error: Option<String>,
    },
    DirectStart,
    StageToken {
        stage: Stage,
        member_id: String,
        delta: String,
    },
    StageThinking {
        stage: Stage,
        member_id: String,
        delta: String,
    },
    /// Deltas streamed so far for this member are void; a retry follows
    StageReset {
        stage: Stage,
        member_id: String,
    },
    Stage1ModelComplete {
        model: Model,
        role: String,
        member_id: String,
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<StageMetrics>,
    },
    Stage1ModelError {
        model: Model,
        role: String,
        member_id: String,
        error: String,
    },
    Stage2ModelComplete {
        model: Model,
        role: String,
        member_id: String,
        ranking: String,
        parsed_ranking: Vec<String>,
    },
    Stage2ModelError {
        model: Model,
        role: String,
        member_id: String,
        error: String,
    },
    StageComplete {
        stage: Stage,
        results: Vec<StageResult>,
    },
    Analysis(AggregateRanking),
    Stage3Complete {
        model: Model,
        response: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        metrics: Option<StageMetrics>,
    },
    Stage3Error {
        model: Model,
        error: String,
    },
    UsageUpdate {
        stage: Stage,
        usage: StageUsage,
        running_total: StageUsage,
    },
    Done {
        usage: UsageBreakdown,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        response: Option<String>,
    },
    Error {
        message: String,
    },
}

impl DeliberationEvent {
    pub fn memory_hit(hit: &MemoryHit) -> Self {
        Self::MemoryHit {
            fact: hit.fact.clone(),
            confidence: hit.confidence,
        }
    }

    pub fn classification_complete(classification: &Classification) -> Self {
        Self::ClassificationComplete {
            classification: classification.query_type,
            requires_tool: classification.requires_tool,
            reasoning: classification.reasoning.clone(),
        }
    }

    pub fn routing_complete(panel: &Panel, fallback: bool) -> Self {
        Self::RoutingComplete {
            panel: panel.clone(),
            fallback,
        }
    }

    pub fn panel_confirmed(panel: &Panel) -> Self {
        Self::PanelConfirmed {
            panel: panel.clone(),
        }
    }

    pub fn tool_call_start(selection: &ToolSelection) -> Self {
        Self::ToolCallStart {
            server: selection.server.clone(),
            tool: selection.tool.clone(),
            arguments: selection.arguments.clone(),
        }
    }

    pub fn tool_call_complete(outcome: &ToolOutcome) -> Self {
        Self::ToolCallComplete {
            server: outcome.server.clone(),
            tool: outcome.tool.clone(),
            success: outcome.is_success(),
            content: outcome.content.clone(),
            error: outcome.error.clone(),
        }
    }

    pub fn direct_start() -> Self {
        Self::DirectStart
    }

    pub fn stage_token(stage: Stage, member_id: impl Into<String>, delta: impl Into<String>) -> Self {
        Self::StageToken {
            stage,
            member_id: member_id.into(),
            delta: delta.into(),
        }
    }

    pub fn stage_thinking(
        stage: Stage,
        member_id: impl Into<String>,
        delta: impl Into<String>,
    ) -> Self {
        Self::StageThinking {
            stage,
            member_id: member_id.into(),
            delta: delta.into(),
        }
    }

    pub fn stage_reset(stage: Stage, member_id: impl Into<String>) -> Self {
        Self::StageReset {
            stage,
            member_id: member_id.into(),
        }
    }

    /// Per-member terminal event for stage 1 (complete or error)
    pub fn stage1_result(result: &StageResult) -> Self {
        if result.is_complete() {
            Self::Stage1ModelComplete {
                model: result.model.clone(),
                role: result.role.clone(),
                member_id: result.member_id.clone(),
                response: result.text.clone(),
                metrics: result.metrics,
            }
        } else {
            Self::Stage1ModelError {
                model: result.model.clone(),
                role: result.role.clone(),
                member_id: result.member_id.clone(),
                error: result.error.clone().unwrap_or_default(),
            }
        }
    }

    /// Per-member terminal event for stage 2; `parsed_ranking` lists member ids best first
    pub fn stage2_result(result: &StageResult, parsed_ranking: Vec<String>) -> Self {
        if result.is_complete() {
            Self::Stage2ModelComplete {
                model: result.model.clone(),
                role: result.role.clone(),
                member_id: result.member_id.clone(),
                ranking: result.text.clone(),
                parsed_ranking,
            }
        } else {
            Self::Stage2ModelError {
                model: result.model.clone(),
                role: result.role.clone(),
                member_id: result.member_id.clone(),
                error: result.error.clone().unwrap_or_default(),
            }
        }
    }

    pub fn stage_complete(stage: Stage, results: Vec<StageResult>) -> Self {
        Self::StageComplete { stage, results }
    }

    pub fn analysis(ranking: &AggregateRanking) -> Self {
        Self::Analysis(ranking.clone())
    }

    /// Terminal event for stage 3 and direct answers
    pub fn stage3_result(result: &StageResult) -> Self {
        if result.is_complete() {
            Self::Stage3Complete {
                model: result.model.clone(),
                response: result.text.clone(),
                metrics: result.metrics,
            }
        } else {
            Self::Stage3Error {
                model: result.model.clone(),
                error: result.error.clone().unwrap_or_default(),
            }
        }
    }

    pub fn usage_update(stage: Stage, usage: StageUsage, running_total: StageUsage) -> Self {
        Self::UsageUpdate {
            stage,
            usage,
            running_total,
        }
    }

    pub fn done(usage: UsageBreakdown, response: Option<String>) -> Self {
        Self::Done { usage, response }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self::Error {
            message: message.into(),
        }
    }

    /// Wire name of this event
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::MemoryHit { .. } => "memory_hit",
            Self::ClassificationComplete { .. } => "classification_complete",
            Self::RoutingComplete { .. } => "routing_complete",
            Self::PanelConfirmed { .. } => "panel_confirmed",
            Self::ToolCallStart { .. } => "tool_call_start",
            Self::ToolCallComplete { .. } => "tool_call_complete",
            Self::DirectStart => "direct_start",
            Self::StageToken { .. } => "stage_token",
            Self::StageThinking { .. } => "stage_thinking",
            Self::StageReset { .. } => "stage_reset",
            Self::Stage1ModelComplete { .. } => "stage1_model_complete",
            Self::Stage1ModelError { .. } => "stage1_model_error",
            Self::Stage2ModelComplete { .. } => "stage2_model_complete",
            Self::Stage2ModelError { .. } => "stage2_model_error",
            Self::StageComplete { .. } => "stage_complete",
            Self::Analysis(_) => "analysis",
            Self::Stage3Complete { .. } => "stage3_complete",
            Self::Stage3Error { .. } => "stage3_error",
            Self::UsageUpdate { .. } => "usage_update",
            Self::Done { .. } => "done",
            Self::Error { .. } => "error",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done { .. })
    }

    /// Streaming deltas, and the resets that only mean something next to
    /// them. Skipped by transcript loggers.
    pub fn is_delta(&self) -> bool {
        matches!(
            self,
            Self::StageToken { .. } | Self::StageThinking { .. } | Self::StageReset { .. }
        )
    }
}

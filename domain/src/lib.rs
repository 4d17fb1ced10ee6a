//! Domain layer for council-deliberation
//!
//! This crate contains the core types and algorithms of a multi-model
//! deliberation. It has no dependencies on infrastructure or presentation
//! concerns and performs no I/O.
//!
//! # Core Concepts
//!
//! ## Council
//!
//! A council is a roster of advisors, a weighted rubric, a pool of models
//! and a chairman. Each run captures an immutable
//! [`CouncilSnapshot`] and seats a [`Panel`] of 3 to 5 advisors.
//!
//! ## Deliberation
//!
//! - **Stage 1**: every panel member answers independently
//! - **Stage 2**: every member ranks its peers' anonymised answers
//! - **Stage 3**: the chairman synthesizes the final answer from the ranking
//!
//! Factual and conversational queries skip the panel and get one direct
//! chairman answer. A confident long-term memory hit skips every model call.

pub mod core;
pub mod council;
pub mod deliberation;
pub mod memory;
pub mod prompt;
pub mod ranking;
pub mod session;
pub mod tool;
pub mod util;

// Re-export commonly used types
pub use core::{
    error::DomainError,
    model::Model,
    query::{Query, Turn, TurnRole},
};
pub use council::{
    advisor::Advisor,
    panel::{Panel, PanelError, PanelMember, PanelSelection, parse_panel_override},
    rubric::{Rubric, RubricCriterion},
    snapshot::{CouncilSnapshot, RoutingBounds},
};
pub use deliberation::{
    classification::{Classification, QueryType},
    event::DeliberationEvent,
    metrics::{StageMetrics, TokenClock},
    mode::ExecutionMode,
    run_state::{RunPhase, RunState},
    stage::Stage,
    stage_result::{StageResult, StageStatus},
    usage::{StageUsage, Usage, UsageBreakdown, UsageLedger},
};
pub use memory::{MemoryFact, MemoryHit, MemoryPolicy};
pub use prompt::{PromptTemplate, SynthesisContext};
pub use ranking::{
    AggregateRanking, LeaderboardRecord, RankedMember, RankingAggregator, RankingEntry,
    ResponseLabels, Standing,
};
pub use session::{
    entities::{Message, Role},
    stream::StreamEvent,
};
pub use tool::{ToolDescriptor, ToolInventory, ToolOutcome, ToolResponse, ToolSelection, ToolStatus};

//! Application layer for council-deliberation
//!
//! This crate contains use cases, port definitions, and application configuration.
//! It depends only on the domain layer.

pub mod config;
pub mod ports;
pub mod use_cases;

#[cfg(test)]
pub(crate) mod testing;

// Re-export commonly used types
pub use config::DeliberationConfig;
pub use ports::{
    conversation_logger::{ConversationEvent, ConversationLogger, NoConversationLogger},
    leaderboard::{LeaderboardError, LeaderboardSink, NoLeaderboard},
    memory_lookup::{MemoryError, MemoryLookup, NoMemory},
    model_backend::{BackendError, Completion, ModelBackend, StreamHandle},
    panel_confirmation::{AutoAcceptPanel, PanelConfirmation, PanelDecision},
    tool_invoker::{NoTools, ToolInvokeError, ToolInvoker},
};
pub use use_cases::run_deliberation::{
    RunDeliberationInput, RunDeliberationUseCase, RunError, RunOutcome,
};

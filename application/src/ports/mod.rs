//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod conversation_logger;
pub mod leaderboard;
pub mod memory_lookup;
pub mod model_backend;
pub mod panel_confirmation;
pub mod tool_invoker;

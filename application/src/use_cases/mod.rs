//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod classify;
pub mod event_emitter;
pub mod intercept_tool;
pub mod route_panel;
pub mod run_deliberation;
pub mod stage_executor;
pub mod stream_multiplexer;

//! Deliberation run model: classification, stages, per-member results,
//! metrics, usage, the event stream and the orchestrator state machine.

pub mod classification;
pub mod event;
pub mod metrics;
pub mod mode;
pub mod run_state;
pub mod stage;
pub mod stage_result;
pub mod usage;

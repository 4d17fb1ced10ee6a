//! Deliberation parameters resolved once per run.
//!
//! [`DeliberationConfig`] groups every knob the orchestrator reads. It is
//! built from the loaded file configuration before a run starts and is
//! never re-read while the run is in flight.

use council_domain::{ExecutionMode, MemoryPolicy, Model};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Orchestrator parameters.
///
/// | Field | Default | Applies to |
/// |-------|---------|------------|
/// | `call_timeout` | 120 s | each stage-1/2/3 and direct call |
/// | `lookup_timeout` | 30 s | classifier, router, tool selection, tool invoke, memory |
/// | `max_refusal_retries` | 2 | stage and direct calls |
/// | `history_turns` | 6 | prior turns sent to models |
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliberationConfig {
    pub memory: MemoryPolicy,
    pub call_timeout: Duration,
    pub lookup_timeout: Duration,
    pub max_refusal_retries: usize,
    pub auto_accept_panel: bool,
    pub default_mode: ExecutionMode,
    /// Model that picks tools; the council's classifier model when unset.
    pub tool_selector: Option<Model>,
    pub history_turns: usize,
    /// Capacity of the client event channel.
    pub event_buffer: usize,
}

impl Default for DeliberationConfig {
    fn default() -> Self {
        Self {
            memory: MemoryPolicy::default(),
            call_timeout: Duration::from_secs(120),
            lookup_timeout: Duration::from_secs(30),
            max_refusal_retries: 2,
            auto_accept_panel: true,
            default_mode: ExecutionMode::Full,
            tool_selector: None,
            history_turns: 6,
            event_buffer: 256,
        }
    }
}

impl DeliberationConfig {
    // ==================== Builder Methods ====================

    pub fn with_memory(mut self, memory: MemoryPolicy) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_call_timeout(mut self, timeout: Duration) -> Self {
        self.call_timeout = timeout;
        self
    }

    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout = timeout;
        self
    }

    pub fn with_max_refusal_retries(mut self, retries: usize) -> Self {
        self.max_refusal_retries = retries;
        self
    }

    pub fn with_auto_accept_panel(mut self, auto_accept: bool) -> Self {
        self.auto_accept_panel = auto_accept;
        self
    }

    pub fn with_default_mode(mut self, mode: ExecutionMode) -> Self {
        self.default_mode = mode;
        self
    }

    pub fn with_tool_selector(mut self, model: Model) -> Self {
        self.tool_selector = Some(model);
        self
    }

    pub fn with_event_buffer(mut self, capacity: usize) -> Self {
        self.event_buffer = capacity.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = DeliberationConfig::default();
        assert_eq!(config.call_timeout, Duration::from_secs(120));
        assert_eq!(config.max_refusal_retries, 2);
        assert!(config.auto_accept_panel);
        assert_eq!(config.memory.threshold, 0.85);
        assert_eq!(config.default_mode, ExecutionMode::Full);
    }

    #[test]
    fn test_builder() {
        let config = DeliberationConfig::default()
            .with_call_timeout(Duration::from_secs(5))
            .with_auto_accept_panel(false)
            .with_event_buffer(0);
        assert_eq!(config.call_timeout, Duration::from_secs(5));
        assert!(!config.auto_accept_panel);
        assert_eq!(config.event_buffer, 1);
    }
}

//! Orchestrator configuration from TOML (`[deliberation]` section)
//!
//! ```toml
//! [deliberation]
//! call_timeout_seconds = 120
//! lookup_timeout_seconds = 30
//! max_refusal_retries = 2
//! auto_accept_panel = true
//! default_mode = "full"
//! memory_threshold = 0.85
//! memory_half_life_days = 30
//! memory_max_age_days = 90
//! ```

use super::ConfigValidationError;
use council_application::DeliberationConfig;
use council_domain::{ExecutionMode, MemoryPolicy, Model};
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileDeliberationConfig {
    pub call_timeout_seconds: u64,
    pub lookup_timeout_seconds: u64,
    pub max_refusal_retries: usize,
    pub auto_accept_panel: bool,
    pub default_mode: ExecutionMode,
    /// Council used when a request names none
    pub default_council: Option<String>,
    /// Model that selects tools (defaults to each council's classifier)
    pub tool_selector: Option<String>,
    pub history_turns: usize,
    pub event_buffer: usize,
    pub memory_threshold: f64,
    pub memory_half_life_days: f64,
    pub memory_max_age_days: f64,
}

impl Default for FileDeliberationConfig {
    fn default() -> Self {
        let defaults = DeliberationConfig::default();
        Self {
            call_timeout_seconds: defaults.call_timeout.as_secs(),
            lookup_timeout_seconds: defaults.lookup_timeout.as_secs(),
            max_refusal_retries: defaults.max_refusal_retries,
            auto_accept_panel: defaults.auto_accept_panel,
            default_mode: defaults.default_mode,
            default_council: None,
            tool_selector: None,
            history_turns: defaults.history_turns,
            event_buffer: defaults.event_buffer,
            memory_threshold: defaults.memory.threshold,
            memory_half_life_days: defaults.memory.half_life_days,
            memory_max_age_days: defaults.memory.max_age_days,
        }
    }
}

impl FileDeliberationConfig {
    pub(super) fn validate(&self) -> Result<(), ConfigValidationError> {
        for (field, value) in [
            ("deliberation.call_timeout_seconds", self.call_timeout_seconds),
            ("deliberation.lookup_timeout_seconds", self.lookup_timeout_seconds),
        ] {
            if value == 0 {
                return Err(ConfigValidationError::ZeroTimeout {
                    field: field.to_string(),
                });
            }
        }
        if !(0.0..=1.0).contains(&self.memory_threshold) {
            return Err(ConfigValidationError::OutOfRange {
                field: "deliberation.memory_threshold".to_string(),
                value: self.memory_threshold,
            });
        }
        if self
            .tool_selector
            .as_deref()
            .is_some_and(|model| model.trim().is_empty())
        {
            return Err(ConfigValidationError::EmptyModelName {
                field: "deliberation.tool_selector".to_string(),
            });
        }
        Ok(())
    }

    /// Convert to the parameters the orchestrator reads
    pub fn to_deliberation_config(&self) -> DeliberationConfig {
        let memory = MemoryPolicy {
            threshold: self.memory_threshold,
            half_life_days: self.memory_half_life_days,
            max_age_days: self.memory_max_age_days,
        };
        let mut config = DeliberationConfig::default()
            .with_memory(memory)
            .with_call_timeout(Duration::from_secs(self.call_timeout_seconds))
            .with_lookup_timeout(Duration::from_secs(self.lookup_timeout_seconds))
            .with_max_refusal_retries(self.max_refusal_retries)
            .with_auto_accept_panel(self.auto_accept_panel)
            .with_default_mode(self.default_mode)
            .with_event_buffer(self.event_buffer);
        config.history_turns = self.history_turns;
        if let Some(selector) = &self.tool_selector {
            config = config.with_tool_selector(Model::new(selector.trim()));
        }
        config
    }
}

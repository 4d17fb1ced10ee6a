//! Port for structured conversation logging.
//!
//! Defines the [`ConversationLogger`] trait for recording deliberation events
//! (classification, panel, per-member answers, rankings, synthesis) to a
//! structured log.
//!
//! This is separate from `tracing`-based operation logs: tracing handles
//! human-readable diagnostic messages, while this port captures the full
//! conversation transcript in a machine-readable format (JSONL).

use council_domain::DeliberationEvent;
use serde_json::Value;

/// A structured conversation event for logging.
///
/// Each event has a type string and a JSON payload containing
/// event-specific fields. Adapters stamp the time when writing.
pub struct ConversationEvent {
    /// Event type identifier (e.g., "classification_complete", "stage1_model_complete").
    pub event_type: &'static str,
    /// JSON payload with event-specific data.
    pub payload: Value,
}

impl ConversationEvent {
    pub fn new(event_type: &'static str, payload: Value) -> Self {
        Self {
            event_type,
            payload,
        }
    }

    /// Transcript record for a client-facing event
    pub fn from_event(event: &DeliberationEvent) -> Self {
        let payload = serde_json::to_value(event).unwrap_or(Value::Null);
        Self::new(event.event_type(), payload)
    }
}

/// Port for logging conversation events to a structured log.
///
/// Implementations write each event as a single record (e.g., one JSONL line).
/// The `log` method is intentionally synchronous and non-fallible to avoid
/// disrupting the main execution flow; logging failures are silently ignored.
pub trait ConversationLogger: Send + Sync {
    /// Record a conversation event.
    fn log(&self, event: ConversationEvent);
}

/// No-op implementation for tests and when logging is disabled.
pub struct NoConversationLogger;

impl ConversationLogger for NoConversationLogger {
    fn log(&self, _event: ConversationEvent) {}
}

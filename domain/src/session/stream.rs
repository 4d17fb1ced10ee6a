//! Streaming events for model backend communication.
//!
//! [`StreamEvent`] represents individual events in a streaming completion,
//! enabling real-time forwarding of model output as it's generated.

use crate::deliberation::usage::Usage;

/// An event in a streaming model response.
///
/// Used to bridge infrastructure-level streaming (SSE chunks from an
/// OpenAI-compatible endpoint) to the application layer. A stream is lazy and
/// may end without a terminal event; the consumer then treats whatever text
/// arrived as the complete answer.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// A text chunk of the answer.
    Delta(String),
    /// A chunk of model reasoning, kept apart from the answer.
    ThinkingDelta(String),
    /// Final token accounting (signals stream end).
    Usage(Usage),
    /// An error that occurred mid-stream (signals stream end).
    Error(String),
}

impl StreamEvent {
    /// Returns the text content if this is an answer delta.
    pub fn text(&self) -> Option<&str> {
        match self {
            StreamEvent::Delta(s) => Some(s),
            _ => None,
        }
    }

    /// Returns true if this event signals the end of the stream.
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamEvent::Usage(_) | StreamEvent::Error(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn delta_text_returns_content() {
        let event = StreamEvent::Delta("hello".to_string());
        assert_eq!(event.text(), Some("hello"));
        assert!(!event.is_terminal());
    }

    #[test]
    fn thinking_is_not_answer_text() {
        let event = StreamEvent::ThinkingDelta("hmm".to_string());
        assert_eq!(event.text(), None);
        assert!(!event.is_terminal());
    }

    #[test]
    fn usage_and_error_are_terminal() {
        assert!(StreamEvent::Usage(Usage::default()).is_terminal());
        assert!(StreamEvent::Error("oops".to_string()).is_terminal());
    }
}

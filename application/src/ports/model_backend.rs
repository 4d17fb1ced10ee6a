//! Model backend port
//!
//! Defines the uniform streaming-completion interface every model provider
//! is reached through.

use async_trait::async_trait;
use council_domain::{Message, Model, StreamEvent, Usage};
use thiserror::Error;
use tokio::sync::mpsc;

/// Errors that can occur while talking to a model backend
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("Connection error: {0}")]
    Connection(String),

    #[error("HTTP {status}: {message}")]
    Http { status: u16, message: String },

    #[error("Model not available: {0}")]
    ModelNotAvailable(String),

    #[error("Timeout")]
    Timeout,

    #[error("Transport closed")]
    TransportClosed,

    #[error("Stream error: {0}")]
    Stream(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl BackendError {
    /// Transport failures: the call never produced a usable answer because
    /// the backend could not be reached or dropped the connection.
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            BackendError::Connection(_)
                | BackendError::Http { .. }
                | BackendError::ModelNotAvailable(_)
                | BackendError::Timeout
                | BackendError::TransportClosed
        )
    }
}

/// Backend for model communication
///
/// This port defines how the application layer reaches model providers.
/// Implementations (adapters) live in the infrastructure layer.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Start a streaming completion. The returned handle yields deltas
    /// lazily; dropping it abandons the call.
    async fn stream(&self, model: &Model, messages: &[Message])
    -> Result<StreamHandle, BackendError>;
}

/// Fully drained stream
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Completion {
    pub text: String,
    pub thinking: String,
    pub usage: Option<Usage>,
}

/// Handle for receiving streaming events from a backend call.
///
/// Wraps an `mpsc::Receiver<StreamEvent>` and provides convenience methods
/// for consuming the stream.
pub struct StreamHandle {
    pub receiver: mpsc::Receiver<StreamEvent>,
}

impl StreamHandle {
    pub fn new(receiver: mpsc::Receiver<StreamEvent>) -> Self {
        Self { receiver }
    }

    /// Build a handle that replays a fixed list of events
    pub fn from_events(events: Vec<StreamEvent>) -> Self {
        let (tx, rx) = mpsc::channel(events.len().max(1));
        for event in events {
            // capacity covers every event
            let _ = tx.try_send(event);
        }
        Self::new(rx)
    }

    pub async fn next(&mut self) -> Option<StreamEvent> {
        self.receiver.recv().await
    }

    /// Consume the stream and collect the answer text.
    ///
    /// A stream that closes without a terminal event returns what arrived.
    pub async fn collect(mut self) -> Result<Completion, BackendError> {
        let mut completion = Completion::default();
        while let Some(event) = self.receiver.recv().await {
            match event {
                StreamEvent::Delta(chunk) => completion.text.push_str(&chunk),
                StreamEvent::ThinkingDelta(chunk) => completion.thinking.push_str(&chunk),
                StreamEvent::Usage(usage) => {
                    completion.usage = Some(usage);
                    break;
                }
                StreamEvent::Error(e) => return Err(BackendError::Stream(e)),
            }
        }
        Ok(completion)
    }
}

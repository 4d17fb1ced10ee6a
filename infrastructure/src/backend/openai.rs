//! OpenAI-compatible streaming backend (OpenRouter, Groq, Ollama, vLLM...)
//!
//! Each call POSTs `/chat/completions` with `stream: true` and forwards the
//! SSE chunks as [`StreamEvent`]s through a bounded channel. The reader task
//! stops as soon as the receiving side is dropped, which abandons the HTTP
//! response and closes the connection.

use super::sse::{SseDecoder, SseFrame, parse_chunk};
use crate::config::FileBackendConfig;
use async_trait::async_trait;
use council_application::ports::model_backend::{BackendError, ModelBackend, StreamHandle};
use council_domain::{Message, Model, StreamEvent, Usage};
use futures::StreamExt;
use serde::Serialize;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::{debug, warn};

/// Buffered events per call before the reader waits for the consumer
const STREAM_BUFFER: usize = 64;

/// Largest error body kept in an error message
const ERROR_BODY_LIMIT: usize = 500;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    stream: bool,
    stream_options: StreamOptions,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct StreamOptions {
    include_usage: bool,
}

/// Model backend speaking the OpenAI chat completions protocol
pub struct OpenAiCompatibleBackend {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    max_tokens: Option<u32>,
}

impl OpenAiCompatibleBackend {
    /// Create a backend from the `[backend]` config section
    pub fn new(config: &FileBackendConfig) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_seconds))
            .build()
            .map_err(|e| BackendError::Connection(e.to_string()))?;
        if config.api_key().is_none() {
            warn!(
                "{} is not set, calling {} without an API key",
                config.api_key_env, config.base_url
            );
        }
        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            api_key: config.api_key(),
            max_tokens: Some(4096),
        })
    }

    /// Create a backend for an explicit base URL (for testing)
    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: format!("{}/chat/completions", base_url.trim_end_matches('/')),
            api_key: None,
            max_tokens: None,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ModelBackend for OpenAiCompatibleBackend {
    async fn stream(
        &self,
        model: &Model,
        messages: &[Message],
    ) -> Result<StreamHandle, BackendError> {
        let body = ChatRequest {
            model: model.as_str(),
            messages,
            stream: true,
            stream_options: StreamOptions {
                include_usage: true,
            },
            max_tokens: self.max_tokens,
        };

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        debug!("Streaming {} message(s) to {}", messages.len(), model);
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                BackendError::Timeout
            } else {
                BackendError::Connection(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let message: String = text.chars().take(ERROR_BODY_LIMIT).collect();
            return Err(if status == reqwest::StatusCode::NOT_FOUND {
                BackendError::ModelNotAvailable(format!("{}: {}", model, message))
            } else {
                BackendError::Http {
                    status: status.as_u16(),
                    message,
                }
            });
        }

        let (tx, rx) = mpsc::channel(STREAM_BUFFER);
        let model = model.clone();
        tokio::spawn(async move {
            forward_stream(response, tx, &model).await;
        });
        Ok(StreamHandle::new(rx))
    }
}

/// Read the SSE body into `tx`, always ending with a terminal event unless
/// the consumer went away.
async fn forward_stream(response: reqwest::Response, tx: mpsc::Sender<StreamEvent>, model: &Model) {
    let mut body = response.bytes_stream();
    let mut decoder = SseDecoder::new();
    let mut usage = Usage::default();

    'read: while let Some(chunk) = body.next().await {
        let chunk = match chunk {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Stream from {} broke: {}", model, e);
                let _ = tx.send(StreamEvent::Error(e.to_string())).await;
                return;
            }
        };
        for frame in decoder.push(&chunk) {
            match frame {
                SseFrame::Done => break 'read,
                SseFrame::Data(data) => {
                    if !forward_data(&data, &tx, &mut usage).await {
                        return;
                    }
                }
            }
        }
    }
    if let Some(SseFrame::Data(data)) = decoder.finish()
        && !forward_data(&data, &tx, &mut usage).await
    {
        return;
    }

    let _ = tx.send(StreamEvent::Usage(usage)).await;
}

/// Returns false when the stream must stop (consumer gone or error sent)
async fn forward_data(data: &str, tx: &mpsc::Sender<StreamEvent>, usage: &mut Usage) -> bool {
    let parsed = match parse_chunk(data) {
        Ok(parsed) => parsed,
        Err(e) => {
            debug!("Skipping stream chunk: {}", e);
            return true;
        }
    };
    if let Some(reported) = parsed.usage {
        *usage = reported;
    }
    for event in parsed.events {
        let terminal = event.is_terminal();
        if tx.send(event).await.is_err() || terminal {
            return false;
        }
    }
    true
}

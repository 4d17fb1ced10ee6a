//! Server-sent events decoding for OpenAI-compatible chat streams.
//!
//! Bytes are buffered until a full line arrives so multi-byte characters
//! split across network chunks decode intact. Only `data:` lines matter;
//! comments (`: keep-alive`) and other fields are skipped.

use council_domain::{StreamEvent, Usage};
use serde::Deserialize;

/// One meaningful SSE line
#[derive(Debug, Clone, PartialEq)]
pub enum SseFrame {
    Data(String),
    /// `data: [DONE]`
    Done,
}

/// Incremental line splitter over a byte stream
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a network chunk, returning every frame it completed
    pub fn push(&mut self, chunk: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(chunk);
        let mut frames = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(frame) = parse_line(&String::from_utf8_lossy(&line)) {
                frames.push(frame);
            }
        }
        frames
    }

    /// Flush a trailing line the server sent without a newline
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        parse_line(&String::from_utf8_lossy(&rest))
    }
}

fn parse_line(line: &str) -> Option<SseFrame> {
    let data = line.trim().strip_prefix("data:")?.trim();
    if data.is_empty() {
        None
    } else if data == "[DONE]" {
        Some(SseFrame::Done)
    } else {
        Some(SseFrame::Data(data.to_string()))
    }
}

#[derive(Debug, Deserialize)]
struct ChatChunk {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    usage: Option<ChunkUsage>,
    #[serde(default)]
    error: Option<ChunkError>,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: ChunkDelta,
}

#[derive(Debug, Default, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    reasoning_content: Option<String>,
    #[serde(default)]
    reasoning: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChunkUsage {
    #[serde(default)]
    prompt_tokens: u64,
    #[serde(default)]
    completion_tokens: u64,
    #[serde(default)]
    total_tokens: Option<u64>,
    #[serde(default)]
    cost: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

/// What one `data:` payload contributed
#[derive(Debug, Default, PartialEq)]
pub struct ParsedChunk {
    /// Thinking and answer deltas, in that order
    pub events: Vec<StreamEvent>,
    pub usage: Option<Usage>,
}

/// Decode one JSON payload. A payload carrying an `error` object becomes a
/// single [`StreamEvent::Error`].
pub fn parse_chunk(data: &str) -> Result<ParsedChunk, String> {
    let chunk: ChatChunk =
        serde_json::from_str(data).map_err(|e| format!("malformed stream chunk: {}", e))?;

    if let Some(error) = chunk.error {
        let message = if error.message.is_empty() {
            "backend reported an error".to_string()
        } else {
            error.message
        };
        return Ok(ParsedChunk {
            events: vec![StreamEvent::Error(message)],
            usage: None,
        });
    }

    let mut parsed = ParsedChunk::default();
    for choice in chunk.choices {
        let thinking = choice.delta.reasoning_content.or(choice.delta.reasoning);
        if let Some(thinking) = thinking.filter(|t| !t.is_empty()) {
            parsed.events.push(StreamEvent::ThinkingDelta(thinking));
        }
        if let Some(content) = choice.delta.content.filter(|c| !c.is_empty()) {
            parsed.events.push(StreamEvent::Delta(content));
        }
    }
    parsed.usage = chunk.usage.map(|u| {
        let mut usage = Usage::new(u.prompt_tokens, u.completion_tokens);
        if let Some(total) = u.total_tokens {
            usage.total_tokens = total;
        }
        usage.with_cost(u.cost.unwrap_or(0.0))
    });
    Ok(parsed)
}

//! JSONL transcript writer for deliberation events.
//!
//! Each [`ConversationEvent`] is serialized as a single JSON line with
//! `type`, `conversation_id` and an RFC3339 `timestamp`, appended to the
//! conversation's file via a buffered writer. Follow-up turns of the same
//! conversation append to the same file.

use council_application::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use serde_json::Value;
use std::fs::{File, OpenOptions};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::warn;

/// JSONL conversation logger that writes one JSON object per line.
///
/// Thread-safe via `Mutex<BufWriter<File>>`. Flushes on `Drop`.
pub struct JsonlConversationLogger {
    writer: Mutex<BufWriter<File>>,
    conversation_id: String,
    path: PathBuf,
}

impl JsonlConversationLogger {
    /// Open `<dir>/<conversation_id>.jsonl` for appending.
    ///
    /// Creates the directory if needed. Returns `None` (after a warning) if
    /// the file cannot be opened; transcripts never block a run.
    pub fn for_conversation(dir: impl AsRef<Path>, conversation_id: &str) -> Option<Self> {
        let path = dir
            .as_ref()
            .join(format!("{}.jsonl", file_stem(conversation_id)));
        Self::open(path, conversation_id)
    }

    /// Open an explicit transcript path for appending.
    pub fn open(path: impl AsRef<Path>, conversation_id: &str) -> Option<Self> {
        let path = path.as_ref();

        if let Some(parent) = path.parent()
            && let Err(e) = std::fs::create_dir_all(parent)
        {
            warn!(
                "Could not create transcript directory {}: {}",
                parent.display(),
                e
            );
            return None;
        }

        let file = match OpenOptions::new().create(true).append(true).open(path) {
            Ok(f) => f,
            Err(e) => {
                warn!("Could not open transcript {}: {}", path.display(), e);
                return None;
            }
        };

        Some(Self {
            writer: Mutex::new(BufWriter::new(file)),
            conversation_id: conversation_id.to_string(),
            path: path.to_path_buf(),
        })
    }

    /// Get the path to the transcript file.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Conversation ids come from clients; keep only filename-safe characters
fn file_stem(conversation_id: &str) -> String {
    let stem: String = conversation_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .take(128)
        .collect();
    if stem.is_empty() {
        "conversation".to_string()
    } else {
        stem
    }
}

impl ConversationLogger for JsonlConversationLogger {
    fn log(&self, event: ConversationEvent) {
        let timestamp = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);

        // Merge payload with type, conversation id and timestamp
        let record = match event.payload {
            Value::Object(mut map) => {
                map.insert("type".to_string(), Value::String(event.event_type.to_string()));
                map.insert(
                    "conversation_id".to_string(),
                    Value::String(self.conversation_id.clone()),
                );
                map.insert("timestamp".to_string(), Value::String(timestamp));
                Value::Object(map)
            }
            other => serde_json::json!({
                "type": event.event_type,
                "conversation_id": self.conversation_id,
                "timestamp": timestamp,
                "data": other,
            }),
        };

        let Ok(line) = serde_json::to_string(&record) else {
            return;
        };

        if let Ok(mut writer) = self.writer.lock() {
            let _ = writeln!(writer, "{}", line);
            let _ = writer.flush();
        }
    }
}

impl Drop for JsonlConversationLogger {
    fn drop(&mut self) {
        if let Ok(mut writer) = self.writer.lock() {
            let _ = writer.flush();
        }
    }
}

//! Tool call outcomes
//!
//! A tool call can fail two ways: the transport fails (server unreachable,
//! timeout, HTTP error) or the server answers with a failure payload. Both
//! are kept apart here and both turn into an explicit instruction for the
//! answering model to report the failure instead of inventing a result.

use super::entities::ToolSelection;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Raw reply from a tool server: `{success, content | error}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolResponse {
    pub success: bool,
    #[serde(default)]
    pub content: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolResponse {
    pub fn ok(content: Value) -> Self {
        Self {
            success: true,
            content,
            error: None,
        }
    }

    pub fn failed(error: impl Into<String>) -> Self {
        Self {
            success: false,
            content: Value::Null,
            error: Some(error.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolStatus {
    Succeeded,
    TransportFailed,
    ContentFailed,
}

/// Final result of the tool interception step
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutcome {
    pub server: String,
    pub tool: String,
    pub arguments: Value,
    pub status: ToolStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ToolOutcome {
    /// Classify a server reply, detecting failures hidden in the content
    pub fn from_response(selection: &ToolSelection, response: ToolResponse) -> Self {
        if !response.success {
            let error = response
                .error
                .or_else(|| content_error(&response.content))
                .unwrap_or_else(|| "tool reported failure".to_string());
            return Self::with_status(selection, ToolStatus::ContentFailed, None, Some(error));
        }
        if let Some(error) = content_error(&response.content) {
            return Self::with_status(selection, ToolStatus::ContentFailed, None, Some(error));
        }
        Self::with_status(
            selection,
            ToolStatus::Succeeded,
            Some(render_content(&response.content)),
            None,
        )
    }

    pub fn transport_failure(selection: &ToolSelection, error: impl Into<String>) -> Self {
        Self::with_status(
            selection,
            ToolStatus::TransportFailed,
            None,
            Some(error.into()),
        )
    }

    fn with_status(
        selection: &ToolSelection,
        status: ToolStatus,
        content: Option<String>,
        error: Option<String>,
    ) -> Self {
        Self {
            server: selection.server.clone(),
            tool: selection.tool.clone(),
            arguments: selection.arguments.clone(),
            status,
            content,
            error,
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ToolStatus::Succeeded
    }

    /// Context block handed to the answering model
    pub fn prompt_context(&self) -> String {
        let call = format!("{}.{}({})", self.server, self.tool, self.arguments);
        match self.status {
            ToolStatus::Succeeded => format!(
                "TOOL RESULT from {}:\n{}\n\nUse this result in your answer.",
                call,
                self.content.as_deref().unwrap_or_default()
            ),
            ToolStatus::TransportFailed | ToolStatus::ContentFailed => {
                let kind = if self.status == ToolStatus::TransportFailed {
                    "could not be reached"
                } else {
                    "returned an error"
                };
                format!(
                    "TOOL FAILED: {} {}: {}\n\nThe tool failed. Report this failure honestly to the user. \
                     Do not fabricate or guess the result the tool would have returned.",
                    call,
                    kind,
                    self.error.as_deref().unwrap_or("unknown error")
                )
            }
        }
    }
}

/// Error message carried inside an otherwise successful payload.
///
/// Checks an `isError: true` flag, `success: false`, and an `error` key,
/// both on the value itself and on JSON encoded inside a text body.
fn content_error(content: &Value) -> Option<String> {
    match content {
        Value::Object(map) => {
            let flagged = map.get("isError").and_then(Value::as_bool) == Some(true)
                || map.get("success").and_then(Value::as_bool) == Some(false);
            let message = map.get("error").and_then(|e| match e {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => Some(other.to_string()),
            });
            match (flagged, message) {
                (_, Some(message)) => Some(message),
                (true, None) => Some(
                    map.get("content")
                        .map(render_content)
                        .unwrap_or_else(|| "tool reported failure".to_string()),
                ),
                (false, None) => None,
            }
        }
        Value::Array(items) => items.iter().find_map(|item| {
            item.get("text")
                .and_then(Value::as_str)
                .and_then(|text| serde_json::from_str::<Value>(text).ok())
                .and_then(|inner| content_error(&inner))
        }),
        Value::String(text) => serde_json::from_str::<Value>(text)
            .ok()
            .filter(Value::is_object)
            .and_then(|inner| content_error(&inner)),
        _ => None,
    }
}

/// Flatten tool content to text; MCP-style `[{type: "text", text}]` lists
/// are joined.
fn render_content(content: &Value) -> String {
    match content {
        Value::String(s) => s.clone(),
        Value::Array(items) if items.iter().all(|i| i.get("text").is_some()) => items
            .iter()
            .filter_map(|i| i.get("text").and_then(Value::as_str))
            .collect::<Vec<_>>()
            .join("\n"),
        Value::Null => String::new(),
        other => other.to_string(),
    }
}

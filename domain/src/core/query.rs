//! Query value object

use crate::core::error::DomainError;
use crate::util::truncate_str;
use serde::{Deserialize, Serialize};

/// Speaker of a prior conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TurnRole {
    User,
    Assistant,
}

/// One prior turn of the conversation
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub role: TurnRole,
    pub content: String,
}

impl Turn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: content.into(),
        }
    }
}

/// A user query submitted to the council (Value Object)
///
/// Immutable text plus the ordered conversation history. Owned by the
/// caller; the orchestrator only reads it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Query {
    content: String,
    #[serde(default)]
    history: Vec<Turn>,
}

impl Query {
    /// Create a new query, rejecting blank content
    pub fn try_new(content: impl Into<String>) -> Result<Self, DomainError> {
        let content = content.into();
        if content.trim().is_empty() {
            return Err(DomainError::InvalidQuery(
                "query cannot be empty".to_string(),
            ));
        }
        Ok(Self {
            content,
            history: Vec::new(),
        })
    }

    pub fn with_history(mut self, history: Vec<Turn>) -> Self {
        self.history = history;
        self
    }

    /// Get the query content
    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn history(&self) -> &[Turn] {
        &self.history
    }

    pub fn has_history(&self) -> bool {
        !self.history.is_empty()
    }

    /// The last `n` turns, oldest first
    pub fn recent_history(&self, n: usize) -> &[Turn] {
        let start = self.history.len().saturating_sub(n);
        &self.history[start..]
    }

    /// Compact "User: ... / Assistant: ..." rendering of the last `n` turns,
    /// each truncated to `max_bytes`.
    pub fn history_excerpt(&self, n: usize, max_bytes: usize) -> String {
        self.recent_history(n)
            .iter()
            .map(|turn| {
                let speaker = match turn.role {
                    TurnRole::User => "User",
                    TurnRole::Assistant => "Assistant",
                };
                format!("{}: {}", speaker, truncate_str(&turn.content, max_bytes))
            })
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl std::fmt::Display for Query {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.content)
    }
}

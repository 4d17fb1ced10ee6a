//! Query classification
//!
//! The classifier labels each query so the orchestrator can decide between
//! a single direct answer and a full panel deliberation. Two cheap
//! heuristics run without any backend call: follow-up detection and the
//! tool keyword hint.

use crate::core::query::Query;
use crate::util::extract_json_object;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// What kind of answer a query needs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Factual,
    Chat,
    Deliberation,
    Followup,
}

impl QueryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryType::Factual => "factual",
            QueryType::Chat => "chat",
            QueryType::Deliberation => "deliberation",
            QueryType::Followup => "followup",
        }
    }

    /// Unknown labels degrade to deliberation
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "factual" => QueryType::Factual,
            "chat" => QueryType::Chat,
            "followup" | "follow-up" => QueryType::Followup,
            _ => QueryType::Deliberation,
        }
    }

    /// Answered by one chairman call instead of a panel
    pub fn is_direct(&self) -> bool {
        !matches!(self, QueryType::Deliberation)
    }
}

/// Classifier verdict for one query
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Classification {
    #[serde(rename = "type")]
    pub query_type: QueryType,
    #[serde(default)]
    pub requires_tool: bool,
    #[serde(default)]
    pub reasoning: String,
}

impl Classification {
    pub fn new(query_type: QueryType, reasoning: impl Into<String>) -> Self {
        Self {
            query_type,
            requires_tool: false,
            reasoning: reasoning.into(),
        }
    }

    pub fn with_requires_tool(mut self, requires_tool: bool) -> Self {
        self.requires_tool = requires_tool;
        self
    }

    /// Safe default when the classifier fails or replies with garbage
    pub fn fallback(reason: impl Into<String>) -> Self {
        Self::new(QueryType::Deliberation, reason)
    }

    /// Label used when the caller forces a direct answer
    pub fn forced_direct() -> Self {
        Self::new(QueryType::Chat, "direct answer requested")
    }
}

const FOLLOWUP_PHRASES: &[&str] = &[
    "follow up",
    "followup",
    "follow-up",
    "as i said",
    "as i mentioned",
    "as we discussed",
    "what you said",
    "you said",
    "you mentioned",
    "you suggested",
    "you recommended",
    "all of this",
    "all of that",
    "based on this",
    "based on that",
    "based on what",
    "can you summarize",
    "going back to",
    "regarding what",
    "the above",
    "mentioned earlier",
    "earlier you",
    "you just said",
    "expand on",
    "elaborate on",
    "more about",
    "what about",
    "how about",
    "can you also",
    "one more thing",
    "ok now",
    "ok so",
];

const CONTEXT_PRONOUNS: &[&str] = &["that", "this", "it", "them", "those", "these"];

const SELF_CONTAINED_OPENERS: &[&str] = &["what is a", "what is an", "define ", "who is "];

/// Detect obvious follow-ups without calling a model.
///
/// Only applies when the query carries history.
pub fn detect_followup(query: &Query) -> Option<Classification> {
    if !query.has_history() {
        return None;
    }
    let lower = query.content().trim().to_lowercase();

    if let Some(phrase) = FOLLOWUP_PHRASES.iter().find(|p| lower.contains(*p)) {
        return Some(Classification::new(
            QueryType::Followup,
            format!("heuristic: contains '{}'", phrase),
        ));
    }

    let words: Vec<&str> = lower
        .split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()))
        .collect();
    if words.len() <= 15
        && !SELF_CONTAINED_OPENERS.iter().any(|o| lower.contains(o))
        && let Some(pronoun) = CONTEXT_PRONOUNS.iter().find(|p| words.contains(*p))
    {
        return Some(Classification::new(
            QueryType::Followup,
            format!("heuristic: short message with context pronoun '{}'", pronoun),
        ));
    }

    None
}

/// Parse the classifier's reply. Returns `None` when no JSON object with a
/// `type` field can be found.
pub fn parse_classification(text: &str) -> Option<Classification> {
    let value = extract_json_object(text)?;
    let label = value.get("type")?.as_str()?;
    let requires_tool = value
        .get("requires_tool")
        .and_then(serde_json::Value::as_bool)
        .unwrap_or(false);
    let reasoning = value
        .get("reasoning")
        .and_then(serde_json::Value::as_str)
        .unwrap_or_default();
    Some(Classification::new(QueryType::from_label(label), reasoning).with_requires_tool(requires_tool))
}

static ARITHMETIC: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\d+(?:\.\d+)?\s*(?:[-+*/×÷^%]|\bx\b)\s*\(?\s*\d").expect("valid regex")
});

const TOOL_KEYWORDS: &[&str] = &[
    "weather",
    "forecast",
    "time in",
    "what time is it",
    "today's date",
    "current date",
    "calculate",
    "compute",
];

/// Cheap keyword check for queries that obviously want a tool
pub fn tool_keyword_hint(text: &str) -> bool {
    let lower = text.to_lowercase();
    ARITHMETIC.is_match(&lower) || TOOL_KEYWORDS.iter().any(|k| lower.contains(k))
}

const CALCULATION_OPENERS: &[&str] = &[
    "what is",
    "what's",
    "whats",
    "calculate",
    "compute",
    "how much is",
    "evaluate",
];

/// True when the query is nothing but an arithmetic expression, optionally
/// wrapped in "what is … ?"
pub fn is_pure_calculation(text: &str) -> bool {
    let mut rest = text.trim().to_lowercase();
    for opener in CALCULATION_OPENERS {
        if let Some(stripped) = rest.strip_prefix(opener) {
            rest = stripped.trim_start_matches([':', ' ']).to_string();
            break;
        }
    }
    let expr = rest.trim().trim_end_matches(['?', '=', '.', '!']).trim();
    !expr.is_empty()
        && expr.chars().any(|c| c.is_ascii_digit())
        && expr
            .chars()
            .all(|c| c.is_ascii_digit() || " +-*/().^%x×÷,".contains(c))
        && ARITHMETIC.is_match(expr)
}

//! Classify query use case
//!
//! Labels a query `factual | chat | deliberation | followup` and decides
//! whether a tool is needed. Never fails: every problem degrades to the
//! safe default (`deliberation`, no tool).

use crate::ports::model_backend::{BackendError, ModelBackend};
use council_domain::deliberation::classification::{
    detect_followup, parse_classification, tool_keyword_hint,
};
use council_domain::{Classification, Message, Model, PromptTemplate, Query, Usage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Characters of each history turn shown to the classifier
const HISTORY_EXCERPT_BYTES: usize = 300;

/// Result of classification
#[derive(Debug, Clone, PartialEq)]
pub struct ClassifyOutcome {
    pub classification: Classification,
    /// Set when the classifier could not be reached; the run reports it and
    /// continues with the default label.
    pub escalation: Option<String>,
    pub usage: Option<Usage>,
}

impl ClassifyOutcome {
    fn labelled(classification: Classification, usage: Option<Usage>) -> Self {
        Self {
            classification,
            escalation: None,
            usage,
        }
    }
}

/// Use case for classifying a query with one backend call
pub struct ClassifyQueryUseCase<B: ModelBackend + ?Sized> {
    backend: Arc<B>,
    timeout: Duration,
    history_turns: usize,
}

impl<B: ModelBackend + ?Sized> ClassifyQueryUseCase<B> {
    pub fn new(backend: Arc<B>, timeout: Duration, history_turns: usize) -> Self {
        Self {
            backend,
            timeout,
            history_turns,
        }
    }

    pub async fn execute(
        &self,
        query: &Query,
        model: &Model,
        tools_available: bool,
    ) -> ClassifyOutcome {
        let keyword_hint = tools_available && tool_keyword_hint(query.content());

        if let Some(classification) = detect_followup(query) {
            debug!("Follow-up detected without classifier: {}", classification.reasoning);
            return ClassifyOutcome::labelled(
                classification.with_requires_tool(keyword_hint),
                None,
            );
        }

        let history = query.history_excerpt(self.history_turns, HISTORY_EXCERPT_BYTES);
        let prompt = PromptTemplate::classification(query.content(), &history, tools_available);
        let messages = [Message::user(prompt)];

        let reply = match tokio::time::timeout(self.timeout, async {
            self.backend.stream(model, &messages).await?.collect().await
        })
        .await
        {
            Ok(reply) => reply,
            Err(_) => Err(BackendError::Timeout),
        };

        let mut outcome = match reply {
            Ok(completion) => match parse_classification(&completion.text) {
                Some(classification) => {
                    ClassifyOutcome::labelled(classification, completion.usage)
                }
                None => {
                    warn!("Classifier reply had no usable JSON, defaulting to deliberation");
                    ClassifyOutcome::labelled(
                        Classification::fallback("classifier output could not be parsed"),
                        completion.usage,
                    )
                }
            },
            Err(e) if e.is_transport() => {
                warn!("Classifier {} unreachable: {}", model, e);
                ClassifyOutcome {
                    classification: Classification::fallback("classifier unavailable"),
                    escalation: Some(format!("Classification failed: {}", e)),
                    usage: None,
                }
            }
            Err(e) => {
                warn!("Classifier {} failed: {}", model, e);
                ClassifyOutcome::labelled(
                    Classification::fallback(format!("classifier error: {}", e)),
                    None,
                )
            }
        };

        let requires_tool = tools_available && (outcome.classification.requires_tool || keyword_hint);
        outcome.classification.requires_tool = requires_tool;
        info!(
            "Classified as {} (requires_tool: {})",
            outcome.classification.query_type.as_str(),
            requires_tool
        );
        outcome
    }
}

//! Tool-call interceptor
//!
//! Two phases: a lightweight model picks one tool from the inventory (or
//! declines), then the pick is executed through the [`ToolInvoker`] port.
//! Transport and content failures both end in a [`ToolOutcome`] whose prompt
//! context tells the answering model to report the failure honestly.

use super::event_emitter::{ClientGone, EventEmitter};
use crate::ports::model_backend::{BackendError, ModelBackend};
use crate::ports::tool_invoker::{ToolInvokeError, ToolInvoker};
use council_domain::tool::parse_tool_selection;
use council_domain::{
    DeliberationEvent, Message, Model, PromptTemplate, Query, ToolInventory, ToolOutcome, Usage,
};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ToolCheckOutcome {
    /// `None` when the selector declined or failed
    pub outcome: Option<ToolOutcome>,
    pub usage: Option<Usage>,
}

pub struct InterceptToolUseCase<B: ModelBackend + ?Sized, T: ToolInvoker + ?Sized> {
    backend: Arc<B>,
    tools: Arc<T>,
    timeout: Duration,
}

impl<B: ModelBackend + ?Sized, T: ToolInvoker + ?Sized> InterceptToolUseCase<B, T> {
    pub fn new(backend: Arc<B>, tools: Arc<T>, timeout: Duration) -> Self {
        Self {
            backend,
            tools,
            timeout,
        }
    }

    pub async fn execute(
        &self,
        query: &Query,
        selector: &Model,
        inventory: &ToolInventory,
        emitter: &EventEmitter,
    ) -> Result<ToolCheckOutcome, ClientGone> {
        if inventory.is_empty() {
            debug!("No tools registered, skipping tool check");
            return Ok(ToolCheckOutcome::default());
        }

        // Phase 1: selection
        let prompt = PromptTemplate::tool_selection(query.content(), &inventory.prompt_listing());
        let messages = [Message::user(prompt)];
        let reply = match tokio::time::timeout(self.timeout, async {
            self.backend.stream(selector, &messages).await?.collect().await
        })
        .await
        {
            Ok(reply) => reply,
            Err(_) => Err(BackendError::Timeout),
        };

        let completion = match reply {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Tool selector {} failed: {}", selector, e);
                return Ok(ToolCheckOutcome::default());
            }
        };
        let usage = completion.usage;

        let Some(selection) = parse_tool_selection(&completion.text, inventory) else {
            info!("Tool selector declined");
            return Ok(ToolCheckOutcome {
                outcome: None,
                usage,
            });
        };

        // Phase 2: execution
        info!("Calling tool {}.{}", selection.server, selection.tool);
        emitter
            .emit(DeliberationEvent::tool_call_start(&selection))
            .await?;

        let invoked = tokio::time::timeout(
            self.timeout,
            self.tools
                .invoke(&selection.server, &selection.tool, &selection.arguments),
        )
        .await
        .unwrap_or(Err(ToolInvokeError::Timeout));

        let outcome = match invoked {
            Ok(response) => ToolOutcome::from_response(&selection, response),
            Err(e) => ToolOutcome::transport_failure(&selection, e.to_string()),
        };
        if outcome.is_success() {
            info!("Tool {}.{} succeeded", outcome.server, outcome.tool);
        } else {
            warn!(
                "Tool {}.{} failed: {}",
                outcome.server,
                outcome.tool,
                outcome.error.as_deref().unwrap_or("unknown error")
            );
        }

        emitter
            .emit(DeliberationEvent::tool_call_complete(&outcome))
            .await?;
        Ok(ToolCheckOutcome {
            outcome: Some(outcome),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::conversation_logger::NoConversationLogger;
    use crate::testing::{Script, ScriptedBackend, StaticTools};
    use council_domain::{ToolDescriptor, ToolResponse, ToolStatus};
    use serde_json::json;
    use tokio::sync::mpsc;
    use tokio_util::sync::CancellationToken;

    fn inventory() -> ToolInventory {
        ToolInventory::new(vec![ToolDescriptor::new(
            "calculator",
            "evaluate",
            "Evaluate an arithmetic expression",
        )])
    }

    fn pick_calculator() -> Script {
        Script::text(
            r#"{"server": "calculator", "tool": "evaluate", "arguments": {"expression": "2+2"}}"#,
        )
    }

    async fn run(
        backend: ScriptedBackend,
        tools: StaticTools,
        inventory: ToolInventory,
    ) -> (ToolCheckOutcome, Vec<DeliberationEvent>) {
        let (tx, mut rx) = mpsc::channel(64);
        let emitter = EventEmitter::new(tx, Arc::new(NoConversationLogger), CancellationToken::new());
        let use_case =
            InterceptToolUseCase::new(Arc::new(backend), Arc::new(tools), Duration::from_secs(30));
        let outcome = use_case
            .execute(
                &Query::try_new("what is 2+2").unwrap(),
                &Model::new("chair"),
                &inventory,
                &emitter,
            )
            .await
            .unwrap();
        drop(emitter);
        let mut events = Vec::new();
        while let Some(event) = rx.recv().await {
            events.push(event);
        }
        (outcome, events)
    }

    #[tokio::test]
    async fn successful_call_emits_start_and_complete() {
        let backend = ScriptedBackend::new().script("chair", pick_calculator());
        let tools = StaticTools::new(inventory()).respond(Ok(ToolResponse::ok(json!(4))));

        let (outcome, events) = run(backend, tools, inventory()).await;
        let outcome = outcome.outcome.unwrap();
        assert!(outcome.is_success());
        assert!(outcome.prompt_context().contains('4'));

        let types: Vec<&str> = events.iter().map(DeliberationEvent::event_type).collect();
        assert_eq!(types, vec!["tool_call_start", "tool_call_complete"]);
    }

    #[tokio::test]
    async fn content_failure_demands_honesty() {
        let backend = ScriptedBackend::new().script("chair", pick_calculator());
        let tools = StaticTools::new(inventory())
            .respond(Ok(ToolResponse::failed("timeout")));

        let (outcome, events) = run(backend, tools, inventory()).await;
        let outcome = outcome.outcome.unwrap();
        assert_eq!(outcome.status, ToolStatus::ContentFailed);
        let context = outcome.prompt_context();
        assert!(context.contains("timeout"));
        assert!(context.contains("Report this failure honestly"));
        assert!(context.contains("Do not fabricate"));
        assert!(matches!(
            events.last(),
            Some(DeliberationEvent::ToolCallComplete { success: false, .. })
        ));
    }

    #[tokio::test]
    async fn transport_failure_is_distinguished() {
        let backend = ScriptedBackend::new().script("chair", pick_calculator());
        let tools = StaticTools::new(inventory())
            .respond(Err(ToolInvokeError::Unreachable("connection refused".to_string())));

        let (outcome, _) = run(backend, tools, inventory()).await;
        let outcome = outcome.outcome.unwrap();
        assert_eq!(outcome.status, ToolStatus::TransportFailed);
        assert!(outcome.prompt_context().contains("could not be reached"));
    }

    #[tokio::test]
    async fn declined_selection_calls_nothing() {
        let backend = ScriptedBackend::new().script("chair", Script::text(r#"{"tool": null}"#));
        let tools = StaticTools::new(inventory());

        let (outcome, events) = run(backend, tools, inventory()).await;
        assert!(outcome.outcome.is_none());
        assert!(events.is_empty());
    }

    #[tokio::test]
    async fn empty_inventory_skips_selection() {
        let backend = ScriptedBackend::new();
        let tools = StaticTools::new(ToolInventory::default());

        let (outcome, events) = run(backend, tools, ToolInventory::default()).await;
        assert_eq!(outcome, ToolCheckOutcome::default());
        assert!(events.is_empty());
    }
}

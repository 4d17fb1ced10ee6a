//! Route panel use case
//!
//! Asks the router model to seat 3-5 advisors for a deliberation query.
//! Any failure (transport, timeout, malformed or invalid reply) falls back to
//! the council's static default panel.

use crate::ports::model_backend::{BackendError, ModelBackend};
use council_domain::council::panel::parse_panel_selections;
use council_domain::util::extract_json_object;
use council_domain::{CouncilSnapshot, Message, Panel, PromptTemplate, Query, Usage};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct RouteOutcome {
    pub panel: Panel,
    /// The static default panel was used
    pub fallback: bool,
    pub usage: Option<Usage>,
}

impl RouteOutcome {
    fn fallback(council: &CouncilSnapshot, usage: Option<Usage>) -> Self {
        Self {
            panel: Panel::fallback(council),
            fallback: true,
            usage,
        }
    }
}

pub struct RoutePanelUseCase<B: ModelBackend + ?Sized> {
    backend: Arc<B>,
    timeout: Duration,
}

impl<B: ModelBackend + ?Sized> RoutePanelUseCase<B> {
    pub fn new(backend: Arc<B>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn execute(&self, query: &Query, council: &CouncilSnapshot) -> RouteOutcome {
        if !council.supports_routing() {
            info!(
                "Council {} has no routing choice, seating default panel",
                council.id()
            );
            return RouteOutcome::fallback(council, None);
        }

        let models: Vec<String> = council
            .model_pool()
            .iter()
            .map(|m| m.to_string())
            .collect();
        let prompt = PromptTemplate::routing(
            query.content(),
            &council.roster_text(),
            &models,
            council.bounds(),
        );
        let messages = [Message::user(prompt)];
        let router = council.classifier_model();

        let reply = match tokio::time::timeout(self.timeout, async {
            self.backend.stream(router, &messages).await?.collect().await
        })
        .await
        {
            Ok(reply) => reply,
            Err(_) => Err(BackendError::Timeout),
        };

        let completion = match reply {
            Ok(completion) => completion,
            Err(e) => {
                warn!("Router {} failed: {}, using fallback panel", router, e);
                return RouteOutcome::fallback(council, None);
            }
        };

        let Some(selections) =
            extract_json_object(&completion.text).and_then(|value| parse_panel_selections(&value))
        else {
            warn!("Router reply had no panel, using fallback panel");
            return RouteOutcome::fallback(council, completion.usage);
        };

        match Panel::resolve(&selections, council) {
            Ok(panel) => {
                info!(
                    "Router seated {} advisors: {}",
                    panel.len(),
                    panel
                        .members()
                        .iter()
                        .map(|m| m.member_id())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                RouteOutcome {
                    panel,
                    fallback: false,
                    usage: completion.usage,
                }
            }
            Err(e) => {
                warn!("Router panel rejected: {}, using fallback panel", e);
                RouteOutcome::fallback(council, completion.usage)
            }
        }
    }
}

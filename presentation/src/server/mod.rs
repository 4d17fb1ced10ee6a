//! Streaming HTTP API
//!
//! ```text
//! POST /api/conversations/{id}/message/stream   text/event-stream, one event per `data:` line
//! GET  /api/health                              {status, councils, chairman}
//! GET  /api/councils                            roster summary of every council
//! GET  /api/councils/{council_id}               full council configuration
//! GET  /api/leaderboard                         {council_id: standings} for every council
//! GET  /api/leaderboard/{council_id}            standings, best first
//! ```
//!
//! Each streamed request runs its own deliberation task. The run is
//! cancelled as soon as the client goes away.

mod error;
mod routes;

pub use error::CouncilError;

use axum::Router;
use axum::routing::{get, post};
use council_application::{
    ConversationLogger, LeaderboardSink, ModelBackend, NoConversationLogger, RunDeliberationUseCase,
    ToolInvoker,
};
use council_domain::CouncilSnapshot;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

pub const STREAM_ENDPOINT: &str = "/api/conversations/{id}/message/stream";
pub const HEALTH_ENDPOINT: &str = "/api/health";
pub const COUNCILS_ENDPOINT: &str = "/api/councils";
pub const COUNCIL_ENDPOINT: &str = "/api/councils/{council_id}";
pub const LEADERBOARDS_ENDPOINT: &str = "/api/leaderboard";
pub const LEADERBOARD_ENDPOINT: &str = "/api/leaderboard/{council_id}";

/// Orchestrator over type-erased adapters, shared by all requests
pub type DeliberationService = RunDeliberationUseCase<dyn ModelBackend, dyn ToolInvoker>;

/// Opens the transcript logger for one conversation
pub type TranscriptFactory = Arc<dyn Fn(&str) -> Arc<dyn ConversationLogger> + Send + Sync>;

#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    service: DeliberationService,
    councils: BTreeMap<String, Arc<CouncilSnapshot>>,
    default_council: Option<String>,
    leaderboard: Arc<dyn LeaderboardSink>,
    transcripts: Option<TranscriptFactory>,
}

impl AppState {
    pub fn new(
        service: DeliberationService,
        councils: Vec<CouncilSnapshot>,
        leaderboard: Arc<dyn LeaderboardSink>,
    ) -> Self {
        let councils: BTreeMap<_, _> = councils
            .into_iter()
            .map(|council| (council.id().to_string(), Arc::new(council)))
            .collect();
        let default_council = councils.keys().next().cloned();
        Self {
            inner: Arc::new(AppStateInner {
                service,
                councils,
                default_council,
                leaderboard,
                transcripts: None,
            }),
        }
    }

    /// Council used when a request names none. Ignored if unknown.
    pub fn with_default_council(mut self, id: Option<&str>) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner)
            && let Some(id) = id
            && inner.councils.contains_key(id)
        {
            inner.default_council = Some(id.to_string());
        }
        self
    }

    pub fn with_transcripts(mut self, factory: TranscriptFactory) -> Self {
        if let Some(inner) = Arc::get_mut(&mut self.inner) {
            inner.transcripts = Some(factory);
        }
        self
    }

    pub(crate) fn council(&self, id: Option<&str>) -> Result<Arc<CouncilSnapshot>, CouncilError> {
        let id = match id {
            Some(id) => id,
            None => self
                .inner
                .default_council
                .as_deref()
                .ok_or(CouncilError::NoCouncil)?,
        };
        self.inner
            .councils
            .get(id)
            .cloned()
            .ok_or_else(|| CouncilError::UnknownCouncil(id.to_string()))
    }

    pub(crate) fn default_council(&self) -> Option<&CouncilSnapshot> {
        self.inner
            .default_council
            .as_deref()
            .and_then(|id| self.inner.councils.get(id))
            .map(Arc::as_ref)
    }

    pub(crate) fn council_ids(&self) -> Vec<&str> {
        self.inner.councils.keys().map(String::as_str).collect()
    }

    /// Configured councils in id order
    pub(crate) fn councils(&self) -> impl Iterator<Item = &Arc<CouncilSnapshot>> {
        self.inner.councils.values()
    }

    pub(crate) fn leaderboard(&self) -> &dyn LeaderboardSink {
        self.inner.leaderboard.as_ref()
    }

    /// The shared orchestrator, wired to this conversation's transcript
    pub(crate) fn service_for(&self, conversation_id: &str) -> DeliberationService {
        let logger = match &self.inner.transcripts {
            Some(factory) => factory(conversation_id),
            None => Arc::new(NoConversationLogger),
        };
        self.inner.service.clone().with_conversation_logger(logger)
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route(STREAM_ENDPOINT, post(routes::stream_message))
        .route(HEALTH_ENDPOINT, get(routes::health))
        .route(COUNCILS_ENDPOINT, get(routes::councils))
        .route(COUNCIL_ENDPOINT, get(routes::council))
        .route(LEADERBOARDS_ENDPOINT, get(routes::leaderboards))
        .route(LEADERBOARD_ENDPOINT, get(routes::leaderboard))
        .with_state(state)
}

/// Serve until `shutdown` is cancelled
pub async fn serve(
    state: AppState,
    bind: &str,
    shutdown: CancellationToken,
) -> std::io::Result<()> {
    let listener = TcpListener::bind(bind).await?;
    info!("Council API listening on {}", listener.local_addr()?);
    axum::serve(listener, router(state))
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await
}

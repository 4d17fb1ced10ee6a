//! Request handlers

use super::{AppState, CouncilError};
use axum::Json;
use axum::extract::{Path, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use council_application::RunDeliberationInput;
use council_domain::{
    CouncilSnapshot, DeliberationEvent, ExecutionMode, PanelSelection, Query, Standing, Turn,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::collections::BTreeMap;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Deserialize)]
pub struct MessageRequest {
    pub content: String,
    #[serde(default)]
    pub council_id: Option<String>,
    /// Seats this panel instead of routing
    #[serde(default)]
    pub panel: Option<Vec<PanelSelection>>,
    #[serde(default)]
    pub force_direct: bool,
    #[serde(default)]
    pub mode: Option<ExecutionMode>,
    #[serde(default)]
    pub history: Vec<Turn>,
}

#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub model: String,
    pub wins: u64,
    pub participations: u64,
    pub win_rate: f64,
    pub avg_score: f64,
    pub avg_position: f64,
}

impl From<&Standing> for LeaderboardEntry {
    fn from(standing: &Standing) -> Self {
        Self {
            model: standing.model.to_string(),
            wins: standing.wins,
            participations: standing.participations,
            win_rate: round_to(standing.win_rate(), 1),
            avg_score: round_to(standing.avg_score(), 2),
            avg_position: round_to(standing.avg_position(), 2),
        }
    }
}

/// One line of `GET /api/councils`
#[derive(Debug, Serialize)]
pub struct CouncilSummary {
    pub id: String,
    pub name: String,
    pub chairman: String,
    pub advisors: Vec<AdvisorSummary>,
    pub rubric: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct AdvisorSummary {
    pub id: String,
    pub name: String,
    pub role: String,
}

impl From<&CouncilSnapshot> for CouncilSummary {
    fn from(council: &CouncilSnapshot) -> Self {
        Self {
            id: council.id().to_string(),
            name: council.name().to_string(),
            chairman: council.chairman().to_string(),
            advisors: council
                .advisors()
                .iter()
                .map(|advisor| AdvisorSummary {
                    id: advisor.id.clone(),
                    name: advisor.name.clone(),
                    role: advisor.role.clone(),
                })
                .collect(),
            rubric: council.rubric().names().map(str::to_string).collect(),
        }
    }
}

fn round_to(value: f64, places: i32) -> f64 {
    let factor = 10f64.powi(places);
    (value * factor).round() / factor
}

pub(super) async fn stream_message(
    State(state): State<AppState>,
    Path(conversation_id): Path<String>,
    Json(request): Json<MessageRequest>,
) -> Result<Response, CouncilError> {
    let council = state.council(request.council_id.as_deref())?;
    let query = Query::try_new(request.content)?.with_history(request.history);

    let mut input = RunDeliberationInput::new(conversation_id.as_str(), query, council)
        .with_force_direct(request.force_direct);
    if let Some(panel) = request.panel {
        input = input.with_panel_override(panel);
    }
    if let Some(mode) = request.mode {
        input = input.with_mode(mode);
    }

    info!(
        "Conversation {}: starting run on council {}",
        conversation_id,
        input.council.id()
    );
    let service = state.service_for(&conversation_id);
    let (tx, rx) = mpsc::channel(service.config().event_buffer.max(1));
    let cancel = CancellationToken::new();
    // Dropped together with the response stream when the client disconnects.
    let disconnect = cancel.clone().drop_guard();

    tokio::spawn(async move {
        match service.execute(input, tx, cancel).await {
            Ok(outcome) => debug!("Conversation {} finished", outcome.conversation_id),
            Err(e) if e.is_cancelled() => info!("Conversation {} cancelled", conversation_id),
            Err(e) => warn!("Conversation {} failed: {}", conversation_id, e),
        }
    });

    let stream = ReceiverStream::new(rx).map(move |event| {
        let _held = &disconnect;
        Ok::<Event, Infallible>(sse_event(&event))
    });
    Ok(Sse::new(stream)
        .keep_alive(KeepAlive::default())
        .into_response())
}

fn sse_event(event: &DeliberationEvent) -> Event {
    match serde_json::to_string(event) {
        Ok(data) => Event::default().data(data),
        Err(e) => {
            warn!("Could not serialize {} event: {}", event.event_type(), e);
            Event::default().data(
                json!({"type": "error", "message": format!("unserializable event: {}", e)})
                    .to_string(),
            )
        }
    }
}

pub(super) async fn health(State(state): State<AppState>) -> Json<Value> {
    let chairman = state
        .default_council()
        .map(|council| council.chairman().to_string());
    Json(json!({
        "status": "ok",
        "councils": state.council_ids(),
        "chairman": chairman,
    }))
}

pub(super) async fn councils(State(state): State<AppState>) -> Json<Vec<CouncilSummary>> {
    Json(
        state
            .councils()
            .map(|council| CouncilSummary::from(council.as_ref()))
            .collect(),
    )
}

pub(super) async fn council(
    State(state): State<AppState>,
    Path(council_id): Path<String>,
) -> Result<Json<CouncilSnapshot>, CouncilError> {
    let council = state.council(Some(&council_id))?;
    Ok(Json(council.as_ref().clone()))
}

pub(super) async fn leaderboard(
    State(state): State<AppState>,
    Path(council_id): Path<String>,
) -> Result<Json<Vec<LeaderboardEntry>>, CouncilError> {
    let standings = state.leaderboard().standings(&council_id).await?;
    Ok(Json(standings.iter().map(LeaderboardEntry::from).collect()))
}

/// Standings of every configured council, keyed by council id
pub(super) async fn leaderboards(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<String, Vec<LeaderboardEntry>>>, CouncilError> {
    let mut boards = BTreeMap::new();
    for council_id in state.council_ids() {
        let standings = state.leaderboard().standings(council_id).await?;
        boards.insert(
            council_id.to_string(),
            standings.iter().map(LeaderboardEntry::from).collect(),
        );
    }
    Ok(Json(boards))
}

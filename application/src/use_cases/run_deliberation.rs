//! Run deliberation use case
//!
//! Drives one query through the council state machine:
//!
//! ```text
//! MEMORY_CHECK -> CLASSIFY -> { DIRECT | TOOL_CHECK -> (ROUTE -> PANEL_AWAIT? ->
//!   STAGE1 -> STAGE2 -> STAGE3) } -> USAGE_FINALIZE -> DONE
//! ```
//!
//! Every observable step is sent to the caller as a [`DeliberationEvent`].
//! Member failures stay local to their stage; only the classifier transport
//! and the single synthesizer call surface as `error` events, and `done` is
//! still sent afterwards. Cancellation (token or dropped receiver) aborts the
//! active stage and ends the run without `done`.

use super::classify::ClassifyQueryUseCase;
use super::event_emitter::{ClientGone, EventEmitter};
use super::intercept_tool::InterceptToolUseCase;
use super::route_panel::RoutePanelUseCase;
use super::stage_executor::{StageCall, StageCancelled, StageExecutor, StageOutcome};
use crate::config::DeliberationConfig;
use crate::ports::conversation_logger::{ConversationLogger, NoConversationLogger};
use crate::ports::leaderboard::{LeaderboardSink, NoLeaderboard};
use crate::ports::memory_lookup::{MemoryLookup, NoMemory};
use crate::ports::model_backend::ModelBackend;
use crate::ports::panel_confirmation::{AutoAcceptPanel, PanelConfirmation, PanelDecision};
use crate::ports::tool_invoker::ToolInvoker;
use council_domain::deliberation::classification::{is_pure_calculation, tool_keyword_hint};
use council_domain::deliberation::stage_result::CHAIRMAN_ID;
use council_domain::ranking::{Conflict, parse_ranking_entry};
use council_domain::session::entities::build_messages;
use council_domain::{
    AggregateRanking, Classification, CouncilSnapshot, DeliberationEvent, DomainError,
    ExecutionMode, LeaderboardRecord, Model, Panel, PanelMember, PanelSelection, PromptTemplate,
    Query, RankingAggregator, ResponseLabels, RunPhase, RunState, Stage, StageResult,
    SynthesisContext, ToolInventory, Usage,
};
use std::future::Future;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Bytes of each prior turn included in the synthesis prompt
const SYNTHESIS_HISTORY_BYTES: usize = 1000;

/// Errors that end a run without a `done` event
#[derive(Error, Debug)]
pub enum RunError {
    #[error("Run cancelled")]
    Cancelled,

    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl RunError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, RunError::Cancelled)
    }
}

impl From<ClientGone> for RunError {
    fn from(_: ClientGone) -> Self {
        RunError::Cancelled
    }
}

impl From<StageCancelled> for RunError {
    fn from(_: StageCancelled) -> Self {
        RunError::Cancelled
    }
}

/// Input for the RunDeliberation use case
#[derive(Debug, Clone)]
pub struct RunDeliberationInput {
    pub conversation_id: String,
    pub query: Query,
    /// Immutable for the length of the run
    pub council: Arc<CouncilSnapshot>,
    /// Seats this panel instead of asking the router
    pub panel_override: Option<Vec<PanelSelection>>,
    /// Skip classification and answer directly
    pub force_direct: bool,
    /// Falls back to the configured default mode
    pub mode: Option<ExecutionMode>,
}

impl RunDeliberationInput {
    pub fn new(
        conversation_id: impl Into<String>,
        query: Query,
        council: Arc<CouncilSnapshot>,
    ) -> Self {
        Self {
            conversation_id: conversation_id.into(),
            query,
            council,
            panel_override: None,
            force_direct: false,
            mode: None,
        }
    }

    pub fn with_panel_override(mut self, selections: Vec<PanelSelection>) -> Self {
        self.panel_override = Some(selections);
        self
    }

    pub fn with_force_direct(mut self, force_direct: bool) -> Self {
        self.force_direct = force_direct;
        self
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = Some(mode);
        self
    }
}

/// Final state of a finished run, for persistence by the caller
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub conversation_id: String,
    pub state: RunState,
}

impl RunOutcome {
    pub fn response(&self) -> Option<&str> {
        self.state.final_response.as_deref()
    }
}

/// Use case for running a council deliberation
pub struct RunDeliberationUseCase<B, T>
where
    B: ModelBackend + ?Sized + 'static,
    T: ToolInvoker + ?Sized + 'static,
{
    backend: Arc<B>,
    tools: Arc<T>,
    memory: Arc<dyn MemoryLookup>,
    leaderboard: Arc<dyn LeaderboardSink>,
    panel_confirmation: Arc<dyn PanelConfirmation>,
    logger: Arc<dyn ConversationLogger>,
    config: DeliberationConfig,
}

impl<B, T> Clone for RunDeliberationUseCase<B, T>
where
    B: ModelBackend + ?Sized + 'static,
    T: ToolInvoker + ?Sized + 'static,
{
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            tools: Arc::clone(&self.tools),
            memory: Arc::clone(&self.memory),
            leaderboard: Arc::clone(&self.leaderboard),
            panel_confirmation: Arc::clone(&self.panel_confirmation),
            logger: Arc::clone(&self.logger),
            config: self.config.clone(),
        }
    }
}

impl<B, T> RunDeliberationUseCase<B, T>
where
    B: ModelBackend + ?Sized + 'static,
    T: ToolInvoker + ?Sized + 'static,
{
    pub fn new(backend: Arc<B>, tools: Arc<T>, config: DeliberationConfig) -> Self {
        Self {
            backend,
            tools,
            memory: Arc::new(NoMemory),
            leaderboard: Arc::new(NoLeaderboard),
            panel_confirmation: Arc::new(AutoAcceptPanel),
            logger: Arc::new(NoConversationLogger),
            config,
        }
    }

    pub fn with_memory(mut self, memory: Arc<dyn MemoryLookup>) -> Self {
        self.memory = memory;
        self
    }

    pub fn with_leaderboard(mut self, leaderboard: Arc<dyn LeaderboardSink>) -> Self {
        self.leaderboard = leaderboard;
        self
    }

    pub fn with_panel_confirmation(mut self, confirmation: Arc<dyn PanelConfirmation>) -> Self {
        self.panel_confirmation = confirmation;
        self
    }

    pub fn with_conversation_logger(mut self, logger: Arc<dyn ConversationLogger>) -> Self {
        self.logger = logger;
        self
    }

    pub fn config(&self) -> &DeliberationConfig {
        &self.config
    }

    /// Run the state machine to completion, streaming events into `events`.
    pub async fn execute(
        &self,
        input: RunDeliberationInput,
        events: mpsc::Sender<DeliberationEvent>,
        cancel: CancellationToken,
    ) -> Result<RunOutcome, RunError> {
        let emitter = EventEmitter::new(events, Arc::clone(&self.logger), cancel);
        let mut state = RunState::new();
        info!(
            "Starting deliberation {} on council {}",
            input.conversation_id,
            input.council.id()
        );

        let driven = match self.drive(&input, &emitter, &mut state).await {
            Ok(()) => self.finalize(&emitter, &mut state).await,
            Err(e) => Err(e),
        };
        if let Err(e) = driven {
            warn!("Deliberation {} ended early: {}", input.conversation_id, e);
            let _ = state.transition(RunPhase::Error);
            return Err(e);
        }

        self.record_leaderboard(&input, &state).await;
        self.record_memory(&input, &state).await;
        info!("Deliberation {} done", input.conversation_id);
        Ok(RunOutcome {
            conversation_id: input.conversation_id,
            state,
        })
    }

    /// Every phase up to and including the transition into USAGE_FINALIZE
    async fn drive(
        &self,
        input: &RunDeliberationInput,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        let query = &input.query;
        let council = input.council.as_ref();
        // Both gates are fixed before classification starts.
        let force_direct = input.force_direct;
        let auto_accept_panel = self.config.auto_accept_panel;
        let mode = input.mode.unwrap_or(self.config.default_mode);

        // ==================== MEMORY_CHECK ====================
        if self.check_memory(query, emitter, state).await? {
            return Ok(state.transition(RunPhase::UsageFinalize)?);
        }

        let inventory = self.load_inventory(emitter).await?;
        let tools_available = !inventory.is_empty();

        // ==================== CLASSIFY ====================
        let classification = if force_direct {
            info!("Direct answer forced, skipping classification");
            Classification::forced_direct()
                .with_requires_tool(tools_available && tool_keyword_hint(query.content()))
        } else {
            state.transition(RunPhase::Classify)?;
            let classifier = ClassifyQueryUseCase::new(
                Arc::clone(&self.backend),
                self.config.lookup_timeout,
                self.config.history_turns,
            );
            let outcome = cancellable(
                emitter,
                classifier.execute(query, council.classifier_model(), tools_available),
            )
            .await?;
            self.record_usage(
                emitter,
                state,
                Stage::Classification,
                council.classifier_model(),
                outcome.usage,
            )
            .await?;
            if let Some(message) = outcome.escalation {
                emitter.emit(DeliberationEvent::error(message)).await?;
            }
            outcome.classification
        };
        emitter
            .emit(DeliberationEvent::classification_complete(&classification))
            .await?;
        state.classification = Some(classification.clone());

        // ==================== TOOL_CHECK ====================
        if classification.requires_tool && tools_available {
            state.transition(RunPhase::ToolCheck)?;
            let selector = self
                .config
                .tool_selector
                .clone()
                .unwrap_or_else(|| council.classifier_model().clone());
            let interceptor = InterceptToolUseCase::new(
                Arc::clone(&self.backend),
                Arc::clone(&self.tools),
                self.config.lookup_timeout,
            );
            let checked = cancellable(
                emitter,
                interceptor.execute(query, &selector, &inventory, emitter),
            )
            .await??;
            self.record_usage(emitter, state, Stage::Tool, &selector, checked.usage)
                .await?;
            state.tool_outcome = checked.outcome;
        }

        let pure_calculation =
            state.tool_outcome.is_some() && is_pure_calculation(query.content());
        if classification.query_type.is_direct() || pure_calculation {
            return self.answer_directly(input, emitter, state).await;
        }

        // ==================== ROUTE ====================
        state.transition(RunPhase::Route)?;
        let panel = match &input.panel_override {
            Some(selections) => match Panel::resolve(selections, council) {
                Ok(panel) => {
                    info!("Using caller-provided panel of {}", panel.len());
                    emitter
                        .emit(DeliberationEvent::routing_complete(&panel, false))
                        .await?;
                    panel
                }
                Err(e) => {
                    warn!("Panel override rejected: {}", e);
                    emitter
                        .emit(DeliberationEvent::error(format!("Invalid panel: {}", e)))
                        .await?;
                    return Ok(state.transition(RunPhase::UsageFinalize)?);
                }
            },
            None => {
                let router =
                    RoutePanelUseCase::new(Arc::clone(&self.backend), self.config.lookup_timeout);
                let routed = cancellable(emitter, router.execute(query, council)).await?;
                self.record_usage(
                    emitter,
                    state,
                    Stage::Routing,
                    council.classifier_model(),
                    routed.usage,
                )
                .await?;
                emitter
                    .emit(DeliberationEvent::routing_complete(&routed.panel, routed.fallback))
                    .await?;
                routed.panel
            }
        };

        // ==================== PANEL_AWAIT ====================
        let panel = if auto_accept_panel {
            panel
        } else {
            state.transition(RunPhase::PanelAwait)?;
            let decision = cancellable(emitter, self.panel_confirmation.confirm(&panel)).await?;
            let confirmed = match decision {
                PanelDecision::Accept => Ok(panel),
                PanelDecision::Edit(selections) => Panel::resolve(&selections, council)
                    .map_err(|e| format!("Invalid panel: {}", e)),
                PanelDecision::Reject(reason) => Err(format!("Panel rejected: {}", reason)),
            };
            match confirmed {
                Ok(panel) => {
                    emitter
                        .emit(DeliberationEvent::panel_confirmed(&panel))
                        .await?;
                    panel
                }
                Err(message) => {
                    warn!("{}", message);
                    emitter.emit(DeliberationEvent::error(message)).await?;
                    return Ok(state.transition(RunPhase::UsageFinalize)?);
                }
            }
        };
        state.panel = Some(panel.clone());

        // ==================== STAGE 1 ====================
        self.run_stage1(input, &panel, emitter, state).await?;
        let completed: Vec<String> = state
            .completed_stage1()
            .map(|r| r.member_id.clone())
            .collect();
        if completed.is_empty() {
            emitter
                .emit(DeliberationEvent::error("No models responded in stage 1"))
                .await?;
            return Ok(state.transition(RunPhase::UsageFinalize)?);
        }
        if !mode.runs_stage2() {
            let first = state.completed_stage1().next().map(|r| r.text.clone());
            state.final_response = first;
            return Ok(state.transition(RunPhase::UsageFinalize)?);
        }

        // ==================== STAGE 2 ====================
        if completed.len() < 2 {
            info!("Only {} answered, skipping peer ranking", completed[0]);
            let ranking = AggregateRanking::uncontested(completed[0].clone());
            emitter.emit(DeliberationEvent::analysis(&ranking)).await?;
            state.ranking = Some(ranking);
        } else {
            state.transition(RunPhase::Stage2)?;
            self.run_stage2(input, &panel, &completed, emitter, state)
                .await?;
        }
        if !mode.runs_stage3() {
            let winning = state
                .ranking
                .as_ref()
                .and_then(|r| r.winner.as_deref())
                .and_then(|winner| state.stage1_answer(winner))
                .map(str::to_string);
            state.final_response = winning;
            return Ok(state.transition(RunPhase::UsageFinalize)?);
        }

        // ==================== STAGE 3 ====================
        state.transition(RunPhase::Stage3)?;
        self.run_stage3(input, &panel, emitter, state).await?;
        Ok(state.transition(RunPhase::UsageFinalize)?)
    }

    /// Returns true when a confident memory answered the query
    async fn check_memory(
        &self,
        query: &Query,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<bool, RunError> {
        let lookup = tokio::time::timeout(
            self.config.lookup_timeout,
            self.memory.search(query.content()),
        );
        let facts = match cancellable(emitter, lookup).await? {
            Ok(Ok(facts)) => facts,
            Ok(Err(e)) => {
                warn!("Memory lookup failed: {}", e);
                return Ok(false);
            }
            Err(_) => {
                warn!("Memory lookup timed out");
                return Ok(false);
            }
        };

        let Some(hit) = self.config.memory.best_match(&facts) else {
            debug!("No confident memory among {} fact(s)", facts.len());
            return Ok(false);
        };
        info!("Answering from memory (confidence {:.2})", hit.confidence);
        emitter.emit(DeliberationEvent::memory_hit(&hit)).await?;
        state.final_response = Some(PromptTemplate::memory_answer(&hit.fact));
        state.memory_hit = Some(hit);
        Ok(true)
    }

    async fn load_inventory(&self, emitter: &EventEmitter) -> Result<ToolInventory, RunError> {
        let listed =
            cancellable(emitter, tokio::time::timeout(self.config.lookup_timeout, self.tools.inventory()))
                .await?;
        Ok(match listed {
            Ok(Ok(inventory)) => inventory,
            Ok(Err(e)) => {
                warn!("Tool inventory unavailable: {}", e);
                ToolInventory::default()
            }
            Err(_) => {
                warn!("Tool inventory timed out");
                ToolInventory::default()
            }
        })
    }

    // ==================== DIRECT ====================

    /// Chairman answers alone. The answer lands in `final_response` only;
    /// the stage slots stay empty.

    async fn answer_directly(
        &self,
        input: &RunDeliberationInput,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        state.transition(RunPhase::Direct)?;
        emitter.emit(DeliberationEvent::direct_start()).await?;

        let chairman = input.council.chairman().clone();
        let tool_context = state.tool_outcome.as_ref().map(|t| t.prompt_context());
        let prompt = PromptTemplate::direct(input.query.content(), tool_context.as_deref());
        let messages = build_messages(
            None,
            input.query.recent_history(self.config.history_turns),
            &prompt,
        );
        let call = StageCall::new(CHAIRMAN_ID, chairman.clone(), "chairman", messages);

        let outcome = self
            .executor()
            .run(
                Stage::Direct,
                vec![call],
                emitter,
                &mut state.usage,
                DeliberationEvent::stage3_result,
            )
            .await?;
        let result = self
            .single_result(outcome, &chairman, "Direct answer", emitter)
            .await?;
        state.final_response = result.is_complete().then_some(result.text);
        Ok(state.transition(RunPhase::UsageFinalize)?)
    }

    // ==================== STAGES ====================

    async fn run_stage1(
        &self,
        input: &RunDeliberationInput,
        panel: &Panel,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        state.transition(RunPhase::Stage1)?;
        let tool_context = state.tool_outcome.as_ref().map(|t| t.prompt_context());
        let prompt = PromptTemplate::initial_query(input.query.content(), tool_context.as_deref());
        let history = input.query.recent_history(self.config.history_turns);

        let calls = panel
            .members()
            .iter()
            .map(|member| {
                StageCall::new(
                    member.member_id(),
                    member.model.clone(),
                    member.role.clone(),
                    build_messages(Some(&member.system_prompt), history, &prompt),
                )
            })
            .collect();

        let outcome = self
            .executor()
            .run(
                Stage::Stage1,
                calls,
                emitter,
                &mut state.usage,
                DeliberationEvent::stage1_result,
            )
            .await?;
        emitter
            .emit(DeliberationEvent::stage_complete(
                Stage::Stage1,
                outcome.results.clone(),
            ))
            .await?;
        state.stage1 = outcome.results;
        Ok(())
    }

    async fn run_stage2(
        &self,
        input: &RunDeliberationInput,
        panel: &Panel,
        completed: &[String],
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        let rubric = input.council.rubric();
        let labels = ResponseLabels::assign(completed.iter());

        let calls = completed
            .iter()
            .filter_map(|rater| panel.member(rater))
            .map(|member| {
                let peers: Vec<(char, &str)> = labels
                    .peers_of(member.member_id())
                    .filter_map(|(letter, peer)| state.stage1_answer(peer).map(|text| (letter, text)))
                    .collect();
                let prompt = PromptTemplate::ranking(input.query.content(), &peers, rubric);
                StageCall::new(
                    member.member_id(),
                    member.model.clone(),
                    member.role.clone(),
                    build_messages(Some(&member.system_prompt), &[], &prompt),
                )
            })
            .collect();

        let outcome = self
            .executor()
            .run(Stage::Stage2, calls, emitter, &mut state.usage, |result: &StageResult| {
                let parsed = if result.is_complete() {
                    parse_ranking_entry(&result.member_id, &result.text, &labels, rubric)
                        .ordered_peers()
                        .into_iter()
                        .map(str::to_string)
                        .collect()
                } else {
                    Vec::new()
                };
                DeliberationEvent::stage2_result(result, parsed)
            })
            .await?;

        let entries: Vec<_> = outcome
            .completed()
            .map(|r| parse_ranking_entry(&r.member_id, &r.text, &labels, rubric))
            .collect();
        let ranking = RankingAggregator::aggregate(&entries, completed, rubric);
        info!(
            "Peer ranking winner: {}",
            ranking.winner.as_deref().unwrap_or("none")
        );

        emitter
            .emit(DeliberationEvent::stage_complete(
                Stage::Stage2,
                outcome.results.clone(),
            ))
            .await?;
        emitter.emit(DeliberationEvent::analysis(&ranking)).await?;
        state.stage2 = outcome.results;
        state.ranking = Some(ranking);
        Ok(())
    }

    async fn run_stage3(
        &self,
        input: &RunDeliberationInput,
        panel: &Panel,
        emitter: &EventEmitter,
        state: &mut RunState,
    ) -> Result<(), RunError> {
        let history = input
            .query
            .history_excerpt(self.config.history_turns, SYNTHESIS_HISTORY_BYTES);
        let tool_context = state.tool_outcome.as_ref().map(|t| t.prompt_context());
        let prompt = {
            let ctx = synthesis_context(
                input.query.content(),
                &history,
                tool_context.as_deref(),
                panel,
                state,
            );
            PromptTemplate::synthesis(&ctx)
        };
        let call = StageCall::new(
            CHAIRMAN_ID,
            input.council.chairman().clone(),
            "chairman",
            build_messages(None, &[], &prompt),
        );

        let outcome = self
            .executor()
            .run(
                Stage::Stage3,
                vec![call],
                emitter,
                &mut state.usage,
                DeliberationEvent::stage3_result,
            )
            .await?;
        let result = self
            .single_result(outcome, input.council.chairman(), "Synthesis", emitter)
            .await?;
        state.final_response = result.is_complete().then(|| result.text.clone());
        state.stage3 = Some(result);
        Ok(())
    }

    /// Take the chairman's result, escalating a failure to an `error` event
    async fn single_result(
        &self,
        outcome: StageOutcome,
        chairman: &Model,
        what: &str,
        emitter: &EventEmitter,
    ) -> Result<StageResult, RunError> {
        let result = outcome.results.into_iter().next().unwrap_or_else(|| {
            let mut missing = StageResult::for_chairman(chairman.clone());
            let _ = missing.fail("no result");
            missing
        });
        if let Some(error) = result.error.as_deref() {
            emitter
                .emit(DeliberationEvent::error(format!("{} failed: {}", what, error)))
                .await?;
        }
        Ok(result)
    }

    fn executor(&self) -> StageExecutor<B> {
        StageExecutor::new(
            Arc::clone(&self.backend),
            self.config.call_timeout,
            self.config.max_refusal_retries,
        )
    }

    // ==================== USAGE ====================

    async fn record_usage(
        &self,
        emitter: &EventEmitter,
        state: &mut RunState,
        stage: Stage,
        model: &Model,
        usage: Option<Usage>,
    ) -> Result<(), RunError> {
        let Some(usage) = usage else {
            return Ok(());
        };
        state.usage.record(stage, model, None, usage);
        emitter
            .emit(DeliberationEvent::usage_update(
                stage,
                state.usage.stage_summary(stage),
                state.usage.total(),
            ))
            .await?;
        Ok(())
    }

    // ==================== USAGE_FINALIZE / DONE ====================

    async fn finalize(&self, emitter: &EventEmitter, state: &mut RunState) -> Result<(), RunError> {
        let breakdown = state.usage.breakdown();
        info!(
            "Run used {} tokens over {} call(s)",
            breakdown.total.usage.total_tokens, breakdown.total.calls
        );
        emitter
            .emit(DeliberationEvent::done(breakdown, state.final_response.clone()))
            .await?;
        state.transition(RunPhase::Done)?;
        Ok(())
    }

    async fn record_leaderboard(&self, input: &RunDeliberationInput, state: &RunState) {
        if state.stage2.is_empty() {
            return;
        }
        let (Some(ranking), Some(panel)) = (&state.ranking, &state.panel) else {
            return;
        };
        let record = LeaderboardRecord::from_ranking(input.council.id(), ranking, panel);
        if let Err(e) = self.leaderboard.record(&record).await {
            warn!("Failed to record leaderboard: {}", e);
        }
    }

    /// Write the answer back so later runs can take the memory fast path
    async fn record_memory(&self, input: &RunDeliberationInput, state: &RunState) {
        if state.memory_hit.is_some() {
            return;
        }
        let Some(response) = state.final_response.as_deref() else {
            return;
        };
        let write = tokio::time::timeout(
            self.config.lookup_timeout,
            self.memory.record(input.query.content(), response),
        );
        match write.await {
            Ok(Ok(())) => debug!("Recorded answer to memory"),
            Ok(Err(e)) => warn!("Failed to record memory: {}", e),
            Err(_) => warn!("Memory write-back timed out"),
        }
    }
}

/// Race a future against the run's cancellation token
async fn cancellable<F: Future>(emitter: &EventEmitter, future: F) -> Result<F::Output, RunError> {
    tokio::select! {
        biased;
        _ = emitter.cancel_token().cancelled() => Err(RunError::Cancelled),
        output = future => Ok(output),
    }
}

fn heading(member: &PanelMember) -> String {
    if member.role.is_empty() {
        member.name.clone()
    } else {
        format!("{} ({})", member.name, member.role)
    }
}

fn synthesis_context<'a>(
    question: &'a str,
    history: &'a str,
    tool_context: Option<&'a str>,
    panel: &Panel,
    state: &RunState,
) -> SynthesisContext<'a> {
    let heading_of = |member_id: &str| {
        panel
            .member(member_id)
            .map(heading)
            .unwrap_or_else(|| member_id.to_string())
    };

    // Best-ranked answers first
    let mut answered: Vec<&StageResult> = state.completed_stage1().collect();
    if let Some(ranking) = &state.ranking {
        answered.sort_by_key(|r| {
            ranking
                .member(&r.member_id)
                .map(|m| m.rank)
                .unwrap_or(usize::MAX)
        });
    }

    let mut analysis = Vec::new();
    if let Some(ranking) = &state.ranking {
        for conflict in &ranking.conflicts {
            match conflict {
                Conflict::PositionSpread { description, .. }
                | Conflict::MutualOpposition { description, .. } => {
                    analysis.push(description.clone())
                }
            }
        }
        analysis.extend(ranking.minority_opinions.iter().map(|m| m.description.clone()));
    }

    SynthesisContext {
        question,
        history,
        responses: answered
            .iter()
            .map(|r| (heading_of(&r.member_id), r.text.clone()))
            .collect(),
        reviews: state
            .stage2
            .iter()
            .filter(|r| r.is_complete())
            .map(|r| (heading_of(&r.member_id), r.text.clone()))
            .collect(),
        standings: state
            .ranking
            .iter()
            .flat_map(|ranking| ranking.ranking.iter())
            .filter(|m| m.raters > 0)
            .map(|m| (heading_of(&m.member_id), m.mean_score))
            .collect(),
        failed: state
            .stage1
            .iter()
            .filter(|r| !r.is_complete())
            .map(|r| heading_of(&r.member_id))
            .collect(),
        analysis,
        tool_context,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::model_backend::BackendError;
    use crate::ports::tool_invoker::NoTools;
    use crate::testing::{
        RecordingLeaderboard, RecordingMemory, Script, ScriptedBackend, StaticMemory, StaticTools,
        council,
    };
    use async_trait::async_trait;
    use council_domain::{MemoryFact, Message, ToolDescriptor, ToolResponse, parse_panel_override};
    use std::time::Duration;

    type UseCase = RunDeliberationUseCase<ScriptedBackend, dyn ToolInvoker>;

    struct Harness {
        backend: Arc<ScriptedBackend>,
        leaderboard: Arc<RecordingLeaderboard>,
        memory: Arc<RecordingMemory>,
        use_case: UseCase,
    }

    fn harness(backend: ScriptedBackend) -> Harness {
        harness_with(backend, Arc::new(NoTools), DeliberationConfig::default())
    }

    fn harness_with(
        backend: ScriptedBackend,
        tools: Arc<dyn ToolInvoker>,
        config: DeliberationConfig,
    ) -> Harness {
        let backend = Arc::new(backend);
        let leaderboard = Arc::new(RecordingLeaderboard::default());
        let memory = Arc::new(RecordingMemory::default());
        let use_case = RunDeliberationUseCase::new(Arc::clone(&backend), tools, config)
            .with_leaderboard(leaderboard.clone())
            .with_memory(memory.clone());
        Harness {
            backend,
            leaderboard,
            memory,
            use_case,
        }
    }

    fn input(text: &str, council: CouncilSnapshot) -> RunDeliberationInput {
        RunDeliberationInput::new("conv-1", Query::try_new(text).unwrap(), Arc::new(council))
    }

    async fn run(
        use_case: &UseCase,
        input: RunDeliberationInput,
    ) -> (Result<RunOutcome, RunError>, Vec<DeliberationEvent>) {
        let (tx, mut rx) = mpsc::channel(4096);
        let result = use_case.execute(input, tx, CancellationToken::new()).await;
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        (result, events)
    }

    /// Event types without streaming deltas
    fn types(events: &[DeliberationEvent]) -> Vec<&'static str> {
        events
            .iter()
            .filter(|e| !e.is_delta())
            .map(DeliberationEvent::event_type)
            .collect()
    }

    fn count(events: &[DeliberationEvent], event_type: &str) -> usize {
        events.iter().filter(|e| e.event_type() == event_type).count()
    }

    fn error_messages(events: &[DeliberationEvent]) -> Vec<String> {
        events
            .iter()
            .filter_map(|e| match e {
                DeliberationEvent::Error { message } => Some(message.clone()),
                _ => None,
            })
            .collect()
    }

    fn calls_to(backend: &ScriptedBackend, model: &str) -> Vec<Vec<Message>> {
        backend
            .calls()
            .into_iter()
            .filter(|(m, _)| m.as_str() == model)
            .map(|(_, messages)| messages)
            .collect()
    }

    fn last_prompt(messages: &[Message]) -> &str {
        &messages.last().unwrap().content
    }

    fn classify(label: &str, requires_tool: bool) -> Script {
        Script::text(&format!(
            r#"{{"type": "{}", "requires_tool": {}, "reasoning": "test"}}"#,
            label, requires_tool
        ))
    }

    fn ranks(order: &[char]) -> Script {
        let mut text = String::from("Solid answers overall.\n\nFINAL RANKING:\n");
        for (index, letter) in order.iter().enumerate() {
            text.push_str(&format!("{}. Response {}\n", index + 1, letter));
        }
        Script::text(&text)
    }

    fn refused() -> Script {
        Script::Fail(BackendError::Connection("connection refused".to_string()))
    }

    #[tokio::test]
    async fn factual_query_is_answered_directly() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("factual", false))
                .script("chair", Script::text("Paris.")),
        );

        let (result, events) = run(&h.use_case, input("What is the capital of France?", council(3, 3))).await;
        let outcome = result.unwrap();

        assert_eq!(
            types(&events),
            vec![
                "usage_update",
                "classification_complete",
                "direct_start",
                "stage3_complete",
                "usage_update",
                "done"
            ]
        );
        // A direct answer never occupies a stage slot.
        assert!(outcome.state.stage1.is_empty());
        assert!(outcome.state.stage2.is_empty());
        assert!(outcome.state.stage3.is_none());
        assert!(outcome.state.panel.is_none());
        assert_eq!(outcome.response(), Some("Paris."));
        assert_eq!(outcome.state.phase(), RunPhase::Done);
        assert_eq!(h.backend.call_count(), 2);
        assert!(h.leaderboard.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn finished_answer_is_written_back_to_memory() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("factual", false))
                .script("chair", Script::text("Paris.")),
        );

        let (result, _) = run(&h.use_case, input("What is the capital of France?", council(3, 3))).await;
        result.unwrap();

        assert_eq!(
            *h.memory.recorded.lock().unwrap(),
            vec![("What is the capital of France?".to_string(), "Paris.".to_string())]
        );
    }

    #[tokio::test]
    async fn memory_answers_are_not_written_back() {
        let h = harness(ScriptedBackend::new());
        let memory = Arc::new(RecordingMemory::with_facts(vec![MemoryFact::new(
            "The office closes at 6pm.",
            1.0,
            0.95,
        )]));
        let use_case = h.use_case.clone().with_memory(memory.clone());

        let (result, _) = run(&use_case, input("When does the office close?", council(3, 3))).await;
        assert!(result.unwrap().state.memory_hit.is_some());
        assert!(memory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn calculation_uses_the_calculator_and_answers_directly() {
        let inventory = ToolInventory::new(vec![ToolDescriptor::new(
            "calculator",
            "evaluate",
            "Evaluate an arithmetic expression",
        )]);
        let tools = StaticTools::new(inventory)
            .respond(Ok(ToolResponse::ok(serde_json::json!({"result": 4}))));
        let h = harness_with(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", true))
                .script(
                    "chair",
                    Script::text(
                        r#"{"server": "calculator", "tool": "evaluate", "arguments": {"expression": "2+2"}}"#,
                    ),
                )
                .script("chair", Script::text("2+2 = 4")),
            Arc::new(tools),
            DeliberationConfig::default(),
        );

        let (result, events) = run(&h.use_case, input("What is 2+2?", council(3, 3))).await;
        let outcome = result.unwrap();

        let types = types(&events);
        let start = types.iter().position(|t| *t == "tool_call_start").unwrap();
        let complete = types.iter().position(|t| *t == "tool_call_complete").unwrap();
        let direct = types.iter().position(|t| *t == "direct_start").unwrap();
        assert!(start < complete && complete < direct);
        assert!(matches!(
            &events[events.iter().position(|e| e.event_type() == "tool_call_complete").unwrap()],
            DeliberationEvent::ToolCallComplete { success: true, .. }
        ));
        assert!(outcome.response().unwrap().contains('4'));
        assert!(outcome.state.stage1.is_empty());

        let chair_calls = calls_to(&h.backend, "chair");
        assert!(last_prompt(chair_calls.last().unwrap()).contains("TOOL RESULT"));
    }

    #[tokio::test]
    async fn tool_failure_is_reported_honestly() {
        let inventory = ToolInventory::new(vec![ToolDescriptor::new(
            "weather",
            "forecast",
            "Weather forecast for a city",
        )]);
        let tools = StaticTools::new(inventory).respond(Ok(ToolResponse::failed("timeout")));
        let h = harness_with(
            ScriptedBackend::new()
                .script("chair", classify("factual", true))
                .script(
                    "chair",
                    Script::text(r#"{"server": "weather", "tool": "forecast", "arguments": {"city": "Paris"}}"#),
                )
                .script("chair", Script::text("The weather service timed out, so I can't say.")),
            Arc::new(tools),
            DeliberationConfig::default(),
        );

        let (result, events) = run(&h.use_case, input("What's the weather in Paris?", council(3, 3))).await;
        result.unwrap();

        assert!(events.iter().any(|e| matches!(
            e,
            DeliberationEvent::ToolCallComplete { success: false, error: Some(error), .. } if error == "timeout"
        )));
        let chair_calls = calls_to(&h.backend, "chair");
        let prompt = last_prompt(chair_calls.last().unwrap());
        assert!(prompt.contains("timeout"));
        assert!(prompt.contains("Report this failure honestly"));
        assert!(prompt.contains("Do not fabricate"));
    }

    #[tokio::test]
    async fn four_member_panel_survives_one_failure() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("Answer one"))
                .script("m2", Script::text("Answer two"))
                .script("m3", Script::text("Answer three"))
                .script("m4", refused())
                .script("m1", ranks(&['B', 'C']))
                .script("m2", ranks(&['A', 'C']))
                .script("m3", ranks(&['A', 'B']))
                .script("chair", Script::text("Final synthesis")),
        );
        let request = input("How should we price the new product?", council(4, 4))
            .with_panel_override(parse_panel_override("a1=m1,a2=m2,a3=m3,a4=m4"));

        let (result, events) = run(&h.use_case, request).await;
        let outcome = result.unwrap();

        // every member has exactly one terminal stage-1 event
        assert_eq!(count(&events, "stage1_model_complete"), 3);
        assert_eq!(count(&events, "stage1_model_error"), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            DeliberationEvent::Stage1ModelError { member_id, .. } if member_id == "a4"
        )));
        assert_eq!(outcome.state.stage1.len(), 4);
        assert!(outcome.state.stage1.iter().all(StageResult::is_terminal));

        // only answering members rank, and never see their own answer
        assert_eq!(count(&events, "stage2_model_complete"), 3);
        let m1_calls = calls_to(&h.backend, "m1");
        let ranking_prompt = last_prompt(&m1_calls[1]);
        assert!(!ranking_prompt.contains("Answer one"));
        assert!(ranking_prompt.contains("Answer two"));
        assert!(calls_to(&h.backend, "m4").len() == 1);

        let ranking = outcome.state.ranking.as_ref().unwrap();
        assert_eq!(ranking.winner.as_deref(), Some("a1"));
        assert_eq!(count(&events, "analysis"), 1);

        // the chairman is told who failed
        let chair_calls = calls_to(&h.backend, "chair");
        let synthesis_prompt = last_prompt(chair_calls.last().unwrap());
        assert!(synthesis_prompt.contains("failed to respond"));
        assert!(synthesis_prompt.contains("Advisor 4"));

        assert_eq!(outcome.response(), Some("Final synthesis"));
        assert_eq!(count(&events, "done"), 1);
        assert_eq!(events.last().unwrap().event_type(), "done");

        let records = h.leaderboard.records.lock().unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].winner.as_deref(), Some("a1"));
        assert_eq!(records[0].results.len(), 3);
    }

    #[tokio::test]
    async fn usage_is_attributed_per_stage() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("one"))
                .script("m2", Script::text("two"))
                .script("m3", Script::text("three"))
                .script("m1", ranks(&['B', 'C']))
                .script("m2", ranks(&['A', 'C']))
                .script("m3", ranks(&['A', 'B']))
                .script("chair", Script::text("final")),
        );

        let (result, events) = run(&h.use_case, input("Which database should we use?", council(3, 3))).await;
        result.unwrap();

        let Some(DeliberationEvent::Done { usage, .. }) = events.last() else {
            panic!("last event must be done");
        };
        assert_eq!(usage.by_stage[&Stage::Classification].calls, 1);
        assert_eq!(usage.by_stage[&Stage::Stage1].calls, 3);
        assert_eq!(usage.by_stage[&Stage::Stage2].calls, 3);
        assert_eq!(usage.by_stage[&Stage::Stage3].calls, 1);
        assert_eq!(usage.total.calls, 8);
        assert_eq!(usage.total.usage.total_tokens, 8 * 15);

        // One update per finished call, each carrying the running total so far.
        let running: Vec<usize> = events
            .iter()
            .filter_map(|e| match e {
                DeliberationEvent::UsageUpdate { running_total, .. } => Some(running_total.calls),
                _ => None,
            })
            .collect();
        assert_eq!(running, (1..=8).collect::<Vec<_>>());
    }

    #[tokio::test]
    async fn confident_memory_skips_every_model_call() {
        let h = harness(ScriptedBackend::new());
        let use_case = h.use_case.clone().with_memory(Arc::new(StaticMemory(vec![
            MemoryFact::new("The office closes at 6pm.", 1.0, 0.95),
        ])));

        let (result, events) = run(&use_case, input("When does the office close?", council(3, 3))).await;
        let outcome = result.unwrap();

        assert_eq!(types(&events), vec!["memory_hit", "done"]);
        assert_eq!(h.backend.call_count(), 0);
        assert!(outcome.response().unwrap().contains("6pm"));
    }

    #[tokio::test]
    async fn stale_memory_is_ignored() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("chat", false))
                .script("chair", Script::text("Hello!")),
        );
        let use_case = h.use_case.clone().with_memory(Arc::new(StaticMemory(vec![
            MemoryFact::new("Greeting preference: formal", 120.0, 1.0),
        ])));

        let (_, events) = run(&use_case, input("hi", council(3, 3))).await;
        assert_eq!(count(&events, "memory_hit"), 0);
        assert_eq!(count(&events, "direct_start"), 1);
    }

    #[tokio::test]
    async fn force_direct_skips_classification() {
        let h = harness(ScriptedBackend::new().script("chair", Script::text("Hi there!")));

        let (result, events) = run(
            &h.use_case,
            input("Should we rewrite everything in Rust?", council(3, 3)).with_force_direct(true),
        )
        .await;
        let outcome = result.unwrap();

        assert_eq!(h.backend.call_count(), 1);
        assert_eq!(outcome.response(), Some("Hi there!"));
        assert!(events.iter().any(|e| matches!(
            e,
            DeliberationEvent::ClassificationComplete { reasoning, .. } if reasoning == "direct answer requested"
        )));
    }

    #[tokio::test]
    async fn stage1_mode_stops_after_first_stage() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("Answer one"))
                .script("m2", Script::text("Answer two"))
                .script("m3", Script::text("Answer three")),
        );

        let (result, events) = run(
            &h.use_case,
            input("Monolith or microservices?", council(3, 3)).with_mode(ExecutionMode::Stage1),
        )
        .await;
        let outcome = result.unwrap();

        assert_eq!(count(&events, "stage2_model_complete"), 0);
        assert_eq!(count(&events, "stage3_complete"), 0);
        assert_eq!(outcome.response(), Some("Answer one"));
        assert!(h.leaderboard.records.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn stages12_mode_answers_with_the_winner() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("Answer one"))
                .script("m2", Script::text("Answer two"))
                .script("m3", Script::text("Answer three"))
                .script("m1", ranks(&['C', 'B']))
                .script("m2", ranks(&['C', 'A']))
                .script("m3", ranks(&['B', 'A'])),
        );

        let (result, events) = run(
            &h.use_case,
            input("Monolith or microservices?", council(3, 3)).with_mode(ExecutionMode::Stages12),
        )
        .await;
        let outcome = result.unwrap();

        assert_eq!(count(&events, "stage3_complete"), 0);
        assert_eq!(outcome.response(), Some("Answer three"));
    }

    #[tokio::test]
    async fn no_stage1_answers_is_an_error_followed_by_done() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", refused())
                .script("m2", refused())
                .script("m3", refused()),
        );

        let (result, events) = run(&h.use_case, input("Is this plan sound?", council(3, 3))).await;
        let outcome = result.unwrap();

        assert_eq!(error_messages(&events), vec!["No models responded in stage 1"]);
        assert_eq!(events.last().unwrap().event_type(), "done");
        assert!(outcome.response().is_none());
        assert_eq!(calls_to(&h.backend, "chair").len(), 1);
    }

    #[tokio::test]
    async fn single_answer_skips_ranking() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("Only answer"))
                .script("m2", refused())
                .script("m3", refused())
                .script("chair", Script::text("Synthesized")),
        );

        let (result, events) = run(&h.use_case, input("Is this plan sound?", council(3, 3))).await;
        let outcome = result.unwrap();

        assert_eq!(calls_to(&h.backend, "m1").len(), 1);
        assert!(events.iter().any(|e| matches!(
            e,
            DeliberationEvent::Analysis(ranking) if ranking.winner.as_deref() == Some("a1")
        )));
        assert_eq!(outcome.response(), Some("Synthesized"));
    }

    #[tokio::test]
    async fn classifier_outage_is_reported_and_run_continues() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", refused())
                .script("chair", Script::text("Synthesized anyway")),
        );

        let (result, events) = run(&h.use_case, input("Should we expand to Europe?", council(3, 3))).await;
        let outcome = result.unwrap();

        let errors = error_messages(&events);
        assert_eq!(errors.len(), 1);
        assert!(errors[0].starts_with("Classification failed"));
        assert_eq!(outcome.state.stage1.len(), 3);
        assert_eq!(count(&events, "done"), 1);
    }

    #[tokio::test]
    async fn synthesis_failure_is_escalated_then_done() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("one"))
                .script("m2", Script::text("two"))
                .script("m3", Script::text("three"))
                .script("chair", refused()),
        );

        let (result, events) = run(&h.use_case, input("Should we expand to Europe?", council(3, 3))).await;
        let outcome = result.unwrap();

        assert_eq!(count(&events, "stage3_error"), 1);
        assert!(error_messages(&events)[0].starts_with("Synthesis failed"));
        assert_eq!(events.last().unwrap().event_type(), "done");
        assert!(outcome.response().is_none());
    }

    #[tokio::test]
    async fn invalid_override_ends_with_error_and_done() {
        let h = harness(ScriptedBackend::new().script("chair", classify("deliberation", false)));

        let (result, events) = run(
            &h.use_case,
            input("Is this plan sound?", council(3, 3))
                .with_panel_override(parse_panel_override("a1,a1,a2")),
        )
        .await;
        result.unwrap();

        assert!(error_messages(&events)[0].starts_with("Invalid panel"));
        assert_eq!(count(&events, "stage1_model_complete"), 0);
        assert_eq!(events.last().unwrap().event_type(), "done");
    }

    struct RejectPanel;

    #[async_trait]
    impl PanelConfirmation for RejectPanel {
        async fn confirm(&self, _panel: &Panel) -> PanelDecision {
            PanelDecision::Reject("not today".to_string())
        }
    }

    struct ReversePanel;

    #[async_trait]
    impl PanelConfirmation for ReversePanel {
        async fn confirm(&self, panel: &Panel) -> PanelDecision {
            let mut selections = panel.to_selections();
            selections.reverse();
            PanelDecision::Edit(selections)
        }
    }

    fn confirming_config() -> DeliberationConfig {
        DeliberationConfig::default().with_auto_accept_panel(false)
    }

    #[tokio::test]
    async fn rejected_panel_ends_the_run() {
        let h = harness_with(
            ScriptedBackend::new().script("chair", classify("deliberation", false)),
            Arc::new(NoTools),
            confirming_config(),
        );
        let use_case = h.use_case.clone().with_panel_confirmation(Arc::new(RejectPanel));

        let (result, events) = run(&use_case, input("Is this plan sound?", council(3, 3))).await;
        result.unwrap();

        assert_eq!(error_messages(&events), vec!["Panel rejected: not today"]);
        assert_eq!(count(&events, "stage1_model_complete"), 0);
        assert_eq!(events.last().unwrap().event_type(), "done");
    }

    #[tokio::test]
    async fn edited_panel_is_confirmed_and_used() {
        let h = harness_with(
            ScriptedBackend::new().script("chair", classify("deliberation", false)),
            Arc::new(NoTools),
            confirming_config(),
        );
        let use_case = h.use_case.clone().with_panel_confirmation(Arc::new(ReversePanel));

        let (result, events) = run(
            &use_case,
            input("Is this plan sound?", council(3, 3)).with_mode(ExecutionMode::Stage1),
        )
        .await;
        let outcome = result.unwrap();

        assert_eq!(count(&events, "panel_confirmed"), 1);
        let order: Vec<&str> = outcome.state.stage1.iter().map(|r| r.member_id.as_str()).collect();
        assert_eq!(order, vec!["a3", "a2", "a1"]);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_the_run_without_done() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::Hang)
                .script("m2", Script::Hang)
                .script("m3", Script::Hang),
        );
        let (tx, mut rx) = mpsc::channel(4096);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let result = h
            .use_case
            .execute(input("Is this plan sound?", council(3, 3)), tx, cancel)
            .await;

        assert!(result.unwrap_err().is_cancelled());
        let mut saw_done = false;
        while let Ok(event) = rx.try_recv() {
            saw_done |= event.is_done();
        }
        assert!(!saw_done);
        assert!(h.leaderboard.records.lock().unwrap().is_empty());
        assert!(h.memory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn stalled_reader_does_not_block_cancellation() {
        let h = harness(
            ScriptedBackend::new()
                .script("chair", classify("deliberation", false))
                .script("m1", Script::text("one"))
                .script("m2", Script::text("two"))
                .script("m3", Script::text("three")),
        );
        // Room for one event; nobody ever reads.
        let (tx, _rx) = mpsc::channel(1);
        let cancel = CancellationToken::new();
        let canceller = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            canceller.cancel();
        });

        let result = tokio::time::timeout(
            Duration::from_secs(10),
            h.use_case
                .execute(input("Is this plan sound?", council(3, 3)), tx, cancel),
        )
        .await
        .expect("run must end once cancelled");

        assert!(result.unwrap_err().is_cancelled());
        assert!(h.memory.recorded.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dropped_receiver_cancels_the_run() {
        let h = harness(ScriptedBackend::new().script("chair", classify("chat", false)));
        let (tx, rx) = mpsc::channel(16);
        drop(rx);

        let result = h
            .use_case
            .execute(input("hello there", council(3, 3)), tx, CancellationToken::new())
            .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}

//! Stage executor
//!
//! Runs one streaming call per member concurrently and waits for every
//! member to reach a terminal state. Deltas go through the
//! [`StreamMultiplexer`] and are forwarded to the client as they arrive;
//! each member task owns exactly one [`StageResult`].

use super::event_emitter::{ClientGone, EventEmitter};
use super::stream_multiplexer::{MuxItem, MuxProducer, StreamMultiplexer};
use crate::ports::model_backend::ModelBackend;
use council_domain::util::{looks_like_refusal, strip_placeholder_images};
use council_domain::{
    DeliberationEvent, Message, Model, PromptTemplate, Role, Stage, StageResult, StreamEvent,
    TokenClock, Usage, UsageLedger,
};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

/// The stage was abandoned before every member finished
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
#[error("stage cancelled")]
pub struct StageCancelled;

impl From<ClientGone> for StageCancelled {
    fn from(_: ClientGone) -> Self {
        StageCancelled
    }
}

/// One member's call for a stage
#[derive(Debug, Clone)]
pub struct StageCall {
    pub member_id: String,
    pub model: Model,
    pub role: String,
    pub messages: Vec<Message>,
}

impl StageCall {
    pub fn new(
        member_id: impl Into<String>,
        model: Model,
        role: impl Into<String>,
        messages: Vec<Message>,
    ) -> Self {
        Self {
            member_id: member_id.into(),
            model,
            role: role.into(),
            messages,
        }
    }

    fn pending_result(&self) -> StageResult {
        StageResult::pending(self.member_id.clone(), self.model.clone(), self.role.clone())
    }
}

/// Results of a finished stage, in call order
#[derive(Debug, Clone, Default)]
pub struct StageOutcome {
    pub results: Vec<StageResult>,
}

impl StageOutcome {
    pub fn completed(&self) -> impl Iterator<Item = &StageResult> {
        self.results.iter().filter(|r| r.is_complete())
    }
}

/// Fan-out/fan-in runner for one stage
pub struct StageExecutor<B: ModelBackend + ?Sized + 'static> {
    backend: Arc<B>,
    call_timeout: Duration,
    max_refusal_retries: usize,
}

impl<B: ModelBackend + ?Sized + 'static> StageExecutor<B> {
    pub fn new(backend: Arc<B>, call_timeout: Duration, max_refusal_retries: usize) -> Self {
        Self {
            backend,
            call_timeout,
            max_refusal_retries,
        }
    }

    /// Run every call and wait for all of them.
    ///
    /// `on_finished` builds the per-member terminal event. Each member's usage
    /// goes into `ledger` as it finishes and is reported with a `usage_update`.
    /// Returns once every member is complete or errored, or [`StageCancelled`]
    /// when the run token fires first; outstanding member tasks are aborted in
    /// that case.
    pub async fn run<F>(
        &self,
        stage: Stage,
        calls: Vec<StageCall>,
        emitter: &EventEmitter,
        ledger: &mut UsageLedger,
        on_finished: F,
    ) -> Result<StageOutcome, StageCancelled>
    where
        F: Fn(&StageResult) -> DeliberationEvent,
    {
        info!("Stage {}: {} call(s)", stage, calls.len());

        let mux = StreamMultiplexer::new();
        let mut slots: HashMap<String, usize> = HashMap::new();
        let mut results: Vec<Option<StageResult>> = vec![None; calls.len()];
        let mut task_slots = HashMap::new();
        let mut join_set = JoinSet::new();

        for (slot, call) in calls.iter().enumerate() {
            slots.insert(call.member_id.clone(), slot);
            let producer = mux.register(call.member_id.clone());
            let backend = Arc::clone(&self.backend);
            let call = call.clone();
            let timeout = self.call_timeout;
            let retries = self.max_refusal_retries;

            let handle = join_set.spawn(async move {
                run_member(backend.as_ref(), call, producer, timeout, retries).await;
            });
            task_slots.insert(handle.id(), slot);
        }

        let cancel = emitter.cancel_token().clone();
        let mut finished = 0;
        while finished < calls.len() {
            while let Some(item) = mux.try_next() {
                match item {
                    MuxItem::Delta { member_id, text } => {
                        emitter
                            .emit(DeliberationEvent::stage_token(stage, member_id, text))
                            .await?;
                    }
                    MuxItem::Thinking { member_id, text } => {
                        emitter
                            .emit(DeliberationEvent::stage_thinking(stage, member_id, text))
                            .await?;
                    }
                    MuxItem::Reset { member_id } => {
                        emitter
                            .emit(DeliberationEvent::stage_reset(stage, member_id))
                            .await?;
                    }
                    MuxItem::Finished { result, usage: spent } => {
                        let Some(&slot) = slots.get(&result.member_id) else {
                            continue;
                        };
                        if results[slot].is_some() {
                            continue;
                        }
                        if result.is_complete() {
                            debug!("Stage {}: {} complete", stage, result.member_id);
                        } else {
                            warn!(
                                "Stage {}: {} failed: {}",
                                stage,
                                result.member_id,
                                result.error.as_deref().unwrap_or("unknown error")
                            );
                        }
                        emitter.emit(on_finished(&*result)).await?;
                        if !spent.is_empty() {
                            ledger.record(stage, &result.model, Some(&result.member_id), spent);
                            emitter
                                .emit(DeliberationEvent::usage_update(
                                    stage,
                                    ledger.stage_summary(stage),
                                    ledger.total(),
                                ))
                                .await?;
                        }
                        results[slot] = Some(*result);
                        finished += 1;
                    }
                }
            }
            if finished == calls.len() {
                break;
            }

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    info!("Stage {} cancelled, aborting {} task(s)", stage, join_set.len());
                    join_set.abort_all();
                    return Err(StageCancelled);
                }
                Some(joined) = join_set.join_next_with_id(), if !join_set.is_empty() => {
                    // A task that ends without pushing its terminal item panicked.
                    if let Err(e) = joined
                        && let Some(&slot) = task_slots.get(&e.id())
                        && results[slot].is_none()
                    {
                        warn!("Stage {}: member task failed: {}", stage, e);
                        let mut failed = calls[slot].pending_result();
                        let _ = failed.fail(format!("task failed: {}", e));
                        emitter.emit(on_finished(&failed)).await?;
                        results[slot] = Some(failed);
                        finished += 1;
                    }
                }
                _ = mux.notified() => {}
            }
        }

        let results = results
            .into_iter()
            .zip(&calls)
            .map(|(result, call)| {
                result.unwrap_or_else(|| {
                    let mut missing = call.pending_result();
                    let _ = missing.fail("no result");
                    missing
                })
            })
            .collect::<Vec<_>>();
        info!(
            "Stage {} finished: {}/{} complete",
            stage,
            results.iter().filter(|r| r.is_complete()).count(),
            results.len()
        );
        Ok(StageOutcome { results })
    }
}

/// One member task: call, stream, retry on refusal, push exactly one terminal item.
async fn run_member<B: ModelBackend + ?Sized>(
    backend: &B,
    call: StageCall,
    producer: MuxProducer,
    call_timeout: Duration,
    max_refusal_retries: usize,
) {
    let attempt = tokio::time::timeout(
        call_timeout,
        stream_with_retries(backend, &call, &producer, max_refusal_retries),
    )
    .await;

    let (result, usage) = match attempt {
        Ok(done) => done,
        Err(_) => {
            let mut result = call.pending_result();
            let _ = result.fail(format!("timed out after {}s", call_timeout.as_secs()));
            (result, Usage::default())
        }
    };
    producer.finish(result, usage);
}

async fn stream_with_retries<B: ModelBackend + ?Sized>(
    backend: &B,
    call: &StageCall,
    producer: &MuxProducer,
    max_refusal_retries: usize,
) -> (StageResult, Usage) {
    let mut result = call.pending_result();
    let mut usage = Usage::default();
    let mut messages = call.messages.clone();

    for attempt in 0..=max_refusal_retries {
        if attempt > 0 {
            strengthen_prompt(&mut messages);
        }

        let mut handle = match backend.stream(&call.model, &messages).await {
            Ok(handle) => handle,
            Err(e) => {
                let _ = result.fail(e.to_string());
                return (result, usage);
            }
        };

        let mut clock = TokenClock::start();
        let mut answer = String::new();
        let mut stream_error = None;
        while let Some(event) = handle.next().await {
            match event {
                StreamEvent::Delta(text) => {
                    clock.record_answer(&text);
                    answer.push_str(&text);
                    let _ = result.append_delta(&text);
                    producer.delta(text);
                }
                StreamEvent::ThinkingDelta(text) => {
                    clock.record_thinking(&text);
                    let _ = result.append_thinking(&text);
                    producer.thinking(text);
                }
                StreamEvent::Usage(spent) => {
                    usage += spent;
                    break;
                }
                StreamEvent::Error(e) => {
                    stream_error = Some(e);
                    break;
                }
            }
        }

        if let Some(e) = stream_error {
            let _ = result.fail(e);
            return (result, usage);
        }
        if answer.trim().is_empty() {
            let _ = result.fail("empty response");
            return (result, usage);
        }
        if looks_like_refusal(&answer) && attempt < max_refusal_retries {
            warn!(
                "{} ({}) refused, retrying ({}/{})",
                call.member_id,
                call.model,
                attempt + 1,
                max_refusal_retries
            );
            // Streamed text so far belongs to the refused attempt.
            let _ = result.restart();
            producer.reset();
            continue;
        }

        let _ = result.complete(strip_placeholder_images(&answer), clock.finish());
        return (result, usage);
    }

    // Loop always returns; kept for the type checker.
    let _ = result.fail("no answer");
    (result, usage)
}

/// Append the retry instruction to the last user message
fn strengthen_prompt(messages: &mut [Message]) {
    if let Some(last) = messages.iter_mut().rev().find(|m| m.role == Role::User) {
        last.content.push_str(PromptTemplate::refusal_retry_suffix());
    }
}

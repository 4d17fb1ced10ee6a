//! Scripted collaborators shared by the use case tests

use crate::ports::leaderboard::{LeaderboardError, LeaderboardSink};
use crate::ports::memory_lookup::{MemoryError, MemoryLookup};
use crate::ports::model_backend::{BackendError, ModelBackend, StreamHandle};
use crate::ports::tool_invoker::{ToolInvokeError, ToolInvoker};
use async_trait::async_trait;
use council_domain::{
    Advisor, CouncilSnapshot, LeaderboardRecord, MemoryFact, Message, Model, Standing,
    StreamEvent, ToolInventory, ToolResponse, Usage,
};
use serde_json::Value;
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;

/// What one backend call does
#[derive(Debug, Clone)]
pub enum Script {
    Reply(Vec<StreamEvent>),
    /// Sends the events after a delay
    Delayed(Duration, Vec<StreamEvent>),
    Fail(BackendError),
    /// Stream opens and never yields
    Hang,
}

impl Script {
    pub fn text(text: &str) -> Self {
        Script::Reply(vec![
            StreamEvent::Delta(text.to_string()),
            StreamEvent::Usage(Usage::new(10, 5)),
        ])
    }
}

/// Backend that replays scripts queued per model
#[derive(Default)]
pub struct ScriptedBackend {
    scripts: Mutex<HashMap<String, VecDeque<Script>>>,
    calls: Mutex<Vec<(Model, Vec<Message>)>>,
    held: Mutex<Vec<mpsc::Sender<StreamEvent>>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script(self, model: &str, script: Script) -> Self {
        self.scripts
            .lock()
            .unwrap()
            .entry(model.to_string())
            .or_default()
            .push_back(script);
        self
    }

    pub fn calls(&self) -> Vec<(Model, Vec<Message>)> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    async fn stream(
        &self,
        model: &Model,
        messages: &[Message],
    ) -> Result<StreamHandle, BackendError> {
        self.calls
            .lock()
            .unwrap()
            .push((model.clone(), messages.to_vec()));
        let script = self
            .scripts
            .lock()
            .unwrap()
            .get_mut(model.as_str())
            .and_then(|queue| queue.pop_front())
            .unwrap_or_else(|| Script::text("(default response)"));

        match script {
            Script::Reply(events) => Ok(StreamHandle::from_events(events)),
            Script::Delayed(delay, events) => {
                let (tx, rx) = mpsc::channel(events.len().max(1));
                tokio::spawn(async move {
                    tokio::time::sleep(delay).await;
                    for event in events {
                        let _ = tx.send(event).await;
                    }
                });
                Ok(StreamHandle::new(rx))
            }
            Script::Fail(error) => Err(error),
            Script::Hang => {
                let (tx, rx) = mpsc::channel(1);
                self.held.lock().unwrap().push(tx);
                Ok(StreamHandle::new(rx))
            }
        }
    }
}

/// Tool invoker with a fixed inventory and queued responses
pub struct StaticTools {
    inventory: ToolInventory,
    responses: Mutex<VecDeque<Result<ToolResponse, ToolInvokeError>>>,
    pub invocations: Mutex<Vec<(String, String, Value)>>,
}

impl StaticTools {
    pub fn new(inventory: ToolInventory) -> Self {
        Self {
            inventory,
            responses: Mutex::new(VecDeque::new()),
            invocations: Mutex::new(Vec::new()),
        }
    }

    pub fn respond(self, response: Result<ToolResponse, ToolInvokeError>) -> Self {
        self.responses.lock().unwrap().push_back(response);
        self
    }
}

#[async_trait]
impl ToolInvoker for StaticTools {
    async fn inventory(&self) -> Result<ToolInventory, ToolInvokeError> {
        Ok(self.inventory.clone())
    }

    async fn invoke(
        &self,
        server: &str,
        tool: &str,
        arguments: &Value,
    ) -> Result<ToolResponse, ToolInvokeError> {
        self.invocations
            .lock()
            .unwrap()
            .push((server.to_string(), tool.to_string(), arguments.clone()));
        self.responses
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Ok(ToolResponse::ok(Value::Null)))
    }
}

/// Memory store returning fixed facts
pub struct StaticMemory(pub Vec<MemoryFact>);

#[async_trait]
impl MemoryLookup for StaticMemory {
    async fn search(&self, _query: &str) -> Result<Vec<MemoryFact>, MemoryError> {
        Ok(self.0.clone())
    }

    async fn record(&self, _query: &str, _response: &str) -> Result<(), MemoryError> {
        Ok(())
    }
}

/// Memory store that keeps every write-back
#[derive(Default)]
pub struct RecordingMemory {
    pub facts: Vec<MemoryFact>,
    pub recorded: Mutex<Vec<(String, String)>>,
}

impl RecordingMemory {
    pub fn with_facts(facts: Vec<MemoryFact>) -> Self {
        Self {
            facts,
            ..Self::default()
        }
    }
}

#[async_trait]
impl MemoryLookup for RecordingMemory {
    async fn search(&self, _query: &str) -> Result<Vec<MemoryFact>, MemoryError> {
        Ok(self.facts.clone())
    }

    async fn record(&self, query: &str, response: &str) -> Result<(), MemoryError> {
        self.recorded
            .lock()
            .unwrap()
            .push((query.to_string(), response.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingLeaderboard {
    pub records: Mutex<Vec<LeaderboardRecord>>,
}

#[async_trait]
impl LeaderboardSink for RecordingLeaderboard {
    async fn record(&self, record: &LeaderboardRecord) -> Result<(), LeaderboardError> {
        self.records.lock().unwrap().push(record.clone());
        Ok(())
    }

    async fn standings(&self, _council_id: &str) -> Result<Vec<Standing>, LeaderboardError> {
        Ok(Vec::new())
    }
}

/// Council with advisors `a1..aN`, models `m1..m<models>` and chairman `chair`
pub fn council(advisors: usize, models: usize) -> CouncilSnapshot {
    let roster = (1..=advisors)
        .map(|i| {
            Advisor::new(format!("a{}", i), format!("Advisor {}", i))
                .with_role(format!("role {}", i))
                .with_system_prompt(format!("You are advisor {}.", i))
        })
        .collect();
    let pool = (1..=models).map(|i| Model::new(format!("m{}", i))).collect();
    CouncilSnapshot::try_new("test", roster, Model::new("chair"))
        .unwrap()
        .with_models(pool)
}

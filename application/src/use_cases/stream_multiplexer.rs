//! Stream multiplexer
//!
//! Merges the delta streams of every member of a stage into one reader.
//! Producers push into their own unbounded queue and never await, so a slow
//! reader cannot stall a backend stream. The reader drains members in
//! round-robin order; when a member has several queued deltas of the same
//! kind they are coalesced into one item instead of being dropped. A reset
//! discards the member's undelivered deltas and tells the reader to drop
//! what it already showed.

use council_domain::{StageResult, Usage};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

/// One item handed to the reader
#[derive(Debug, Clone, PartialEq)]
pub enum MuxItem {
    Delta { member_id: String, text: String },
    Thinking { member_id: String, text: String },
    /// Text streamed so far for this member is void
    Reset { member_id: String },
    /// Terminal item of a member; nothing follows it for that member
    Finished { result: Box<StageResult>, usage: Usage },
}

impl MuxItem {
    pub fn member_id(&self) -> &str {
        match self {
            MuxItem::Delta { member_id, .. }
            | MuxItem::Thinking { member_id, .. }
            | MuxItem::Reset { member_id } => member_id,
            MuxItem::Finished { result, .. } => &result.member_id,
        }
    }
}

#[derive(Debug)]
enum Queued {
    Delta(String),
    Thinking(String),
    Reset,
    Finished(Box<StageResult>, Usage),
}

#[derive(Debug)]
struct MemberQueue {
    member_id: String,
    items: VecDeque<Queued>,
    finished: bool,
}

#[derive(Debug, Default)]
struct Inner {
    members: Vec<MemberQueue>,
    cursor: usize,
}

#[derive(Debug, Default)]
struct Shared {
    inner: Mutex<Inner>,
    notify: Notify,
}

/// Reader side of the multiplexer
#[derive(Debug, Default)]
pub struct StreamMultiplexer {
    shared: Arc<Shared>,
}

/// Writer handle owned by one member task
#[derive(Debug, Clone)]
pub struct MuxProducer {
    shared: Arc<Shared>,
    slot: usize,
}

impl StreamMultiplexer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a member and get its producer handle.
    ///
    /// Registration order is the round-robin order.
    pub fn register(&self, member_id: impl Into<String>) -> MuxProducer {
        let mut inner = self.lock();
        inner.members.push(MemberQueue {
            member_id: member_id.into(),
            items: VecDeque::new(),
            finished: false,
        });
        MuxProducer {
            shared: Arc::clone(&self.shared),
            slot: inner.members.len() - 1,
        }
    }

    /// Take the next available item without waiting.
    pub fn try_next(&self) -> Option<MuxItem> {
        let mut inner = self.lock();
        let count = inner.members.len();
        for offset in 0..count {
            let slot = (inner.cursor + offset) % count;
            let queue = &mut inner.members[slot];
            let Some(front) = queue.items.pop_front() else {
                continue;
            };
            let member_id = queue.member_id.clone();
            let item = match front {
                Queued::Delta(mut text) => {
                    while let Some(Queued::Delta(next)) = queue.items.front() {
                        text.push_str(next);
                        queue.items.pop_front();
                    }
                    MuxItem::Delta { member_id, text }
                }
                Queued::Thinking(mut text) => {
                    while let Some(Queued::Thinking(next)) = queue.items.front() {
                        text.push_str(next);
                        queue.items.pop_front();
                    }
                    MuxItem::Thinking { member_id, text }
                }
                Queued::Reset => MuxItem::Reset { member_id },
                Queued::Finished(result, usage) => MuxItem::Finished { result, usage },
            };
            inner.cursor = (slot + 1) % count;
            return Some(item);
        }
        None
    }

    /// Wait until a producer has pushed since the last wakeup.
    pub async fn notified(&self) {
        self.shared.notify.notified().await;
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        // A poisoned queue still holds consistent data; producers never panic mid-push.
        self.shared
            .inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl MuxProducer {
    pub fn delta(&self, text: impl Into<String>) {
        self.push(Queued::Delta(text.into()));
    }

    pub fn thinking(&self, text: impl Into<String>) {
        self.push(Queued::Thinking(text.into()));
    }

    /// Void everything this member streamed so far
    pub fn reset(&self) {
        self.push(Queued::Reset);
    }

    /// Push the terminal item. Later pushes from this producer are ignored.
    pub fn finish(&self, result: StageResult, usage: Usage) {
        self.push(Queued::Finished(Box::new(result), usage));
    }

    fn push(&self, item: Queued) {
        {
            let mut inner = self
                .shared
                .inner
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            let queue = &mut inner.members[self.slot];
            if queue.finished {
                return;
            }
            match item {
                Queued::Finished(..) => queue.finished = true,
                Queued::Reset => {
                    // Undelivered deltas of the voided attempt never reach the reader.
                    queue
                        .items
                        .retain(|queued| !matches!(queued, Queued::Delta(_) | Queued::Thinking(_)));
                    if matches!(queue.items.back(), Some(Queued::Reset)) {
                        return;
                    }
                }
                _ => {}
            }
            queue.items.push_back(item);
        }
        self.shared.notify.notify_one();
    }
}

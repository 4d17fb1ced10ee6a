//! Event delivery to the client and the transcript logger

use crate::ports::conversation_logger::{ConversationEvent, ConversationLogger};
use council_domain::DeliberationEvent;
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// The client stopped listening or the run was cancelled
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClientGone;

/// Sends events to the client channel and mirrors them into the transcript.
///
/// A closed channel means the client disconnected; the emitter then cancels
/// the run token so every outstanding task stops. A send blocked on a full
/// channel gives up as soon as the token fires.
#[derive(Clone)]
pub struct EventEmitter {
    sender: mpsc::Sender<DeliberationEvent>,
    logger: Arc<dyn ConversationLogger>,
    cancel: CancellationToken,
}

impl EventEmitter {
    pub fn new(
        sender: mpsc::Sender<DeliberationEvent>,
        logger: Arc<dyn ConversationLogger>,
        cancel: CancellationToken,
    ) -> Self {
        Self {
            sender,
            logger,
            cancel,
        }
    }

    pub async fn emit(&self, event: DeliberationEvent) -> Result<(), ClientGone> {
        if !event.is_delta() {
            self.logger.log(ConversationEvent::from_event(&event));
        }
        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => {
                debug!("Run cancelled while sending an event");
                Err(ClientGone)
            }
            sent = self.sender.send(event) => {
                if sent.is_err() {
                    debug!("Event receiver dropped, cancelling run");
                    self.cancel.cancel();
                    return Err(ClientGone);
                }
                Ok(())
            }
        }
    }

    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }
}

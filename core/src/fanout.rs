//! Fans one question out to every image slot and streams the answers back in place.
//!
//! Each slot runs as its own future holding the only mutable reference to its [`Slot`].
//! The futures are polled together on the caller's task, so N requests overlap without
//! locks and no slot can write into another.

use std::time::Duration;

use futures::stream::{FuturesUnordered, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::client::{CompletionService, CompletionStreamClient, HttpCompletionService};
use crate::config::ChatConfig;
use crate::errors::{ChatError, ChatResult};
use crate::projector;
use crate::transcript::{Conversation, Slot, SlotHandle, SlotStatus, TurnId};
use crate::types::MessageHistory;

/// Receives progress of a dispatch, typically to refresh a view
pub trait TranscriptObserver: Send + Sync {
    /// Called after every text delta with the slot's full answer so far
    fn on_slot_update(&self, handle: SlotHandle, text: &str);

    /// Called once per slot when its request finished or failed
    fn on_slot_settled(&self, _handle: SlotHandle, _slot: &Slot) {}
}

/// Observer that ignores everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl TranscriptObserver for NoopObserver {
    fn on_slot_update(&self, _handle: SlotHandle, _text: &str) {}
}

#[derive(Debug, Clone)]
pub struct FanoutOrchestrator<S> {
    client: CompletionStreamClient<S>,
    request_timeout: Option<Duration>,
}

impl FanoutOrchestrator<HttpCompletionService> {
    pub fn from_config(config: &ChatConfig) -> ChatResult<Self> {
        let service = HttpCompletionService::new(config)?;
        Ok(Self::new(service).with_request_timeout(config.request_timeout()))
    }
}

impl<S: CompletionService> FanoutOrchestrator<S> {
    pub fn new(service: S) -> Self {
        Self {
            client: CompletionStreamClient::new(service),
            request_timeout: None,
        }
    }

    /// Deadline applied to each slot's request on its own
    pub fn with_request_timeout(mut self, request_timeout: Option<Duration>) -> Self {
        self.request_timeout = request_timeout;
        self
    }

    pub fn service(&self) -> &S {
        self.client.service()
    }

    pub async fn dispatch(
        &self,
        conversation: &mut Conversation,
        turn: TurnId,
        observer: &dyn TranscriptObserver,
    ) -> ChatResult<()> {
        self.dispatch_with_cancel(conversation, turn, observer, &CancellationToken::new())
            .await
    }

    /// Fills every slot of the placeholder `turn` concurrently.
    ///
    /// Resolves once every slot has finished or failed. The first slot to fail decides the
    /// returned error; text streamed by other slots stays in the transcript. An invariant
    /// violation aborts the remaining slots immediately.
    pub async fn dispatch_with_cancel(
        &self,
        conversation: &mut Conversation,
        turn: TurnId,
        observer: &dyn TranscriptObserver,
        cancel: &CancellationToken,
    ) -> ChatResult<()> {
        let histories = projector::project_before(conversation, turn)?;
        let slots = conversation.assistant_slots_mut(turn)?;
        info!(turn = %turn, slots = slots.len(), "Dispatching question to every image");

        let mut in_flight: FuturesUnordered<_> = slots
            .iter_mut()
            .zip(histories)
            .enumerate()
            .map(|(index, (slot, history))| {
                self.run_slot(SlotHandle { turn, index }, slot, history, observer, cancel)
            })
            .collect();

        let mut first_failure = None;
        let mut violation = None;
        while let Some((handle, outcome)) = in_flight.next().await {
            match outcome {
                Ok(()) => debug!(slot = handle.index, "Slot answer complete"),
                Err(e) if e.is_invariant_violation() => {
                    error!(slot = handle.index, error = %e, "Aborting dispatch");
                    violation = Some(ChatError::in_slot(handle.index, e));
                    break;
                }
                Err(e) => {
                    warn!(slot = handle.index, error = %e, "Slot request failed");
                    first_failure.get_or_insert(ChatError::in_slot(handle.index, e));
                }
            }
        }
        // Dropping the set closes every stream still open.
        drop(in_flight);

        if let Some(e) = violation {
            abandon_unsettled(conversation, turn);
            return Err(e);
        }
        match first_failure {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    async fn run_slot(
        &self,
        handle: SlotHandle,
        slot: &mut Slot,
        history: MessageHistory,
        observer: &dyn TranscriptObserver,
        cancel: &CancellationToken,
    ) -> (SlotHandle, ChatResult<()>) {
        slot.begin();

        let outcome = {
            let answer = self.client.open(&history, |text| {
                slot.apply_update(text)?;
                observer.on_slot_update(handle, text);
                Ok(())
            });
            let bounded = async {
                match self.request_timeout {
                    Some(limit) => tokio::time::timeout(limit, answer)
                        .await
                        .unwrap_or_else(|_| Err(ChatError::Timeout(limit))),
                    None => answer.await,
                }
            };

            tokio::select! {
                biased;
                _ = cancel.cancelled() => Err(ChatError::Cancelled),
                result = bounded => result.map(|_| ()),
            }
        };

        match &outcome {
            Ok(()) => slot.complete(),
            Err(e) => slot.fail(e.to_string()),
        }
        observer.on_slot_settled(handle, slot);
        (handle, outcome)
    }
}

fn abandon_unsettled(conversation: &mut Conversation, turn: TurnId) {
    if let Ok(slots) = conversation.assistant_slots_mut(turn) {
        for slot in slots.iter_mut() {
            if matches!(slot.status(), SlotStatus::Pending | SlotStatus::Streaming) {
                slot.fail("dispatch aborted".to_string());
            }
        }
    }
}

//! Scripted completion service for exercising streaming without a network.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use bytes::Bytes;
use futures::stream::{self, StreamExt};

use crate::client::{ByteStream, CompletionService};
use crate::errors::{ChatError, ChatResult};
use crate::fanout::TranscriptObserver;
use crate::transcript::{Slot, SlotHandle};
use crate::types::{ChatMessage, ContentPart, MessageContent, MessageHistory};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Chunk { delay_ms: u64, bytes: Vec<u8> },
    Fail { delay_ms: u64, message: String },
    Stall,
}

/// What one slot's request answers with
#[derive(Debug, Clone, Default)]
pub(crate) struct Script {
    status: Option<u16>,
    steps: Vec<Step>,
}

impl Script {
    pub(crate) fn chunks(chunks: &[(u64, &str)]) -> Self {
        Self {
            status: None,
            steps: chunks
                .iter()
                .map(|(delay_ms, text)| Step::Chunk {
                    delay_ms: *delay_ms,
                    bytes: text.as_bytes().to_vec(),
                })
                .collect(),
        }
    }

    pub(crate) fn status(code: u16) -> Self {
        Self {
            status: Some(code),
            steps: Vec::new(),
        }
    }

    pub(crate) fn then_fail(mut self, delay_ms: u64, message: &str) -> Self {
        self.steps.push(Step::Fail {
            delay_ms,
            message: message.to_string(),
        });
        self
    }

    pub(crate) fn then_stall(mut self) -> Self {
        self.steps.push(Step::Stall);
        self
    }
}

/// Counts drops of the body stream it is moved into.
struct ReleaseGuard(Arc<AtomicUsize>);

impl Drop for ReleaseGuard {
    fn drop(&mut self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }
}

/// Answers each request with the script of the slot whose image it carries.
///
/// Test images are single bytes holding the slot index.
#[derive(Debug, Default)]
pub(crate) struct ScriptedService {
    scripts: Vec<Script>,
    pub(crate) requests: Mutex<Vec<MessageHistory>>,
    pub(crate) released: Arc<AtomicUsize>,
}

impl ScriptedService {
    pub(crate) fn new(scripts: Vec<Script>) -> Self {
        Self {
            scripts,
            ..Self::default()
        }
    }

    pub(crate) fn recorded(&self) -> Vec<MessageHistory> {
        self.requests.lock().unwrap().clone()
    }
}

pub(crate) fn slot_of(history: &[ChatMessage]) -> Option<usize> {
    history.iter().find_map(|message| match &message.content {
        MessageContent::Parts(parts) => parts.iter().find_map(|part| match part {
            ContentPart::Image { image, .. } => BASE64
                .decode(image)
                .ok()
                .and_then(|bytes| bytes.first().map(|b| *b as usize)),
        }),
        MessageContent::Text(_) => None,
    })
}

#[async_trait]
impl CompletionService for ScriptedService {
    async fn open_stream(&self, history: &[ChatMessage]) -> ChatResult<ByteStream> {
        self.requests.lock().unwrap().push(history.to_vec());

        let slot = slot_of(history).unwrap_or(0);
        let script = self.scripts.get(slot).cloned().unwrap_or_default();
        if let Some(status_code) = script.status {
            return Err(ChatError::Status {
                status_code,
                message: "scripted failure".to_string(),
            });
        }

        let guard = ReleaseGuard(self.released.clone());
        Ok(stream::iter(script.steps)
            .then(|step| async move {
                match step {
                    Step::Chunk { delay_ms, bytes } => {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        Ok(Bytes::from(bytes))
                    }
                    Step::Fail { delay_ms, message } => {
                        tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                        Err(ChatError::Transport(message))
                    }
                    Step::Stall => futures::future::pending().await,
                }
            })
            .map(move |chunk| {
                let _held = &guard;
                chunk
            })
            .boxed())
    }
}

/// Records every update and settlement it sees
#[derive(Debug, Default)]
pub(crate) struct RecordingObserver {
    pub(crate) updates: Mutex<Vec<(usize, String)>>,
    pub(crate) settled: Mutex<Vec<(usize, Slot)>>,
}

impl RecordingObserver {
    pub(crate) fn updates_for(&self, slot: usize) -> Vec<String> {
        self.updates
            .lock()
            .unwrap()
            .iter()
            .filter(|(index, _)| *index == slot)
            .map(|(_, text)| text.clone())
            .collect()
    }
}

impl TranscriptObserver for RecordingObserver {
    fn on_slot_update(&self, handle: SlotHandle, text: &str) {
        self.updates
            .lock()
            .unwrap()
            .push((handle.index, text.to_string()));
    }

    fn on_slot_settled(&self, handle: SlotHandle, slot: &Slot) {
        self.settled.lock().unwrap().push((handle.index, slot.clone()));
    }
}

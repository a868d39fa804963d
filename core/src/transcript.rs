//! In-memory transcript of one batch conversation.
//!
//! A [`Conversation`] is created from the images the user picked and then grows by one
//! question/answer pair per question. Turns are never removed. Every assistant turn holds
//! exactly `image_count` slots, one answer per image.

use std::fmt;

use chrono::{DateTime, Utc};
use tracing::debug;
use uuid::Uuid;

use crate::errors::{ChatError, ChatResult};
use crate::types::{ImageData, MAX_IMAGES};

/// Stable identifier of a turn, assigned at append time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TurnId(Uuid);

impl TurnId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for TurnId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Addresses one answer slot of one assistant turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotHandle {
    pub turn: TurnId,
    pub index: usize,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SlotStatus {
    Pending,
    Streaming,
    Complete,
    Failed { reason: String },
}

/// One image's answer within an assistant turn
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Slot {
    text: String,
    status: SlotStatus,
}

impl Slot {
    fn pending() -> Self {
        Self {
            text: String::new(),
            status: SlotStatus::Pending,
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn status(&self) -> &SlotStatus {
        &self.status
    }

    pub fn is_failed(&self) -> bool {
        matches!(self.status, SlotStatus::Failed { .. })
    }

    pub(crate) fn begin(&mut self) {
        self.status = SlotStatus::Streaming;
    }

    /// Replaces the text with a longer cumulative answer.
    ///
    /// Updates for one slot must only ever extend the text already stored.
    pub(crate) fn apply_update(&mut self, cumulative: &str) -> ChatResult<()> {
        if !cumulative.starts_with(self.text.as_str()) {
            return Err(ChatError::InvariantViolation(format!(
                "update of {} bytes does not extend the {} bytes already stored",
                cumulative.len(),
                self.text.len()
            )));
        }
        self.text.clear();
        self.text.push_str(cumulative);
        Ok(())
    }

    pub(crate) fn complete(&mut self) {
        self.status = SlotStatus::Complete;
    }

    pub(crate) fn fail(&mut self, reason: String) {
        self.status = SlotStatus::Failed { reason };
    }
}

/// Placeholder that is filled in place while answers stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssistantTurn {
    slots: Vec<Slot>,
}

impl AssistantTurn {
    fn with_slots(count: usize) -> Self {
        Self {
            slots: (0..count).map(|_| Slot::pending()).collect(),
        }
    }

    pub fn slots(&self) -> &[Slot] {
        &self.slots
    }

    pub fn texts(&self) -> Vec<&str> {
        self.slots.iter().map(Slot::text).collect()
    }

    pub fn slot_text(&self, index: usize) -> Option<&str> {
        self.slots.get(index).map(Slot::text)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UserTurn {
    /// Opening turn carrying one image per slot
    Images(Vec<ImageData>),
    Question(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnBody {
    User(UserTurn),
    Assistant(AssistantTurn),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Turn {
    pub id: TurnId,
    pub created_at: DateTime<Utc>,
    pub body: TurnBody,
}

impl Turn {
    fn new(body: TurnBody) -> Self {
        Self {
            id: TurnId::new(),
            created_at: Utc::now(),
            body,
        }
    }

    pub fn as_assistant(&self) -> Option<&AssistantTurn> {
        match &self.body {
            TurnBody::Assistant(turn) => Some(turn),
            TurnBody::User(_) => None,
        }
    }
}

/// Ordered conversation over a fixed set of images
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conversation {
    image_count: usize,
    turns: Vec<Turn>,
}

impl Conversation {
    /// Starts a conversation from 1 to [`MAX_IMAGES`] images.
    pub fn new(images: Vec<ImageData>) -> ChatResult<Self> {
        if images.is_empty() || images.len() > MAX_IMAGES {
            return Err(ChatError::InvalidConversation(format!(
                "expected between 1 and {} images, got {}",
                MAX_IMAGES,
                images.len()
            )));
        }

        Ok(Self {
            image_count: images.len(),
            turns: vec![Turn::new(TurnBody::User(UserTurn::Images(images)))],
        })
    }

    pub fn image_count(&self) -> usize {
        self.image_count
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    /// Appends a question and an empty answer placeholder.
    ///
    /// Returns the placeholder's id, or `None` when the question is blank and nothing
    /// was appended.
    pub fn append_question(&mut self, question: &str) -> Option<TurnId> {
        if question.trim().is_empty() {
            debug!("Ignoring blank question");
            return None;
        }

        self.turns
            .push(Turn::new(TurnBody::User(UserTurn::Question(question.to_string()))));
        let placeholder = Turn::new(TurnBody::Assistant(AssistantTurn::with_slots(
            self.image_count,
        )));
        let id = placeholder.id;
        self.turns.push(placeholder);
        Some(id)
    }

    pub(crate) fn position(&self, id: TurnId) -> Option<usize> {
        self.turns.iter().position(|turn| turn.id == id)
    }

    pub fn turn(&self, id: TurnId) -> Option<&Turn> {
        self.turns.iter().find(|turn| turn.id == id)
    }

    pub fn assistant_turn(&self, id: TurnId) -> Option<&AssistantTurn> {
        self.turn(id).and_then(Turn::as_assistant)
    }

    pub fn last_assistant_turn(&self) -> Option<&AssistantTurn> {
        self.turns.iter().rev().find_map(Turn::as_assistant)
    }

    /// Exclusive access to the slots of one assistant turn.
    pub(crate) fn assistant_slots_mut(&mut self, id: TurnId) -> ChatResult<&mut [Slot]> {
        let image_count = self.image_count;
        let turn = self
            .turns
            .iter_mut()
            .find(|turn| turn.id == id)
            .ok_or_else(|| ChatError::InvariantViolation(format!("turn {} not found", id)))?;

        let assistant = match &mut turn.body {
            TurnBody::Assistant(assistant) => assistant,
            TurnBody::User(_) => {
                return Err(ChatError::InvariantViolation(format!(
                    "turn {} is not an assistant placeholder",
                    id
                )))
            }
        };
        if assistant.slots.len() != image_count {
            return Err(ChatError::InvariantViolation(format!(
                "turn {} has {} slots, expected {}",
                id,
                assistant.slots.len(),
                image_count
            )));
        }
        Ok(&mut assistant.slots)
    }
}

//! Builds one message history per image slot from a [`Conversation`].

use crate::errors::{ChatError, ChatResult};
use crate::transcript::{Conversation, Turn, TurnBody, TurnId, UserTurn};
use crate::types::{ChatMessage, MessageHistory};

/// Projects every turn of the conversation, one history per slot.
pub fn project(conversation: &Conversation) -> Vec<MessageHistory> {
    project_turns(conversation.turns(), conversation.image_count())
}

/// Projects the turns preceding `turn`, the history used to fill that placeholder.
pub fn project_before(conversation: &Conversation, turn: TurnId) -> ChatResult<Vec<MessageHistory>> {
    let end = conversation
        .position(turn)
        .ok_or_else(|| ChatError::InvariantViolation(format!("turn {} not found", turn)))?;
    Ok(project_turns(&conversation.turns()[..end], conversation.image_count()))
}

fn project_turns(turns: &[Turn], image_count: usize) -> Vec<MessageHistory> {
    (0..image_count)
        .map(|slot| turns.iter().filter_map(|turn| project_turn(turn, slot)).collect())
        .collect()
}

fn project_turn(turn: &Turn, slot: usize) -> Option<ChatMessage> {
    match &turn.body {
        TurnBody::User(UserTurn::Images(images)) => images.get(slot).map(ChatMessage::user_image),
        TurnBody::User(UserTurn::Question(question)) => Some(ChatMessage::user(question.as_str())),
        // Unfinished slots project whatever text they hold right now.
        TurnBody::Assistant(assistant) => assistant.slot_text(slot).map(ChatMessage::assistant),
    }
}

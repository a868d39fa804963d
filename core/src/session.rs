use chrono::{DateTime, Utc};
use tokio_util::sync::CancellationToken;
use tracing::info;
use uuid::Uuid;

use crate::client::CompletionService;
use crate::errors::{ChatError, ChatResult};
use crate::fanout::{FanoutOrchestrator, TranscriptObserver};
use crate::transcript::{Conversation, TurnId};
use crate::types::ImageData;

/// One user session: owns the conversation and the orchestrator that fills it.
///
/// Questions go through `&mut self`, so a new question can only be appended once the
/// previous dispatch has settled.
#[derive(Debug)]
pub struct ChatSession<S> {
    /// Unique session identifier
    pub id: String,
    /// When the session was created
    pub created_at: DateTime<Utc>,
    conversation: Option<Conversation>,
    orchestrator: FanoutOrchestrator<S>,
}

impl<S: CompletionService> ChatSession<S> {
    pub fn new(orchestrator: FanoutOrchestrator<S>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: Utc::now(),
            conversation: None,
            orchestrator,
        }
    }

    /// Finalizes image selection and opens the conversation.
    pub fn start(&mut self, images: Vec<ImageData>) -> ChatResult<()> {
        if self.conversation.is_some() {
            return Err(ChatError::InvalidConversation(
                "images were already selected for this session".to_string(),
            ));
        }

        let conversation = Conversation::new(images)?;
        info!(
            session = %self.id,
            images = conversation.image_count(),
            "Conversation started"
        );
        self.conversation = Some(conversation);
        Ok(())
    }

    pub fn conversation(&self) -> Option<&Conversation> {
        self.conversation.as_ref()
    }

    pub fn orchestrator(&self) -> &FanoutOrchestrator<S> {
        &self.orchestrator
    }

    /// Asks one question about every image.
    ///
    /// A blank question appends nothing and returns `Ok(None)`. On failure the appended
    /// turns stay in place with whatever text had streamed.
    pub async fn ask(
        &mut self,
        question: &str,
        observer: &dyn TranscriptObserver,
        cancel: &CancellationToken,
    ) -> ChatResult<Option<TurnId>> {
        let conversation = self.conversation.as_mut().ok_or_else(|| {
            ChatError::InvalidConversation("no images have been selected yet".to_string())
        })?;

        let Some(turn) = conversation.append_question(question) else {
            return Ok(None);
        };

        self.orchestrator
            .dispatch_with_cancel(conversation, turn, observer, cancel)
            .await?;
        Ok(Some(turn))
    }
}

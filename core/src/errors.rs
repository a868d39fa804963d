use std::time::Duration;

use thiserror::Error;

/// Batch chat errors
#[derive(Error, Debug)]
pub enum ChatError {
    /// Network or connection failure while opening or reading a stream
    #[error("Transport Error: {0}")]
    Transport(String),

    /// Malformed or unexpected frame content
    #[error("Protocol Error: {0}")]
    Protocol(String),

    /// Non-success response status from the completion service
    #[error("HTTP Error: {status_code} - {message}")]
    Status { status_code: u16, message: String },

    /// Internal bug; aborts the current dispatch
    #[error("Invariant Violation: {0}")]
    InvariantViolation(String),

    #[error("Request timed out after {0:?}")]
    Timeout(Duration),

    #[error("Request cancelled")]
    Cancelled,

    #[error("Invalid Conversation: {0}")]
    InvalidConversation(String),

    #[error("Configuration Error: {0}")]
    ConfigError(String),

    /// A failure attributed to one image slot of a fanout dispatch
    #[error("Slot {slot} failed: {source}")]
    Slot {
        slot: usize,
        #[source]
        source: Box<ChatError>,
    },

    #[error(transparent)]
    SerdeError(#[from] serde_json::Error),

    #[error(transparent)]
    IoError(#[from] std::io::Error),
}

impl ChatError {
    pub(crate) fn in_slot(slot: usize, error: ChatError) -> Self {
        ChatError::Slot {
            slot,
            source: Box::new(error),
        }
    }

    /// Returns the underlying error, looking through slot attribution.
    pub fn root(&self) -> &ChatError {
        match self {
            ChatError::Slot { source, .. } => source.root(),
            other => other,
        }
    }

    /// The slot this error was attributed to, if any.
    pub fn slot(&self) -> Option<usize> {
        match self {
            ChatError::Slot { slot, .. } => Some(*slot),
            _ => None,
        }
    }

    pub fn is_invariant_violation(&self) -> bool {
        matches!(self.root(), ChatError::InvariantViolation(_))
    }
}

/// Result type for batch chat operations
pub type ChatResult<T> = Result<T, ChatError>;

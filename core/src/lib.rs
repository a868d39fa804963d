// Core batch chat functionality:
// - Conversation transcript over a fixed set of images
// - Per-image message projection
// - Streaming completion client and wire frame decoding
// - Concurrent fanout of one question to every image
// - Configuration loading and shared error types

// Export transcript module - Conversation, turns and answer slots
pub mod transcript;
pub use transcript::{
    AssistantTurn, Conversation, Slot, SlotHandle, SlotStatus, Turn, TurnBody, TurnId, UserTurn,
};

// Export projector module - One message history per image slot
pub mod projector;

// Export frame module - Newline-delimited data stream decoding
pub mod frame;

// Export client module - Completion service seam and stream client
pub mod client;
pub use client::{ByteStream, CompletionService, CompletionStreamClient, HttpCompletionService};

// Export fanout module - Concurrent per-slot dispatch
pub mod fanout;
pub use fanout::{FanoutOrchestrator, NoopObserver, TranscriptObserver};

// Export session module - Session context owning the conversation
pub mod session;
pub use session::ChatSession;

// Export types module - Request/message data structures
pub mod types;
pub use types::*;

// Export config module - Configuration loading
pub mod config;
pub use config::*;

// Export errors module - Shared error types
pub mod errors;
pub use errors::*;

// Re-exported so callers can cancel a dispatch without depending on tokio-util
pub use tokio_util::sync::CancellationToken;

#[cfg(test)]
mod testing;

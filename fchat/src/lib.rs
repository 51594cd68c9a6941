//! Conversation orchestration over the resilient completion client.
//!
//! A [`ChatOrchestrator`] owns one [`ConversationState`]. Each
//! [`send_message`](ChatOrchestrator::send_message) appends the user's message
//! optimistically, asks the rate limiter for admission, sends the capped
//! history, and records either the assistant reply or a user-facing error.
//! Every change to the message list is written through to a
//! [`ConversationStore`] as a full replacement.

mod attachment;
mod error;
mod service;
mod store;
mod types;

pub mod prelude {
    pub use crate::{
        Attachment, ChatError, ChatErrorKind, ChatMessage, ChatOrchestrator,
        ChatOrchestratorBuilder, ChatRole, ChatSettings, ConversationState, ConversationStore,
        InMemoryConversationStore, PromptStyle, TurnOutcome,
    };
}

pub use attachment::{ALLOWED_IMAGE_TYPES, Attachment, MAX_ATTACHMENT_BYTES};
pub use error::{ChatError, ChatErrorKind};
pub use service::{ChatOrchestrator, ChatOrchestratorBuilder};
pub use store::{ConversationStore, InMemoryConversationStore};
pub use types::{
    ChatMessage, ChatRole, ChatSettings, ConversationState, DEFAULT_MAX_MESSAGES, PromptStyle,
    TurnOutcome,
};

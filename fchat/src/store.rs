//! Conversation storage contract and a basic in-memory implementation.
//!
//! Stores hold one conversation and are always written with the complete
//! message list; there is no append or delta operation.

use std::sync::Mutex;

use fcommon::BoxFuture;

use crate::{ChatError, ChatMessage};

pub trait ConversationStore: Send + Sync {
    fn load_messages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>>;

    fn save_messages<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<(), ChatError>>;
}

#[derive(Debug, Default)]
pub struct InMemoryConversationStore {
    messages: Mutex<Vec<ChatMessage>>,
}

impl InMemoryConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_messages(messages: Vec<ChatMessage>) -> Self {
        Self {
            messages: Mutex::new(messages),
        }
    }
}

impl ConversationStore for InMemoryConversationStore {
    fn load_messages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move {
            let messages = self
                .messages
                .lock()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            Ok(messages.clone())
        })
    }

    fn save_messages<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            let mut stored = self
                .messages
                .lock()
                .map_err(|_| ChatError::store("conversation store lock poisoned"))?;

            *stored = messages.to_vec();
            Ok(())
        })
    }
}

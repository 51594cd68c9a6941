//! Adapter that exposes `ChatStorage` as an fchat `ConversationStore`.

use fchat::{ChatError, ChatMessage, ConversationStore};
use fcommon::BoxFuture;

use crate::storage::ChatStorage;

impl ConversationStore for ChatStorage {
    fn load_messages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async move { self.get_messages().await.map_err(ChatError::from) })
    }

    fn save_messages<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async move {
            ChatStorage::save_messages(self, messages)
                .await
                .map_err(ChatError::from)
        })
    }
}

//! Typed access to the chat's persisted keys.
//!
//! Every value is a whole JSON blob. A value that no longer parses is treated
//! as absent: the read logs a warning and yields the default.

use std::sync::Arc;

use fchat::ChatMessage;
use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::backend::KeyValueStore;
use crate::error::MemoryError;
use crate::types::{
    ACCESSIBILITY_KEY, AccessibilitySettings, MAX_STORED_MESSAGES, MESSAGES_KEY, THEME_KEY,
    ThemePreference,
};

#[derive(Clone)]
pub struct ChatStorage {
    store: Arc<dyn KeyValueStore>,
    max_messages: usize,
}

impl ChatStorage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            max_messages: MAX_STORED_MESSAGES,
        }
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    pub fn store(&self) -> Arc<dyn KeyValueStore> {
        Arc::clone(&self.store)
    }

    pub async fn get_messages(&self) -> Result<Vec<ChatMessage>, MemoryError> {
        self.read_or_default(MESSAGES_KEY).await
    }

    /// Keeps only the newest `max_messages` entries.
    pub async fn save_messages(&self, messages: &[ChatMessage]) -> Result<(), MemoryError> {
        let start = messages.len().saturating_sub(self.max_messages);
        self.write(MESSAGES_KEY, &messages[start..]).await
    }

    pub async fn clear_messages(&self) -> Result<(), MemoryError> {
        self.store.remove(MESSAGES_KEY).await
    }

    pub async fn get_theme(&self) -> Result<ThemePreference, MemoryError> {
        self.read_or_default(THEME_KEY).await
    }

    pub async fn set_theme(&self, theme: ThemePreference) -> Result<(), MemoryError> {
        self.write(THEME_KEY, &theme).await
    }

    pub async fn get_accessibility_settings(&self) -> Result<AccessibilitySettings, MemoryError> {
        self.read_or_default(ACCESSIBILITY_KEY).await
    }

    pub async fn set_accessibility_settings(
        &self,
        settings: &AccessibilitySettings,
    ) -> Result<(), MemoryError> {
        self.write(ACCESSIBILITY_KEY, settings).await
    }

    async fn read_or_default<T>(&self, key: &str) -> Result<T, MemoryError>
    where
        T: DeserializeOwned + Default,
    {
        let Some(raw) = self.store.get(key).await? else {
            return Ok(T::default());
        };

        match serde_json::from_str::<T>(&raw) {
            Ok(value) => Ok(value),
            Err(error) => {
                tracing::warn!(key, %error, "stored value is unreadable, using default");
                Ok(T::default())
            }
        }
    }

    async fn write<T>(&self, key: &str, value: &T) -> Result<(), MemoryError>
    where
        T: Serialize + ?Sized,
    {
        let raw = serde_json::to_string(value).map_err(|error| {
            MemoryError::serialization(format!("failed to serialize '{key}': {error}"))
        })?;
        self.store.set(key, raw).await
    }
}

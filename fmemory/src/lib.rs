//! Key-value persistence for chat history and user preferences.
//!
//! ```rust
//! use std::sync::Arc;
//!
//! use fchat::ChatMessage;
//! use fmemory::{ChatStorage, InMemoryKeyValueStore, ThemePreference};
//!
//! # tokio::runtime::Builder::new_current_thread().build().unwrap().block_on(async {
//! let storage = ChatStorage::new(Arc::new(InMemoryKeyValueStore::new()));
//! storage.save_messages(&[ChatMessage::user("hello")]).await.unwrap();
//!
//! assert_eq!(storage.get_messages().await.unwrap().len(), 1);
//! assert_eq!(storage.get_theme().await.unwrap(), ThemePreference::System);
//! # });
//! ```

mod adapter;
mod backend;
mod backends;
mod error;
mod storage;
mod types;

pub mod prelude {
    pub use crate::{
        AccessibilitySettings, ChatStorage, FilesystemKeyValueStore, FontSize,
        InMemoryKeyValueStore, KeyValueStore, MemoryError, MemoryErrorKind, SqliteKeyValueStore,
        StorageBackendConfig, ThemePreference, create_default_key_value_store,
        create_key_value_store,
    };
}

pub use backend::{
    FilesystemKeyValueStore, InMemoryKeyValueStore, KeyValueStore, SqliteKeyValueStore,
    StorageBackendConfig, create_default_key_value_store, create_key_value_store,
};
pub use error::{MemoryError, MemoryErrorKind};
pub use storage::ChatStorage;
pub use types::{
    ACCESSIBILITY_KEY, AccessibilitySettings, FontSize, MAX_STORED_MESSAGES, MESSAGES_KEY,
    THEME_KEY, ThemePreference,
};

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use fchat::{ChatMessage, ConversationStore, PromptStyle};
    use fprovider::Source;

    use crate::{
        AccessibilitySettings, ChatStorage, FilesystemKeyValueStore, FontSize,
        InMemoryKeyValueStore, KeyValueStore, MemoryErrorKind, SqliteKeyValueStore,
        StorageBackendConfig, ThemePreference, create_key_value_store,
    };

    fn temp_dir(prefix: &str) -> std::path::PathBuf {
        let unique = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("clock should be after unix epoch")
            .as_nanos();
        std::env::temp_dir().join(format!("fmemory-{prefix}-{unique}"))
    }

    fn conversation() -> Vec<ChatMessage> {
        vec![
            ChatMessage::user("what is a borrow checker?"),
            ChatMessage::assistant("It enforces aliasing rules at compile time.").with_sources(
                vec![Source {
                    title: "The Rust Book".to_string(),
                    url: Some("https://doc.rust-lang.org/book/".to_string()),
                    domain: Some("doc.rust-lang.org".to_string()),
                }],
            ),
        ]
    }

    async fn exercise_store(store: Arc<dyn KeyValueStore>) {
        assert_eq!(store.get("missing").await.expect("get should work"), None);

        store
            .set("k", "\"one\"".to_string())
            .await
            .expect("set should work");
        store
            .set("k", "\"two\"".to_string())
            .await
            .expect("overwrite should work");
        assert_eq!(
            store.get("k").await.expect("get should work").as_deref(),
            Some("\"two\"")
        );

        store.remove("k").await.expect("remove should work");
        store.remove("k").await.expect("second remove is a no-op");
        assert_eq!(store.get("k").await.expect("get should work"), None);
    }

    #[tokio::test]
    async fn in_memory_store_gets_sets_and_removes() {
        exercise_store(Arc::new(InMemoryKeyValueStore::new())).await;
    }

    #[tokio::test]
    async fn sqlite_store_gets_sets_and_removes() {
        let store = SqliteKeyValueStore::new_in_memory().expect("sqlite store should open");
        exercise_store(Arc::new(store)).await;
    }

    #[tokio::test]
    async fn filesystem_store_gets_sets_and_removes() {
        let root = temp_dir("filesystem");
        let store = FilesystemKeyValueStore::new(&root).expect("fs store should open");
        exercise_store(Arc::new(store)).await;

        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }

    #[tokio::test]
    async fn sqlite_file_survives_reopen() {
        let root = temp_dir("sqlite");
        let path = root.join("nested").join("storage.sqlite3");

        {
            let store = SqliteKeyValueStore::new(&path).expect("sqlite store should open");
            let storage = ChatStorage::new(Arc::new(store));
            storage
                .save_messages(&conversation())
                .await
                .expect("save should work");
        }

        let reopened = SqliteKeyValueStore::new(&path).expect("sqlite store should reopen");
        let storage = ChatStorage::new(Arc::new(reopened));
        assert_eq!(
            storage.get_messages().await.expect("load should work"),
            conversation()
        );

        std::fs::remove_dir_all(&root).expect("temporary directory should be removable");
    }

    #[tokio::test]
    async fn messages_round_trip_with_sources() {
        let storage = ChatStorage::new(Arc::new(InMemoryKeyValueStore::new()));

        storage
            .save_messages(&conversation())
            .await
            .expect("save should work");
        assert_eq!(
            storage.get_messages().await.expect("load should work"),
            conversation()
        );

        let raw = storage
            .store()
            .get(crate::MESSAGES_KEY)
            .await
            .expect("raw get")
            .expect("raw value");
        let value: serde_json::Value = serde_json::from_str(&raw).expect("stored JSON");
        assert_eq!(value[0]["role"], "user");
        assert!(value[0].get("sources").is_none());
        assert_eq!(value[1]["sources"][0]["title"], "The Rust Book");
    }

    #[tokio::test]
    async fn save_keeps_newest_fifty_messages() {
        let storage = ChatStorage::new(Arc::new(InMemoryKeyValueStore::new()));
        let messages = (0..60)
            .map(|index| ChatMessage::user(format!("m{index}")))
            .collect::<Vec<_>>();

        storage
            .save_messages(&messages)
            .await
            .expect("save should work");
        let loaded = storage.get_messages().await.expect("load should work");

        assert_eq!(loaded.len(), 50);
        assert_eq!(loaded[0].content, "m10");
        assert_eq!(loaded[49].content, "m59");
    }

    #[tokio::test]
    async fn unreadable_values_fall_back_to_defaults() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store
            .set(crate::MESSAGES_KEY, "{not json".to_string())
            .await
            .expect("set");
        store
            .set(crate::THEME_KEY, "\"sepia\"".to_string())
            .await
            .expect("set");
        store
            .set(crate::ACCESSIBILITY_KEY, "{\"fontSize\":\"huge\"}".to_string())
            .await
            .expect("set");
        let storage = ChatStorage::new(store);

        assert!(storage.get_messages().await.expect("load").is_empty());
        assert_eq!(
            storage.get_theme().await.expect("load"),
            ThemePreference::System
        );
        assert_eq!(
            storage.get_accessibility_settings().await.expect("load"),
            AccessibilitySettings::default()
        );
    }

    #[tokio::test]
    async fn preferences_round_trip_in_camel_case() {
        let storage = ChatStorage::new(Arc::new(InMemoryKeyValueStore::new()));
        let settings = AccessibilitySettings {
            reduced_motion: true,
            high_contrast: false,
            font_size: FontSize::Larger,
            prompt_style: PromptStyle::Creative,
        };

        storage
            .set_accessibility_settings(&settings)
            .await
            .expect("save should work");
        storage
            .set_theme(ThemePreference::Dark)
            .await
            .expect("save should work");

        assert_eq!(
            storage.get_accessibility_settings().await.expect("load"),
            settings
        );
        assert_eq!(storage.get_theme().await.expect("load"), ThemePreference::Dark);

        let raw = storage
            .store()
            .get(crate::ACCESSIBILITY_KEY)
            .await
            .expect("raw get")
            .expect("raw value");
        assert!(raw.contains("\"reducedMotion\":true"), "{raw}");
        assert!(raw.contains("\"promptStyle\":\"creative\""), "{raw}");
    }

    #[tokio::test]
    async fn partial_accessibility_object_fills_defaults() {
        let store = Arc::new(InMemoryKeyValueStore::new());
        store
            .set(crate::ACCESSIBILITY_KEY, "{\"highContrast\":true}".to_string())
            .await
            .expect("set");
        let storage = ChatStorage::new(store);

        let settings = storage.get_accessibility_settings().await.expect("load");
        assert!(settings.high_contrast);
        assert_eq!(settings.font_size, FontSize::Normal);
        assert_eq!(settings.prompt_style, PromptStyle::Balanced);
    }

    #[tokio::test]
    async fn conversation_store_adapter_replaces_whole_history() {
        let storage = ChatStorage::new(Arc::new(InMemoryKeyValueStore::new()));
        let store: &dyn ConversationStore = &storage;

        store
            .save_messages(&conversation())
            .await
            .expect("save should work");
        store
            .save_messages(&[ChatMessage::user("fresh start")])
            .await
            .expect("replace should work");

        let loaded = store.load_messages().await.expect("load should work");
        assert_eq!(loaded, vec![ChatMessage::user("fresh start")]);

        storage.clear_messages().await.expect("clear should work");
        assert!(store.load_messages().await.expect("load").is_empty());
    }

    #[test]
    fn backend_config_parses_storage_urls() {
        assert_eq!(
            StorageBackendConfig::parse("memory").expect("memory"),
            StorageBackendConfig::InMemory
        );
        assert_eq!(
            StorageBackendConfig::parse("fs:/tmp/webchat").expect("fs"),
            StorageBackendConfig::Filesystem {
                root: "/tmp/webchat".into()
            }
        );
        assert_eq!(
            StorageBackendConfig::parse("sqlite:chat.db").expect("sqlite"),
            StorageBackendConfig::Sqlite {
                path: "chat.db".into()
            }
        );

        let error = StorageBackendConfig::parse("redis://x").expect_err("unknown backend");
        assert_eq!(error.kind, MemoryErrorKind::InvalidRequest);
        assert!(StorageBackendConfig::parse("fs:").is_err());
    }

    #[tokio::test]
    async fn factory_builds_in_memory_store() {
        let store = create_key_value_store(StorageBackendConfig::InMemory)
            .expect("factory should build");
        exercise_store(store).await;
    }
}

//! Unified facade over the webchat workspace crates.
//!
//! This crate is the single dependency for most applications. It re-exports the
//! limiter, resilient client, orchestrator, logger, and storage crates, and
//! provides the configuration and wiring that assemble them into one runtime.
//!
//! ```rust
//! use webchat::{AppConfig, StorageBackendConfig};
//!
//! let config = AppConfig::default().with_storage(StorageBackendConfig::InMemory);
//! config.validate().expect("defaults should be valid");
//! ```

mod config;
mod logging;

pub mod prelude;
pub mod runtime;

pub use fchat;
pub use fcommon;
pub use flimit;
pub use fmemory;
pub use fobserve;
pub use fprovider;

pub use fchat::{
    ALLOWED_IMAGE_TYPES, Attachment, ChatError, ChatErrorKind, ChatMessage, ChatOrchestrator,
    ChatOrchestratorBuilder, ChatRole, ChatSettings, ConversationState, ConversationStore,
    DEFAULT_MAX_MESSAGES, InMemoryConversationStore, MAX_ATTACHMENT_BYTES, PromptStyle,
    TurnOutcome,
};
pub use fcommon::{BoxFuture, Clock, CorrelationId, ManualClock, SystemClock};
pub use flimit::{RateLimitConfig, RateLimiter, RateWindowSnapshot};
pub use fmemory::{
    AccessibilitySettings, ChatStorage, FilesystemKeyValueStore, FontSize,
    InMemoryKeyValueStore, KeyValueStore, MemoryError, MemoryErrorKind, SqliteKeyValueStore,
    StorageBackendConfig, ThemePreference, create_default_key_value_store,
    create_key_value_store,
};
pub use fobserve::{DEFAULT_LOG_CAPACITY, LogEntry, LogLevel, Logger};
#[cfg(feature = "http-transport")]
pub use fprovider::HttpCompletionTransport;
pub use fprovider::{
    ApiMetrics, CompletionRequest, CompletionTransport, GenerationParams, MetricsOperationHooks,
    MetricsThresholds, NoopOperationHooks, ProviderError, ProviderErrorKind,
    ProviderOperationHooks, REQUEST_ID_HEADER, ResilientClient, ResilientClientBuilder,
    RetryPolicy, SafeOperationHooks, SecretString, Sleeper, Source, TokioSleeper,
    TransportResponse,
};

pub use config::{
    AppConfig, ConfigError, ConfigErrorKind, DEFAULT_ENDPOINT, ENV_API_KEY, ENV_ENDPOINT,
    ENV_LOG_CAPACITY, ENV_MAX_RETRIES, ENV_MODEL, ENV_PROMPT_STYLE, ENV_RATE_LIMIT_PER_MINUTE,
    ENV_STORAGE, MIN_API_KEY_LEN,
};
pub use logging::init_logging;
#[cfg(feature = "http-transport")]
pub use runtime::{build_runtime, http_transport};
pub use runtime::{RuntimeBundle, build_runtime_with};

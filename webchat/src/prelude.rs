//! Common imports for most webchat applications.

#[cfg(feature = "http-transport")]
pub use crate::build_runtime;
pub use crate::{AppConfig, ConfigError, RuntimeBundle, build_runtime_with, init_logging};
pub use crate::{
    Attachment, ChatError, ChatMessage, ChatOrchestrator, ChatRole, ChatSettings, ChatStorage,
    CompletionTransport, ConversationState, ConversationStore, Logger, PromptStyle,
    ProviderError, RateLimitConfig, RateLimiter, ResilientClient, RetryPolicy,
    StorageBackendConfig, TurnOutcome,
};

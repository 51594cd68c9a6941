//! Turn orchestration: admission, request assembly, resolution, persistence.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use flimit::RateLimiter;
use fobserve::Logger;
use fprovider::{
    CompletionRequest, ProviderError, ProviderErrorKind, RequestMessage, RequestRole,
    ResilientClient,
};
use serde_json::json;

use crate::{
    Attachment, ChatError, ChatErrorKind, ChatMessage, ChatRole, ChatSettings, ConversationState,
    ConversationStore, InMemoryConversationStore, TurnOutcome,
};

/// Owns one conversation and drives each turn through
/// `Idle → Admitting → InFlight → {Resolved, Failed}`.
pub struct ChatOrchestrator {
    client: Arc<ResilientClient>,
    limiter: Arc<RateLimiter>,
    store: Arc<dyn ConversationStore>,
    logger: Arc<Logger>,
    settings: ChatSettings,
    inner: Mutex<Inner>,
}

#[derive(Default)]
struct Inner {
    state: ConversationState,
    /// Held from the user append until the turn resolves, so overlapping
    /// sends are refused even before `is_loading` flips.
    turn_active: bool,
}

pub struct ChatOrchestratorBuilder {
    client: Arc<ResilientClient>,
    limiter: Arc<RateLimiter>,
    logger: Arc<Logger>,
    store: Arc<dyn ConversationStore>,
    settings: ChatSettings,
}

impl ChatOrchestratorBuilder {
    pub fn with_store(mut self, store: Arc<dyn ConversationStore>) -> Self {
        self.store = store;
        self
    }

    pub fn with_settings(mut self, settings: ChatSettings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> ChatOrchestrator {
        ChatOrchestrator {
            client: self.client,
            limiter: self.limiter,
            store: self.store,
            logger: self.logger,
            settings: self.settings,
            inner: Mutex::new(Inner::default()),
        }
    }
}

impl ChatOrchestrator {
    pub fn builder(
        client: Arc<ResilientClient>,
        limiter: Arc<RateLimiter>,
        logger: Arc<Logger>,
    ) -> ChatOrchestratorBuilder {
        ChatOrchestratorBuilder {
            client,
            limiter,
            logger,
            store: Arc::new(InMemoryConversationStore::new()),
            settings: ChatSettings::default(),
        }
    }

    pub fn settings(&self) -> &ChatSettings {
        &self.settings
    }

    pub fn state(&self) -> ConversationState {
        self.lock().state.clone()
    }

    /// Replaces the in-memory history with what the store holds, capped.
    pub async fn load_history(&self) -> Result<usize, ChatError> {
        let mut messages = self.store.load_messages().await.inspect_err(|err| {
            self.logger.warn(
                "Failed to load conversation history",
                Some(json!({ "error": err.message })),
                None,
            );
        })?;
        truncate(&mut messages, self.settings.max_messages);

        let count = messages.len();
        self.lock().state.messages = messages;
        self.logger.debug(
            "Conversation history loaded",
            Some(json!({ "messages": count })),
            None,
        );
        Ok(count)
    }

    pub async fn send_message(&self, text: &str, attachment: Option<Attachment>) -> TurnOutcome {
        if text.trim().is_empty() && attachment.is_none() {
            return TurnOutcome::Skipped;
        }

        let history = {
            let mut inner = self.lock();
            if inner.turn_active {
                drop(inner);
                self.logger
                    .warn("Rejected message while a turn is in flight", None, None);
                return TurnOutcome::Busy;
            }

            inner.turn_active = true;
            inner.state.error = None;
            inner.state.messages.push(ChatMessage::user(text));
            truncate(&mut inner.state.messages, self.settings.max_messages);
            inner.state.messages.clone()
        };
        self.persist(&history).await;

        if !self.limiter.check_admission() {
            return self.deny_admission();
        }

        self.lock().state.is_loading = true;
        self.limiter.record_admission();
        self.logger.info(
            "Chat turn admitted",
            Some(json!({
                "messages": history.len(),
                "has_attachment": attachment.is_some(),
            })),
            None,
        );

        let result = match attachment {
            Some(attachment) => match attachment.to_data_uri().await {
                Ok(data_uri) => self.dispatch(&history, Some(data_uri)).await,
                Err(err) => Err(err),
            },
            None => self.dispatch(&history, None).await,
        };

        match result {
            Ok(message) => self.resolve(message).await,
            Err(error) => self.fail(error),
        }
    }

    pub async fn clear_messages(&self) {
        {
            let mut inner = self.lock();
            inner.state.messages.clear();
            inner.state.error = None;
        }
        self.persist(&[]).await;
        self.logger.info("Conversation cleared", None, None);
    }

    /// The only place a technical error becomes user-facing text.
    pub fn describe_error(&self, error: &ChatError) -> String {
        let Some(provider) = &error.provider else {
            return error.message.clone();
        };

        match provider.kind {
            ProviderErrorKind::RateLimited => {
                let wait = self.limiter.time_until_next_slot();
                if wait.is_zero() {
                    "The chat service is receiving too many requests. Please wait a moment \
                     before trying again."
                        .to_string()
                } else {
                    format!(
                        "The chat service is receiving too many requests. Please wait {} \
                         seconds before trying again.",
                        ceil_secs(wait)
                    )
                }
            }
            ProviderErrorKind::Transport | ProviderErrorKind::Timeout => {
                "Unable to reach the chat service. Please check your connection and try again."
                    .to_string()
            }
            ProviderErrorKind::Server => format!(
                "The chat service is temporarily unavailable{}. Please try again shortly.",
                status_suffix(provider)
            ),
            ProviderErrorKind::Client => {
                format!("The chat service rejected the request: {}", provider.message)
            }
            ProviderErrorKind::ContractViolation => {
                "The chat service returned an unexpected response. Please try again later."
                    .to_string()
            }
        }
    }

    async fn dispatch(
        &self,
        history: &[ChatMessage],
        image: Option<String>,
    ) -> Result<ChatMessage, ChatError> {
        let request = self.build_request(history, image);
        let response = self.client.send(&request).await?;

        Ok(ChatMessage::assistant(response.content()).with_sources(response.sources))
    }

    fn build_request(&self, history: &[ChatMessage], image: Option<String>) -> CompletionRequest {
        let mut messages = Vec::with_capacity(history.len() + 1);
        messages.push(RequestMessage::text(
            RequestRole::System,
            self.settings.prompt_style.system_prompt(),
        ));

        let last = history.len().saturating_sub(1);
        for (index, message) in history.iter().enumerate() {
            let role = match message.role {
                ChatRole::User => RequestRole::User,
                ChatRole::Assistant => RequestRole::Assistant,
            };
            match &image {
                Some(image) if index == last && message.role == ChatRole::User => {
                    messages.push(RequestMessage::with_image(role, &message.content, image));
                }
                _ => messages.push(RequestMessage::text(role, &message.content)),
            }
        }

        let request = CompletionRequest::new(&self.settings.generation, messages);
        match image {
            Some(image) => request.with_image(image),
            None => request,
        }
    }

    fn deny_admission(&self) -> TurnOutcome {
        let retry_after = self.limiter.time_until_next_slot();
        let remaining = self.limiter.remaining_capacity();
        let message = format!(
            "Please wait {} seconds before sending another message. {} of {} requests remaining.",
            ceil_secs(retry_after),
            remaining,
            self.limiter.config().max_requests
        );

        {
            let mut inner = self.lock();
            inner.state.error = Some(message.clone());
            inner.turn_active = false;
        }
        self.logger.warn(
            "Chat turn denied by rate limiter",
            Some(json!({
                "retry_after_ms": retry_after.as_millis() as u64,
                "remaining": remaining,
            })),
            None,
        );

        TurnOutcome::AdmissionDenied {
            retry_after,
            remaining,
        }
    }

    async fn resolve(&self, message: ChatMessage) -> TurnOutcome {
        let messages = {
            let mut inner = self.lock();
            inner.state.messages.push(message.clone());
            truncate(&mut inner.state.messages, self.settings.max_messages);
            inner.state.is_loading = false;
            inner.state.error = None;
            inner.turn_active = false;
            inner.state.messages.clone()
        };
        self.persist(&messages).await;

        self.logger.info(
            "Chat turn resolved",
            Some(json!({
                "messages": messages.len(),
                "sources": message.sources.len(),
            })),
            None,
        );
        TurnOutcome::Resolved { message }
    }

    fn fail(&self, error: ChatError) -> TurnOutcome {
        if error.is_rate_limited() {
            self.limiter.on_provider_rate_limit_signal();
        }
        let description = self.describe_error(&error);

        {
            let mut inner = self.lock();
            inner.state.is_loading = false;
            inner.state.error = Some(description.clone());
            inner.turn_active = false;
        }

        let correlation_id = error
            .provider
            .as_ref()
            .and_then(|provider| provider.correlation_id.as_ref());
        self.logger.error(
            "Chat turn failed",
            Some(json!({
                "kind": format!("{:?}", error.kind),
                "error": error.message,
                "display": description,
            })),
            correlation_id,
        );

        TurnOutcome::Failed { error }
    }

    async fn persist(&self, messages: &[ChatMessage]) {
        if let Err(err) = self.store.save_messages(messages).await {
            self.logger.warn(
                "Failed to persist conversation",
                Some(json!({
                    "error": err.message,
                    "messages": messages.len(),
                })),
                None,
            );
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

fn truncate(messages: &mut Vec<ChatMessage>, max_messages: usize) {
    if messages.len() > max_messages {
        let excess = messages.len() - max_messages;
        messages.drain(..excess);
    }
}

fn ceil_secs(duration: Duration) -> u64 {
    duration.as_millis().div_ceil(1000) as u64
}

fn status_suffix(error: &ProviderError) -> String {
    error
        .status
        .map(|status| format!(" ({status})"))
        .unwrap_or_default()
}

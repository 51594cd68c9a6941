use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use fchat::prelude::*;
use fcommon::{BoxFuture, CorrelationId, ManualClock};
use flimit::{RateLimitConfig, RateLimiter};
use fobserve::{LogLevel, Logger};
use fprovider::{
    CompletionRequest, CompletionTransport, ContentPart, MessageContent, ProviderError,
    ResilientClient, RetryPolicy, Sleeper, TransportResponse,
};
use serde_json::json;
use tokio::sync::Notify;

type Responder = Box<dyn Fn(usize) -> TransportResponse + Send + Sync>;

struct FakeTransport {
    respond: Responder,
    requests: Mutex<Vec<CompletionRequest>>,
    gate: Option<Arc<Notify>>,
}

impl FakeTransport {
    fn new(respond: impl Fn(usize) -> TransportResponse + Send + Sync + 'static) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(respond),
            requests: Mutex::new(Vec::new()),
            gate: None,
        })
    }

    fn gated(gate: Arc<Notify>) -> Arc<Self> {
        Arc::new(Self {
            respond: Box::new(|_| assistant_reply("finally")),
            requests: Mutex::new(Vec::new()),
            gate: Some(gate),
        })
    }

    fn calls(&self) -> usize {
        self.requests.lock().expect("requests lock").len()
    }

    fn last_request(&self) -> CompletionRequest {
        self.requests
            .lock()
            .expect("requests lock")
            .last()
            .cloned()
            .expect("a request should have been sent")
    }
}

impl CompletionTransport for FakeTransport {
    fn send<'a>(
        &'a self,
        request: &'a CompletionRequest,
        _correlation_id: &'a CorrelationId,
    ) -> BoxFuture<'a, Result<TransportResponse, ProviderError>> {
        Box::pin(async move {
            let call = {
                let mut requests = self.requests.lock().expect("requests lock");
                requests.push(request.clone());
                requests.len() - 1
            };
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            Ok((self.respond)(call))
        })
    }
}

struct InstantSleeper;

impl Sleeper for InstantSleeper {
    fn sleep<'a>(&'a self, _duration: Duration) -> BoxFuture<'a, ()> {
        Box::pin(async {})
    }
}

#[derive(Default)]
struct CountingStore {
    inner: InMemoryConversationStore,
    saves: AtomicUsize,
}

impl CountingStore {
    fn saves(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

impl ConversationStore for CountingStore {
    fn load_messages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        self.inner.load_messages()
    }

    fn save_messages<'a>(
        &'a self,
        messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        self.saves.fetch_add(1, Ordering::SeqCst);
        self.inner.save_messages(messages)
    }
}

struct FailingStore;

impl ConversationStore for FailingStore {
    fn load_messages<'a>(&'a self) -> BoxFuture<'a, Result<Vec<ChatMessage>, ChatError>> {
        Box::pin(async { Err(ChatError::store("disk unavailable")) })
    }

    fn save_messages<'a>(
        &'a self,
        _messages: &'a [ChatMessage],
    ) -> BoxFuture<'a, Result<(), ChatError>> {
        Box::pin(async { Err(ChatError::store("quota exceeded")) })
    }
}

fn assistant_reply(content: &str) -> TransportResponse {
    TransportResponse::new(
        200,
        json!({
            "choices": [{"message": {"content": content, "role": "assistant"}}],
            "sources": [{"title": "Docs", "url": "https://example.com/docs"}]
        })
        .to_string(),
    )
}

struct Harness {
    orchestrator: Arc<ChatOrchestrator>,
    limiter: Arc<RateLimiter>,
    logger: Arc<Logger>,
    store: Arc<CountingStore>,
}

fn harness(transport: Arc<FakeTransport>, limit: RateLimitConfig, settings: ChatSettings) -> Harness {
    let logger = Arc::new(Logger::new());
    let clock = Arc::new(ManualClock::new());
    let limiter = Arc::new(RateLimiter::with_clock(limit, Arc::clone(&logger), clock));
    let client = ResilientClient::builder(transport, Arc::clone(&logger))
        .with_policy(RetryPolicy::new(2))
        .with_sleeper(Arc::new(InstantSleeper))
        .build();
    let store = Arc::new(CountingStore::default());
    let orchestrator = ChatOrchestrator::builder(Arc::new(client), Arc::clone(&limiter), Arc::clone(&logger))
        .with_store(Arc::clone(&store) as Arc<dyn ConversationStore>)
        .with_settings(settings)
        .build();

    Harness {
        orchestrator: Arc::new(orchestrator),
        limiter,
        logger,
        store,
    }
}

#[tokio::test]
async fn successful_turn_appends_reply_and_persists() {
    let transport = FakeTransport::new(|_| assistant_reply("hi! how can I help?"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let outcome = h.orchestrator.send_message("hello", None).await;

    let TurnOutcome::Resolved { message } = outcome else {
        panic!("expected a resolved turn, got {outcome:?}");
    };
    assert_eq!(message.content, "hi! how can I help?");
    assert_eq!(message.sources.len(), 1);

    let state = h.orchestrator.state();
    assert!(!state.is_loading);
    assert!(state.error.is_none());
    assert_eq!(state.messages, vec![ChatMessage::user("hello"), message]);

    let stored = h.store.load_messages().await.expect("store should load");
    assert_eq!(stored, state.messages);

    let request = transport.last_request();
    assert_eq!(request.messages.len(), 2);
    assert_eq!(
        request.messages[0].content,
        MessageContent::Text(PromptStyle::Balanced.system_prompt().to_string())
    );
    assert_eq!(request.messages[1].content, MessageContent::Text("hello".to_string()));
    assert!(request.image.is_none());
    assert_eq!(h.limiter.remaining_capacity(), 9);
}

#[tokio::test]
async fn persistent_server_errors_keep_user_message_only() {
    let transport = FakeTransport::new(|_| TransportResponse::new(500, ""));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let outcome = h.orchestrator.send_message("hello", None).await;

    assert!(matches!(outcome, TurnOutcome::Failed { .. }));
    assert_eq!(transport.calls(), 3);

    let state = h.orchestrator.state();
    assert!(!state.is_loading);
    assert!(!state.error.as_deref().unwrap_or_default().is_empty());
    assert_eq!(state.messages, vec![ChatMessage::user("hello")]);

    let stored = h.store.load_messages().await.expect("store should load");
    assert_eq!(stored, vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn empty_message_without_attachment_is_a_no_op() {
    let transport = FakeTransport::new(|_| assistant_reply("unused"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    assert_eq!(h.orchestrator.send_message("", None).await, TurnOutcome::Skipped);
    assert_eq!(h.orchestrator.send_message("   \n", None).await, TurnOutcome::Skipped);

    assert_eq!(h.orchestrator.state(), ConversationState::default());
    assert_eq!(h.store.saves(), 0);
    assert_eq!(transport.calls(), 0);
    assert_eq!(h.limiter.remaining_capacity(), 10);
}

#[tokio::test]
async fn denied_admission_reports_wait_without_sending() {
    let transport = FakeTransport::new(|_| assistant_reply("ok"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::per_minute(1), ChatSettings::default());

    assert!(h.orchestrator.send_message("first", None).await.is_resolved());
    let outcome = h.orchestrator.send_message("second", None).await;

    let TurnOutcome::AdmissionDenied { retry_after, remaining } = outcome else {
        panic!("expected admission denial, got {outcome:?}");
    };
    assert!(retry_after > Duration::ZERO);
    assert!(retry_after <= Duration::from_secs(60));
    assert_eq!(remaining, 0);
    assert_eq!(transport.calls(), 1);

    let state = h.orchestrator.state();
    assert!(!state.is_loading);
    let error = state.error.expect("denial should set an error");
    assert!(error.starts_with("Please wait 60 seconds"), "{error}");
    assert!(error.contains("0 of 1 requests remaining"), "{error}");
    assert_eq!(state.messages.last(), Some(&ChatMessage::user("second")));
}

#[tokio::test]
async fn provider_rate_limit_escalates_limiter_backoff() {
    let transport = FakeTransport::new(|_| {
        TransportResponse::new(429, r#"{"error":"rate limit exceeded"}"#)
    });
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let outcome = h.orchestrator.send_message("hello", None).await;

    let TurnOutcome::Failed { error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert!(error.is_rate_limited());
    assert!(h.limiter.snapshot().backoff_multiplier >= 2.0);

    let state = h.orchestrator.state();
    let message = state.error.expect("error should be set");
    assert!(message.contains("too many requests"), "{message}");
    assert_eq!(state.messages, vec![ChatMessage::user("hello")]);
}

#[tokio::test]
async fn client_errors_are_translated_once() {
    let transport = FakeTransport::new(|_| {
        TransportResponse::new(400, r#"{"error":{"message":"model not found"}}"#)
    });
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    h.orchestrator.send_message("hello", None).await;

    assert_eq!(transport.calls(), 1);
    assert_eq!(
        h.orchestrator.state().error.as_deref(),
        Some("The chat service rejected the request: model not found")
    );
}

#[tokio::test]
async fn history_is_capped_oldest_first() {
    let transport = FakeTransport::new(|call| assistant_reply(&format!("reply {call}")));
    let settings = ChatSettings::default().with_max_messages(4);
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), settings);

    for turn in 0..3 {
        let outcome = h.orchestrator.send_message(&format!("turn {turn}"), None).await;
        assert!(outcome.is_resolved());
    }

    let contents = h
        .orchestrator
        .state()
        .messages
        .into_iter()
        .map(|message| message.content)
        .collect::<Vec<_>>();
    assert_eq!(contents, vec!["turn 1", "reply 1", "turn 2", "reply 2"]);

    // The third request carried the capped history: system prompt plus four messages.
    assert_eq!(transport.last_request().messages.len(), 5);
}

#[tokio::test]
async fn image_attachment_is_inlined_as_data_uri() {
    let transport = FakeTransport::new(|_| assistant_reply("a cat"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let attachment = Attachment::bytes("image/png", b"png!".to_vec());
    let outcome = h.orchestrator.send_message("what is this?", Some(attachment)).await;
    assert!(outcome.is_resolved());

    let request = transport.last_request();
    let data_uri = "data:image/png;base64,cG5nIQ==";
    assert_eq!(request.image.as_deref(), Some(data_uri));
    assert_eq!(
        request.messages[1].content,
        MessageContent::Parts(vec![
            ContentPart::Text {
                text: "what is this?".to_string()
            },
            ContentPart::ImageUrl {
                image_url: data_uri.to_string()
            },
        ])
    );
}

#[tokio::test]
async fn invalid_attachment_fails_turn_but_keeps_message() {
    let transport = FakeTransport::new(|_| assistant_reply("unused"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let attachment = Attachment::bytes("image/tiff", vec![1, 2, 3]);
    let outcome = h.orchestrator.send_message("look", Some(attachment)).await;

    let TurnOutcome::Failed { error } = outcome else {
        panic!("expected failure, got {outcome:?}");
    };
    assert_eq!(error.kind, ChatErrorKind::Attachment);
    assert_eq!(transport.calls(), 0);

    let state = h.orchestrator.state();
    assert!(!state.is_loading);
    assert!(state.error.expect("error set").contains("image/tiff"));
    assert_eq!(state.messages, vec![ChatMessage::user("look")]);
}

#[tokio::test]
async fn overlapping_turn_is_rejected_while_in_flight() {
    let gate = Arc::new(Notify::new());
    let transport = FakeTransport::gated(Arc::clone(&gate));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    let first = tokio::spawn({
        let orchestrator = Arc::clone(&h.orchestrator);
        async move { orchestrator.send_message("first", None).await }
    });

    while transport.calls() == 0 {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert!(h.orchestrator.state().is_loading);

    let second = h.orchestrator.send_message("second", None).await;
    assert_eq!(second, TurnOutcome::Busy);
    assert_eq!(h.orchestrator.state().messages, vec![ChatMessage::user("first")]);

    gate.notify_one();
    let first = first.await.expect("first turn task");
    assert!(first.is_resolved());

    let state = h.orchestrator.state();
    assert!(!state.is_loading);
    assert_eq!(state.messages.len(), 2);
}

#[tokio::test]
async fn clear_messages_empties_state_and_store() {
    let transport = FakeTransport::new(|_| assistant_reply("ok"));
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), ChatSettings::default());

    h.orchestrator.send_message("hello", None).await;
    h.orchestrator.clear_messages().await;

    let state = h.orchestrator.state();
    assert!(state.messages.is_empty());
    assert!(state.error.is_none());
    assert!(h.store.load_messages().await.expect("load").is_empty());
}

#[tokio::test]
async fn load_history_hydrates_capped_messages() {
    let transport = FakeTransport::new(|_| assistant_reply("ok"));
    let logger = Arc::new(Logger::new());
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default(), Arc::clone(&logger)));
    let client = Arc::new(ResilientClient::new(transport, Arc::clone(&logger)));
    let stored = (0..60)
        .map(|index| ChatMessage::user(format!("m{index}")))
        .collect::<Vec<_>>();
    let orchestrator = ChatOrchestrator::builder(client, limiter, logger)
        .with_store(Arc::new(InMemoryConversationStore::with_messages(stored)))
        .build();

    let loaded = orchestrator.load_history().await.expect("history should load");

    assert_eq!(loaded, 50);
    let state = orchestrator.state();
    assert_eq!(state.messages.first().map(|m| m.content.as_str()), Some("m10"));
    assert_eq!(state.messages.last().map(|m| m.content.as_str()), Some("m59"));
}

#[tokio::test]
async fn store_failures_are_logged_not_fatal() {
    let transport = FakeTransport::new(|_| assistant_reply("still works"));
    let logger = Arc::new(Logger::new());
    let limiter = Arc::new(RateLimiter::new(RateLimitConfig::default(), Arc::clone(&logger)));
    let client = Arc::new(ResilientClient::new(transport, Arc::clone(&logger)));
    let orchestrator = ChatOrchestrator::builder(client, limiter, Arc::clone(&logger))
        .with_store(Arc::new(FailingStore))
        .build();

    assert!(orchestrator.load_history().await.is_err());
    let outcome = orchestrator.send_message("hello", None).await;

    assert!(outcome.is_resolved());
    assert_eq!(orchestrator.state().messages.len(), 2);
    assert!(
        logger
            .get_logs(Some(LogLevel::Warn), 50)
            .iter()
            .any(|entry| entry.message == "Failed to persist conversation")
    );
}

#[tokio::test]
async fn prompt_style_selects_system_prompt() {
    let transport = FakeTransport::new(|_| assistant_reply("ok"));
    let settings = ChatSettings::default().with_prompt_style(PromptStyle::Precise);
    let h = harness(Arc::clone(&transport), RateLimitConfig::default(), settings);

    h.orchestrator.send_message("explain lifetimes", None).await;

    assert_eq!(
        transport.last_request().messages[0].content,
        MessageContent::Text(PromptStyle::Precise.system_prompt().to_string())
    );
    assert!(h.logger.get_logs(Some(LogLevel::Info), 50).iter().any(|entry| entry.message == "Chat turn resolved"));
}

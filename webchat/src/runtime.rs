//! Runtime wiring: one logger, limiter, client, store, and orchestrator per bundle.

use std::sync::Arc;

use crate::{
    AppConfig, ChatOrchestrator, ChatStorage, CompletionTransport, ConfigError, Logger,
    MetricsOperationHooks, RateLimiter, ResilientClient, SafeOperationHooks,
    create_key_value_store,
};

#[derive(Clone)]
pub struct RuntimeBundle {
    pub logger: Arc<Logger>,
    pub limiter: Arc<RateLimiter>,
    pub client: Arc<ResilientClient>,
    pub storage: ChatStorage,
    pub chat: Arc<ChatOrchestrator>,
}

/// Builds a runtime that talks to `config.endpoint` over HTTP.
#[cfg(feature = "http-transport")]
pub fn build_runtime(config: &AppConfig) -> Result<RuntimeBundle, ConfigError> {
    build_runtime_with(config, http_transport(config)?)
}

#[cfg(feature = "http-transport")]
pub fn http_transport(config: &AppConfig) -> Result<Arc<dyn CompletionTransport>, ConfigError> {
    use crate::{HttpCompletionTransport, ProviderError};

    let http = reqwest::Client::builder()
        .timeout(config.retry.attempt_timeout)
        .build()
        .map_err(|err| ProviderError::transport(err.to_string()))?;

    let mut transport = HttpCompletionTransport::new(http, config.endpoint.clone());
    if let Some(api_key) = &config.api_key {
        transport = transport.with_api_key(api_key.expose());
    }
    Ok(Arc::new(transport))
}

/// Builds a runtime over a caller-supplied transport.
pub fn build_runtime_with(
    config: &AppConfig,
    transport: Arc<dyn CompletionTransport>,
) -> Result<RuntimeBundle, ConfigError> {
    config.validate()?;

    let logger = Arc::new(Logger::with_capacity(config.log_capacity));
    let limiter = Arc::new(RateLimiter::new(
        config.rate_limit.clone(),
        Arc::clone(&logger),
    ));
    let client = Arc::new(
        ResilientClient::builder(transport, Arc::clone(&logger))
            .with_policy(config.retry.clone())
            .with_thresholds(config.thresholds)
            .with_hooks(Arc::new(SafeOperationHooks::new(MetricsOperationHooks)))
            .build(),
    );

    let storage = ChatStorage::new(create_key_value_store(config.storage.clone())?)
        .with_max_messages(config.chat.max_messages);
    let chat = Arc::new(
        ChatOrchestrator::builder(
            Arc::clone(&client),
            Arc::clone(&limiter),
            Arc::clone(&logger),
        )
        .with_store(Arc::new(storage.clone()))
        .with_settings(config.chat.clone())
        .build(),
    );

    logger.info(
        "Chat runtime assembled",
        Some(serde_json::json!({
            "model": config.chat.generation.model,
            "maxRequests": config.rate_limit.max_requests,
            "maxRetries": config.retry.max_retries,
        })),
        None,
    );

    Ok(RuntimeBundle {
        logger,
        limiter,
        client,
        storage,
        chat,
    })
}

//! Resilient completion client: retry, response validation, metrics.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use fobserve::Logger;
//! use fprovider::{
//!     CompletionRequest, GenerationParams, HttpCompletionTransport, RequestMessage, RequestRole,
//!     ResilientClient, RetryPolicy,
//! };
//!
//! # async fn demo() -> Result<(), fprovider::ProviderError> {
//! let transport =
//!     HttpCompletionTransport::new(reqwest::Client::new(), "http://localhost:3000/api/chat");
//! let client = ResilientClient::builder(Arc::new(transport), Arc::new(Logger::new()))
//!     .with_policy(RetryPolicy::new(2))
//!     .build();
//!
//! let request = CompletionRequest::new(
//!     &GenerationParams::default(),
//!     vec![RequestMessage::text(RequestRole::User, "hello")],
//! );
//! let response = client.send(&request).await?;
//! println!("{}", response.content());
//! # Ok(())
//! # }
//! ```

use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use fcommon::{BoxFuture, CorrelationId};
use fobserve::Logger;
use serde_json::{Value, json};

use crate::{
    ApiMetrics, CompletionRequest, CompletionTransport, MetricsThresholds, NoopOperationHooks,
    ProviderError, ProviderOperationHooks, RetryPolicy, TransportResponse, ValidatedResponse,
    execute_with_retry, extract_error_message, validate_response,
};

/// Waits out retry delays. Swapped for a recording fake in tests.
pub trait Sleeper: Send + Sync {
    fn sleep<'a>(&'a self, duration: Duration) -> BoxFuture<'a, ()>;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

impl Sleeper for TokioSleeper {
    fn sleep<'a>(&'a self, duration: Duration) -> BoxFuture<'a, ()> {
        Box::pin(tokio::time::sleep(duration))
    }
}

pub struct ResilientClient {
    transport: Arc<dyn CompletionTransport>,
    policy: RetryPolicy,
    thresholds: MetricsThresholds,
    logger: Arc<Logger>,
    hooks: Arc<dyn ProviderOperationHooks>,
    sleeper: Arc<dyn Sleeper>,
    metrics: Mutex<ApiMetrics>,
}

pub struct ResilientClientBuilder {
    transport: Arc<dyn CompletionTransport>,
    logger: Arc<Logger>,
    policy: RetryPolicy,
    thresholds: MetricsThresholds,
    hooks: Arc<dyn ProviderOperationHooks>,
    sleeper: Arc<dyn Sleeper>,
}

impl ResilientClientBuilder {
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_thresholds(mut self, thresholds: MetricsThresholds) -> Self {
        self.thresholds = thresholds;
        self
    }

    pub fn with_hooks(mut self, hooks: Arc<dyn ProviderOperationHooks>) -> Self {
        self.hooks = hooks;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn build(self) -> ResilientClient {
        ResilientClient {
            transport: self.transport,
            policy: self.policy,
            thresholds: self.thresholds,
            logger: self.logger,
            hooks: self.hooks,
            sleeper: self.sleeper,
            metrics: Mutex::new(ApiMetrics::default()),
        }
    }
}

impl ResilientClient {
    pub fn new(transport: Arc<dyn CompletionTransport>, logger: Arc<Logger>) -> Self {
        Self::builder(transport, logger).build()
    }

    pub fn builder(
        transport: Arc<dyn CompletionTransport>,
        logger: Arc<Logger>,
    ) -> ResilientClientBuilder {
        ResilientClientBuilder {
            transport,
            logger,
            policy: RetryPolicy::default(),
            thresholds: MetricsThresholds::default(),
            hooks: Arc::new(NoopOperationHooks),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Sends one logical request under a freshly generated correlation id.
    pub async fn send(
        &self,
        request: &CompletionRequest,
    ) -> Result<ValidatedResponse, ProviderError> {
        self.send_with_correlation_id(request, CorrelationId::generate())
            .await
    }

    /// Every attempt of this request carries `correlation_id`, including on the wire.
    pub async fn send_with_correlation_id(
        &self,
        request: &CompletionRequest,
        correlation_id: CorrelationId,
    ) -> Result<ValidatedResponse, ProviderError> {
        let started = Instant::now();
        let hooks = LoggingHooks {
            logger: &self.logger,
            inner: self.hooks.as_ref(),
        };

        let result = execute_with_retry(
            &correlation_id,
            &self.policy,
            &hooks,
            |attempt| self.attempt(request, &correlation_id, attempt),
            |delay| self.sleeper.sleep(delay),
        )
        .await;
        let elapsed = started.elapsed();

        let snapshot = {
            let mut metrics = self.lock_metrics();
            match &result {
                Ok((_, attempts)) => metrics.record_success(elapsed, *attempts),
                Err(error) => metrics.record_failure(elapsed, error.attempts),
            }
            *metrics
        };
        self.check_thresholds(&snapshot, &correlation_id);

        result
            .map(|(response, _)| response)
            .map_err(|error| error.with_correlation_id(correlation_id))
    }

    pub fn metrics(&self) -> ApiMetrics {
        *self.lock_metrics()
    }

    pub fn reset_metrics(&self) {
        *self.lock_metrics() = ApiMetrics::default();
    }

    async fn attempt(
        &self,
        request: &CompletionRequest,
        correlation_id: &CorrelationId,
        attempt: u32,
    ) -> Result<ValidatedResponse, ProviderError> {
        self.logger.info(
            "Sending completion request",
            Some(json!({
                "attempt": attempt + 1,
                "model": request.model,
                "messages": request.messages.len(),
                "has_image": request.image.is_some(),
            })),
            Some(correlation_id),
        );

        let sent = tokio::time::timeout(
            self.policy.attempt_timeout,
            self.transport.send(request, correlation_id),
        )
        .await;
        let response = match sent {
            Ok(Ok(response)) => response,
            Ok(Err(error)) => {
                self.log_attempt_error(correlation_id, attempt, &error);
                return Err(error);
            }
            Err(_) => {
                let error = ProviderError::timeout(format!(
                    "attempt timed out after {}ms",
                    self.policy.attempt_timeout.as_millis()
                ));
                self.log_attempt_error(correlation_id, attempt, &error);
                return Err(error);
            }
        };

        self.logger.info(
            "Received completion response",
            Some(json!({ "attempt": attempt + 1, "status": response.status })),
            Some(correlation_id),
        );

        let classified = self.classify(correlation_id, response);
        if let Err(error) = &classified {
            self.log_attempt_error(correlation_id, attempt, error);
        }
        classified
    }

    fn classify(
        &self,
        correlation_id: &CorrelationId,
        response: TransportResponse,
    ) -> Result<ValidatedResponse, ProviderError> {
        if !response.is_success() {
            let message = extract_error_message(&response.body).unwrap_or_else(|| {
                let reason = if response.status_text.is_empty() {
                    response.status.to_string()
                } else {
                    response.status_text.clone()
                };
                format!("API error: {reason}")
            });
            return Err(ProviderError::from_status(response.status, message));
        }

        // An unreadable body is treated like a dropped connection; a readable
        // body with the wrong shape is fatal.
        let body = match serde_json::from_str::<Value>(&response.body) {
            Ok(body) => body,
            Err(err) => {
                let reason = format!("response body is not valid JSON: {err}");
                self.log_invalid_response(correlation_id, &response, &reason);
                return Err(ProviderError::transport(reason).with_status(response.status));
            }
        };

        validate_response(&body).map_err(|reason| {
            self.log_invalid_response(correlation_id, &response, &reason);
            ProviderError::contract_violation(reason).with_status(response.status)
        })
    }

    fn log_invalid_response(
        &self,
        correlation_id: &CorrelationId,
        response: &TransportResponse,
        reason: &str,
    ) {
        let headers = response
            .headers
            .iter()
            .cloned()
            .collect::<BTreeMap<String, String>>();
        self.logger.error(
            "Invalid response structure",
            Some(json!({
                "reason": reason,
                "status": response.status,
                "headers": headers,
                "body": response.body,
            })),
            Some(correlation_id),
        );
    }

    fn log_attempt_error(
        &self,
        correlation_id: &CorrelationId,
        attempt: u32,
        error: &ProviderError,
    ) {
        self.logger.warn(
            format!("Completion attempt {} failed", attempt + 1),
            Some(json!({
                "kind": format!("{:?}", error.kind),
                "message": error.message,
                "status": error.status,
                "retryable": error.retryable,
            })),
            Some(correlation_id),
        );
    }

    fn check_thresholds(&self, metrics: &ApiMetrics, correlation_id: &CorrelationId) {
        let average = metrics.average_response_time_ms();
        if average > self.thresholds.slow_response.as_millis() as f64 {
            self.logger.warn(
                "Average API response time above threshold",
                Some(json!({
                    "average_response_time_ms": average,
                    "threshold_ms": self.thresholds.slow_response.as_millis() as u64,
                })),
                Some(correlation_id),
            );
        }

        let error_rate = metrics.error_rate();
        if error_rate > self.thresholds.error_rate {
            self.logger.warn(
                "API error rate above threshold",
                Some(json!({
                    "error_rate": error_rate,
                    "threshold": self.thresholds.error_rate,
                    "requests": metrics.request_count,
                })),
                Some(correlation_id),
            );
        }
    }

    fn lock_metrics(&self) -> MutexGuard<'_, ApiMetrics> {
        self.metrics
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Records retry and outcome events in the session log, then forwards to the
/// caller-supplied hooks.
struct LoggingHooks<'a> {
    logger: &'a Logger,
    inner: &'a dyn ProviderOperationHooks,
}

impl ProviderOperationHooks for LoggingHooks<'_> {
    fn on_attempt_start(&self, correlation_id: &CorrelationId, attempt: u32) {
        self.inner.on_attempt_start(correlation_id, attempt);
    }

    fn on_retry_scheduled(
        &self,
        correlation_id: &CorrelationId,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        self.logger.warn(
            format!("Retrying request after {}ms", delay.as_millis()),
            Some(json!({
                "next_attempt": attempt + 2,
                "delay_ms": delay.as_millis() as u64,
                "kind": format!("{:?}", error.kind),
            })),
            Some(correlation_id),
        );
        self.inner
            .on_retry_scheduled(correlation_id, attempt, delay, error);
    }

    fn on_success(&self, correlation_id: &CorrelationId, attempts: u32, elapsed: Duration) {
        self.logger.info(
            "Completion request succeeded",
            Some(json!({
                "attempts": attempts,
                "elapsed_ms": elapsed.as_millis() as u64,
            })),
            Some(correlation_id),
        );
        self.inner.on_success(correlation_id, attempts, elapsed);
    }

    fn on_failure(
        &self,
        correlation_id: &CorrelationId,
        attempts: u32,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        self.logger.error(
            "Completion request failed",
            Some(json!({
                "attempts": attempts,
                "elapsed_ms": elapsed.as_millis() as u64,
                "kind": format!("{:?}", error.kind),
                "message": error.message,
                "status": error.status,
            })),
            Some(correlation_id),
        );
        self.inner
            .on_failure(correlation_id, attempts, elapsed, error);
    }
}

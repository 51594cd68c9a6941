//! Exporter-facing operation hooks: `metrics` counters and a panic-isolating wrapper.
//!
//! ```rust
//! use fprovider::{MetricsOperationHooks, ProviderOperationHooks, SafeOperationHooks};
//!
//! fn accepts_hooks(_hooks: &dyn ProviderOperationHooks) {}
//!
//! let hooks = SafeOperationHooks::new(MetricsOperationHooks);
//! accepts_hooks(&hooks);
//! ```

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use fcommon::CorrelationId;

use crate::{ProviderError, ProviderOperationHooks};

#[derive(Debug, Clone, Copy, Default)]
pub struct MetricsOperationHooks;

impl ProviderOperationHooks for MetricsOperationHooks {
    fn on_attempt_start(&self, _correlation_id: &CorrelationId, _attempt: u32) {
        metrics::counter!("webchat_provider_attempt_start_total").increment(1);
    }

    fn on_retry_scheduled(
        &self,
        _correlation_id: &CorrelationId,
        _attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "webchat_provider_retry_scheduled_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("webchat_provider_retry_delay_seconds").record(delay.as_secs_f64());
    }

    fn on_success(&self, _correlation_id: &CorrelationId, attempts: u32, elapsed: Duration) {
        metrics::counter!("webchat_provider_success_total").increment(1);
        metrics::histogram!("webchat_provider_attempts_per_success").record(attempts as f64);
        metrics::histogram!("webchat_provider_duration_seconds", "status" => "success")
            .record(elapsed.as_secs_f64());
    }

    fn on_failure(
        &self,
        _correlation_id: &CorrelationId,
        attempts: u32,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        metrics::counter!(
            "webchat_provider_failure_total",
            "error_kind" => format!("{:?}", error.kind)
        )
        .increment(1);
        metrics::histogram!("webchat_provider_attempts_per_failure").record(attempts as f64);
        metrics::histogram!("webchat_provider_duration_seconds", "status" => "failure")
            .record(elapsed.as_secs_f64());
    }
}

pub struct SafeOperationHooks<H> {
    inner: H,
}

impl<H> SafeOperationHooks<H> {
    pub fn new(inner: H) -> Self {
        Self { inner }
    }
}

impl<H> ProviderOperationHooks for SafeOperationHooks<H>
where
    H: ProviderOperationHooks,
{
    fn on_attempt_start(&self, correlation_id: &CorrelationId, attempt: u32) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_attempt_start(correlation_id, attempt)
        }));
    }

    fn on_retry_scheduled(
        &self,
        correlation_id: &CorrelationId,
        attempt: u32,
        delay: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_retry_scheduled(correlation_id, attempt, delay, error)
        }));
    }

    fn on_success(&self, correlation_id: &CorrelationId, attempts: u32, elapsed: Duration) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner.on_success(correlation_id, attempts, elapsed)
        }));
    }

    fn on_failure(
        &self,
        correlation_id: &CorrelationId,
        attempts: u32,
        elapsed: Duration,
        error: &ProviderError,
    ) {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            self.inner
                .on_failure(correlation_id, attempts, elapsed, error)
        }));
    }
}

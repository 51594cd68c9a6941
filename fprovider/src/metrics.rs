//! Aggregate request metrics for the resilient client.

use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ApiMetrics {
    pub request_count: u64,
    pub error_count: u64,
    pub retry_count: u64,
    pub total_response_time_ms: u64,
}

impl ApiMetrics {
    pub fn average_response_time_ms(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.total_response_time_ms as f64 / self.request_count as f64
    }

    pub fn error_rate(&self) -> f64 {
        if self.request_count == 0 {
            return 0.0;
        }
        self.error_count as f64 / self.request_count as f64
    }

    pub(crate) fn record_success(&mut self, elapsed: Duration, attempts: u32) {
        self.record(elapsed, attempts);
    }

    pub(crate) fn record_failure(&mut self, elapsed: Duration, attempts: u32) {
        self.record(elapsed, attempts);
        self.error_count += 1;
    }

    fn record(&mut self, elapsed: Duration, attempts: u32) {
        self.request_count += 1;
        self.retry_count += u64::from(attempts.saturating_sub(1));
        self.total_response_time_ms += elapsed.as_millis() as u64;
    }
}

/// Levels past which the client logs a standalone warning. Observability only.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MetricsThresholds {
    pub slow_response: Duration,
    pub error_rate: f64,
}

impl Default for MetricsThresholds {
    fn default() -> Self {
        Self {
            slow_response: Duration::from_millis(5000),
            error_rate: 0.25,
        }
    }
}

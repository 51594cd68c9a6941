//! Standard retry/backoff policy and operational hook contracts.

use std::future::Future;
use std::time::Duration;

use fcommon::CorrelationId;

use crate::ProviderError;

#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt; a request issues at most `max_retries + 1` calls.
    pub max_retries: u32,
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub backoff_factor: f64,
    /// Upper bound on a single attempt; an elapsed attempt is a retryable timeout.
    pub attempt_timeout: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(10_000),
            backoff_factor: 2.0,
            attempt_timeout: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Self::default()
        }
    }

    pub fn with_delays(mut self, initial_delay: Duration, max_delay: Duration) -> Self {
        self.initial_delay = initial_delay;
        self.max_delay = max_delay;
        self
    }

    pub fn with_backoff_factor(mut self, backoff_factor: f64) -> Self {
        self.backoff_factor = backoff_factor;
        self
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    /// `attempt` is zero-based; the first attempt is never retried into.
    pub fn should_retry(&self, attempt: u32, error: &ProviderError) -> bool {
        error.retryable && attempt < self.max_retries
    }

    /// Delay before zero-based `attempt`: `min(initial × factor^(attempt-1), max)`.
    pub fn delay_before_attempt(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let exponent = (attempt - 1) as i32;
        let unbounded = self.initial_delay.as_secs_f64() * self.backoff_factor.powi(exponent);
        Duration::from_secs_f64(unbounded.min(self.max_delay.as_secs_f64()).max(0.0))
    }
}

pub trait ProviderOperationHooks: Send + Sync {
    fn on_attempt_start(&self, _correlation_id: &CorrelationId, _attempt: u32) {}

    fn on_retry_scheduled(
        &self,
        _correlation_id: &CorrelationId,
        _attempt: u32,
        _delay: Duration,
        _error: &ProviderError,
    ) {
    }

    fn on_success(&self, _correlation_id: &CorrelationId, _attempts: u32, _elapsed: Duration) {}

    fn on_failure(
        &self,
        _correlation_id: &CorrelationId,
        _attempts: u32,
        _elapsed: Duration,
        _error: &ProviderError,
    ) {
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NoopOperationHooks;

impl ProviderOperationHooks for NoopOperationHooks {}

/// Runs `execute` until it succeeds, fails fatally, or the retry budget is spent.
///
/// Returns the value with the number of attempts made. Errors carry the
/// attempt count in [`ProviderError::attempts`].
pub async fn execute_with_retry<T, Op, OpFuture, Sleep, SleepFuture>(
    correlation_id: &CorrelationId,
    policy: &RetryPolicy,
    hooks: &dyn ProviderOperationHooks,
    mut execute: Op,
    mut sleep: Sleep,
) -> Result<(T, u32), ProviderError>
where
    Op: FnMut(u32) -> OpFuture,
    OpFuture: Future<Output = Result<T, ProviderError>>,
    Sleep: FnMut(Duration) -> SleepFuture,
    SleepFuture: Future<Output = ()>,
{
    let started = std::time::Instant::now();
    let mut attempt = 0;

    loop {
        hooks.on_attempt_start(correlation_id, attempt);

        match execute(attempt).await {
            Ok(value) => {
                hooks.on_success(correlation_id, attempt + 1, started.elapsed());
                return Ok((value, attempt + 1));
            }
            Err(error) => {
                if policy.should_retry(attempt, &error) {
                    let delay = policy.delay_before_attempt(attempt + 1);
                    hooks.on_retry_scheduled(correlation_id, attempt, delay, &error);
                    sleep(delay).await;
                    attempt += 1;
                    continue;
                }

                let error = error.with_attempts(attempt + 1);
                hooks.on_failure(correlation_id, attempt + 1, started.elapsed(), &error);
                return Err(error);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::Mutex;

    use super::*;
    use crate::{ProviderError, ProviderErrorKind};

    #[test]
    fn retry_policy_uses_retryable_flag_and_retry_budget() {
        let policy = RetryPolicy::new(2);
        let retryable = ProviderError::timeout("timed out");
        let fatal = ProviderError::client(400, "bad request");

        assert!(policy.should_retry(0, &retryable));
        assert!(policy.should_retry(1, &retryable));
        assert!(!policy.should_retry(2, &retryable));
        assert!(!policy.should_retry(0, &fatal));
    }

    #[test]
    fn default_policy_matches_documented_values() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.max_retries, 3);
        assert_eq!(policy.initial_delay, Duration::from_millis(1000));
        assert_eq!(policy.max_delay, Duration::from_millis(10_000));
        assert_eq!(policy.backoff_factor, 2.0);
    }

    #[test]
    fn retry_delay_grows_and_caps() {
        let policy = RetryPolicy::new(6);

        assert_eq!(policy.delay_before_attempt(0), Duration::ZERO);
        assert_eq!(policy.delay_before_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_before_attempt(2), Duration::from_millis(2000));
        assert_eq!(policy.delay_before_attempt(3), Duration::from_millis(4000));
        assert_eq!(policy.delay_before_attempt(4), Duration::from_millis(8000));
        assert_eq!(policy.delay_before_attempt(5), Duration::from_millis(10_000));
        assert_eq!(policy.delay_before_attempt(6), Duration::from_millis(10_000));
    }

    #[test]
    fn negative_backoff_factor_never_yields_negative_delay() {
        let policy = RetryPolicy::new(3).with_backoff_factor(-2.0);

        assert_eq!(policy.delay_before_attempt(1), Duration::from_millis(1000));
        assert_eq!(policy.delay_before_attempt(2), Duration::ZERO);
        assert_eq!(policy.delay_before_attempt(3), Duration::from_millis(4000));
    }

    #[derive(Default)]
    struct RecordingHooks {
        events: Mutex<Vec<String>>,
    }

    impl ProviderOperationHooks for RecordingHooks {
        fn on_attempt_start(&self, correlation_id: &CorrelationId, attempt: u32) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("start:{correlation_id}:{attempt}"));
        }

        fn on_retry_scheduled(
            &self,
            correlation_id: &CorrelationId,
            attempt: u32,
            delay: Duration,
            _error: &ProviderError,
        ) {
            self.events.lock().expect("events lock").push(format!(
                "retry:{correlation_id}:{attempt}:{}",
                delay.as_millis()
            ));
        }

        fn on_success(&self, correlation_id: &CorrelationId, attempts: u32, _elapsed: Duration) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("success:{correlation_id}:{attempts}"));
        }

        fn on_failure(
            &self,
            correlation_id: &CorrelationId,
            attempts: u32,
            _elapsed: Duration,
            error: &ProviderError,
        ) {
            self.events
                .lock()
                .expect("events lock")
                .push(format!("failure:{correlation_id}:{attempts}:{:?}", error.kind));
        }
    }

    #[tokio::test]
    async fn execute_with_retry_retries_and_reports_hooks() {
        let policy = RetryPolicy::new(3);
        let hooks = RecordingHooks::default();
        let correlation_id = CorrelationId::from("req-1");
        let calls = Arc::new(Mutex::new(0_u32));
        let sleeps = Arc::new(Mutex::new(Vec::new()));

        let result = execute_with_retry(
            &correlation_id,
            &policy,
            &hooks,
            {
                let calls = Arc::clone(&calls);
                move |attempt| {
                    let calls = Arc::clone(&calls);
                    async move {
                        *calls.lock().expect("calls lock") += 1;
                        if attempt < 2 {
                            Err(ProviderError::new(
                                ProviderErrorKind::Transport,
                                "temporary",
                                true,
                            ))
                        } else {
                            Ok("ok")
                        }
                    }
                }
            },
            {
                let sleeps = Arc::clone(&sleeps);
                move |delay| {
                    let sleeps = Arc::clone(&sleeps);
                    async move {
                        sleeps.lock().expect("sleep lock").push(delay);
                    }
                }
            },
        )
        .await;

        assert_eq!(result.expect("result should succeed"), ("ok", 3));
        assert_eq!(*calls.lock().expect("calls lock"), 3);
        assert_eq!(
            *sleeps.lock().expect("sleep lock"),
            vec![Duration::from_millis(1000), Duration::from_millis(2000)]
        );

        let events = hooks.events.lock().expect("events lock").clone();
        assert!(events.contains(&"retry:req-1:0:1000".to_string()));
        assert!(events.contains(&"success:req-1:3".to_string()));
    }

    #[tokio::test]
    async fn execute_with_retry_stops_on_fatal_error() {
        let policy = RetryPolicy::new(5);
        let hooks = RecordingHooks::default();
        let correlation_id = CorrelationId::from("req-2");

        let result = execute_with_retry::<(), _, _, _, _>(
            &correlation_id,
            &policy,
            &hooks,
            |_| async move { Err(ProviderError::client(400, "bad input")) },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("result should fail");
        assert_eq!(error.kind, ProviderErrorKind::Client);
        assert_eq!(error.attempts, 1);
        let events = hooks.events.lock().expect("events lock").clone();
        assert!(events.iter().any(|item| item == "failure:req-2:1:Client"));
    }

    #[tokio::test]
    async fn execute_with_retry_gives_up_after_budget() {
        let policy = RetryPolicy::new(2);
        let correlation_id = CorrelationId::from("req-3");
        let calls = Arc::new(Mutex::new(0_u32));

        let result = execute_with_retry::<(), _, _, _, _>(
            &correlation_id,
            &policy,
            &NoopOperationHooks,
            {
                let calls = Arc::clone(&calls);
                move |_| {
                    let calls = Arc::clone(&calls);
                    async move {
                        *calls.lock().expect("calls lock") += 1;
                        Err(ProviderError::server(503, "unavailable"))
                    }
                }
            },
            |_| async move {},
        )
        .await;

        let error = result.expect_err("result should fail");
        assert_eq!(error.attempts, 3);
        assert_eq!(*calls.lock().expect("calls lock"), 3);
    }
}

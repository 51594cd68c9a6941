//! Rate limiter tuning parameters.

use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub struct RateLimitConfig {
    pub max_requests: usize,
    pub window: Duration,
    /// Applied to the backoff multiplier when the limiter itself denies admission.
    pub growth_factor: f64,
    pub max_multiplier: f64,
    /// Applied on every granted admission; the multiplier never drops below 1.
    pub decay_factor: f64,
    /// Applied when the provider reports exhaustion (HTTP 429).
    pub provider_growth_factor: f64,
    pub provider_max_multiplier: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            window: Duration::from_secs(60),
            growth_factor: 1.5,
            max_multiplier: 4.0,
            decay_factor: 0.9,
            provider_growth_factor: 2.0,
            provider_max_multiplier: 8.0,
        }
    }
}

impl RateLimitConfig {
    pub fn new(max_requests: usize, window: Duration) -> Self {
        Self {
            max_requests: max_requests.max(1),
            window,
            ..Self::default()
        }
    }

    pub fn per_minute(max_requests: usize) -> Self {
        Self::new(max_requests, Duration::from_secs(60))
    }

    pub fn with_growth(mut self, growth_factor: f64, max_multiplier: f64) -> Self {
        self.growth_factor = growth_factor;
        self.max_multiplier = max_multiplier;
        self
    }

    pub fn with_decay(mut self, decay_factor: f64) -> Self {
        self.decay_factor = decay_factor;
        self
    }

    pub fn with_provider_growth(mut self, growth_factor: f64, max_multiplier: f64) -> Self {
        self.provider_growth_factor = growth_factor;
        self.provider_max_multiplier = max_multiplier;
        self
    }
}

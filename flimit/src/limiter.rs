//! Sliding-window admission gate with adaptive window widening.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, Instant};

use fcommon::{Clock, SystemClock};
use fobserve::Logger;
use serde_json::json;

use crate::RateLimitConfig;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateWindowSnapshot {
    pub live_requests: usize,
    pub max_requests: usize,
    pub backoff_multiplier: f64,
    pub effective_window: Duration,
}

#[derive(Debug)]
struct RateWindow {
    timestamps: VecDeque<Instant>,
    backoff_multiplier: f64,
    // A local denial widens the window starting with the next admission check,
    // so the wait reported for the denial itself uses the window that caused it.
    pending_growth: bool,
}

impl RateWindow {
    fn new() -> Self {
        Self {
            timestamps: VecDeque::new(),
            backoff_multiplier: 1.0,
            pending_growth: false,
        }
    }
}

pub struct RateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    logger: Arc<Logger>,
    window: Mutex<RateWindow>,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig, logger: Arc<Logger>) -> Self {
        Self::with_clock(config, logger, Arc::new(SystemClock))
    }

    /// A `max_requests` of zero is raised to one.
    pub fn with_clock(
        mut config: RateLimitConfig,
        logger: Arc<Logger>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        config.max_requests = config.max_requests.max(1);
        Self {
            config,
            clock,
            logger,
            window: Mutex::new(RateWindow::new()),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Decides whether a new request may proceed. Does not record the request.
    pub fn check_admission(&self) -> bool {
        let now = self.clock.now();
        let mut window = self.lock();

        if window.pending_growth {
            window.pending_growth = false;
            if window.backoff_multiplier < self.config.max_multiplier {
                window.backoff_multiplier = (window.backoff_multiplier * self.config.growth_factor)
                    .min(self.config.max_multiplier);
            }
        }

        self.evict(&mut window, now);
        let live = window.timestamps.len();

        if live < self.config.max_requests {
            window.backoff_multiplier =
                (window.backoff_multiplier * self.config.decay_factor).max(1.0);
            self.logger.debug(
                "rate limiter admitted request",
                Some(json!({
                    "live_requests": live,
                    "max_requests": self.config.max_requests,
                    "backoff_multiplier": window.backoff_multiplier,
                })),
                None,
            );
            return true;
        }

        window.pending_growth = true;
        self.logger.warn(
            "rate limiter denied request",
            Some(json!({
                "live_requests": live,
                "max_requests": self.config.max_requests,
                "backoff_multiplier": window.backoff_multiplier,
            })),
            None,
        );
        false
    }

    pub fn record_admission(&self) {
        let now = self.clock.now();
        let mut window = self.lock();
        window.timestamps.push_back(now);
        self.evict(&mut window, now);
    }

    pub fn remaining_capacity(&self) -> usize {
        let now = self.clock.now();
        let mut window = self.lock();
        self.evict(&mut window, now);
        self.config.max_requests.saturating_sub(window.timestamps.len())
    }

    /// Zero while under capacity, otherwise the time until enough timestamps
    /// age out of the current window to free one slot.
    pub fn time_until_next_slot(&self) -> Duration {
        let now = self.clock.now();
        let mut window = self.lock();
        self.evict(&mut window, now);

        let blocking = window
            .timestamps
            .len()
            .checked_sub(self.config.max_requests)
            .and_then(|index| window.timestamps.get(index).copied());
        let Some(blocking) = blocking else {
            return Duration::ZERO;
        };

        let expires_at = blocking + self.effective_window(window.backoff_multiplier);
        expires_at.saturating_duration_since(now)
    }

    /// Widens the window after the provider itself reported exhaustion.
    pub fn on_provider_rate_limit_signal(&self) {
        let mut window = self.lock();
        if window.backoff_multiplier < self.config.provider_max_multiplier {
            window.backoff_multiplier = (window.backoff_multiplier
                * self.config.provider_growth_factor)
                .min(self.config.provider_max_multiplier);
        }

        self.logger.warn(
            "provider reported rate limit, widening admission window",
            Some(json!({ "backoff_multiplier": window.backoff_multiplier })),
            None,
        );
    }

    pub fn reset(&self) {
        let mut window = self.lock();
        *window = RateWindow::new();
        self.logger.info("rate limiter reset", None, None);
    }

    pub fn snapshot(&self) -> RateWindowSnapshot {
        let now = self.clock.now();
        let mut window = self.lock();
        self.evict(&mut window, now);

        RateWindowSnapshot {
            live_requests: window.timestamps.len(),
            max_requests: self.config.max_requests,
            backoff_multiplier: window.backoff_multiplier,
            effective_window: self.effective_window(window.backoff_multiplier),
        }
    }

    fn effective_window(&self, multiplier: f64) -> Duration {
        self.config.window.mul_f64(multiplier)
    }

    fn evict(&self, window: &mut RateWindow, now: Instant) {
        let span = self.effective_window(window.backoff_multiplier);
        while let Some(oldest) = window.timestamps.front() {
            if now.saturating_duration_since(*oldest) < span {
                break;
            }
            window.timestamps.pop_front();
        }
    }

    fn lock(&self) -> MutexGuard<'_, RateWindow> {
        self.window
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

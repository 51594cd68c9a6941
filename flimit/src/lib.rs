//! Local admission control approximating "at most K requests per rolling window".
//!
//! The window widens under pressure: a local denial grows the backoff
//! multiplier gently, a provider-reported 429 grows it steeply, and every
//! granted admission decays it back toward 1.
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! use flimit::{RateLimitConfig, RateLimiter};
//! use fobserve::Logger;
//!
//! let limiter = RateLimiter::new(RateLimitConfig::per_minute(2), Arc::new(Logger::new()));
//! for _ in 0..2 {
//!     assert!(limiter.check_admission());
//!     limiter.record_admission();
//! }
//!
//! assert!(!limiter.check_admission());
//! assert_eq!(limiter.remaining_capacity(), 0);
//! assert!(limiter.time_until_next_slot() > Duration::ZERO);
//! ```

mod config;
mod limiter;

pub use config::RateLimitConfig;
pub use limiter::{RateLimiter, RateWindowSnapshot};

pub mod prelude {
    pub use crate::{RateLimitConfig, RateLimiter, RateWindowSnapshot};
}

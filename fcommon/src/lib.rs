//! Shared utilities and strongly-typed common values for workspace crates.
//!
//! ```rust
//! use fcommon::{Clock, CorrelationId, ManualClock};
//! use std::time::Duration;
//!
//! let correlation = CorrelationId::new("req-1");
//! assert_eq!(correlation.to_string(), "req-1");
//!
//! let clock = ManualClock::new();
//! let start = clock.now();
//! clock.advance(Duration::from_secs(2));
//! assert_eq!(clock.now() - start, Duration::from_secs(2));
//! ```

pub mod future {
    //! Shared async future aliases.
    //!
    //! ```rust
    //! use fcommon::BoxFuture;
    //!
    //! fn str_len<'a>(value: &'a str) -> BoxFuture<'a, usize> {
    //!     Box::pin(async move { value.len() })
    //! }
    //!
    //! let _future = str_len("hello");
    //! ```

    use std::future::Future;
    use std::pin::Pin;

    pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;
}

pub mod context {
    //! Cross-crate identifier newtypes.
    //!
    //! ```rust
    //! use fcommon::CorrelationId;
    //!
    //! let first = CorrelationId::generate();
    //! let second = CorrelationId::generate();
    //!
    //! assert!(first.as_str().starts_with("req_"));
    //! assert_ne!(first, second);
    //! ```

    use std::fmt::{Display, Formatter};

    /// Opaque token shared by one logical request and all of its retry attempts.
    #[derive(Debug, Clone, PartialEq, Eq, Hash)]
    pub struct CorrelationId(String);

    impl CorrelationId {
        pub fn new(value: impl Into<String>) -> Self {
            Self(value.into())
        }

        pub fn generate() -> Self {
            Self(format!("req_{}", uuid::Uuid::new_v4().simple()))
        }

        pub fn as_str(&self) -> &str {
            self.0.as_str()
        }
    }

    impl Display for CorrelationId {
        fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
            f.write_str(&self.0)
        }
    }

    impl From<String> for CorrelationId {
        fn from(value: String) -> Self {
            Self(value)
        }
    }

    impl From<&str> for CorrelationId {
        fn from(value: &str) -> Self {
            Self(value.to_string())
        }
    }
}

pub mod clock {
    //! Monotonic time sources.
    //!
    //! Components that reason about elapsed time take an `Arc<dyn Clock>` so
    //! tests can drive time by hand.
    //!
    //! ```rust
    //! use fcommon::{Clock, SystemClock};
    //!
    //! let clock = SystemClock;
    //! let earlier = clock.now();
    //! assert!(clock.now() >= earlier);
    //! ```

    use std::sync::Mutex;
    use std::time::{Duration, Instant};

    pub trait Clock: Send + Sync {
        fn now(&self) -> Instant;
    }

    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> Instant {
            Instant::now()
        }
    }

    #[derive(Debug)]
    pub struct ManualClock {
        origin: Instant,
        offset: Mutex<Duration>,
    }

    impl ManualClock {
        pub fn new() -> Self {
            Self {
                origin: Instant::now(),
                offset: Mutex::new(Duration::ZERO),
            }
        }

        pub fn advance(&self, by: Duration) {
            let mut offset = self
                .offset
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            *offset += by;
        }
    }

    impl Default for ManualClock {
        fn default() -> Self {
            Self::new()
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> Instant {
            let offset = self
                .offset
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            self.origin + *offset
        }
    }
}

pub use clock::{Clock, ManualClock, SystemClock};
pub use context::CorrelationId;
pub use future::BoxFuture;

//! Classified provider errors.
//!
//! ```rust
//! use fprovider::{ProviderError, ProviderErrorKind};
//!
//! let throttled = ProviderError::from_status(429, "slow down");
//! assert_eq!(throttled.kind, ProviderErrorKind::RateLimited);
//! assert!(throttled.retryable);
//!
//! let rejected = ProviderError::from_status(400, "bad request");
//! assert!(!rejected.retryable);
//! ```

use std::error::Error;
use std::fmt::{Display, Formatter};

use fcommon::CorrelationId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderErrorKind {
    /// Network failure, connection reset, or unreadable body.
    Transport,
    Timeout,
    /// HTTP 429 from the endpoint.
    RateLimited,
    /// HTTP 5xx.
    Server,
    /// HTTP 4xx other than 429.
    Client,
    /// HTTP success with a body that does not match the expected schema.
    ContractViolation,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProviderError {
    pub kind: ProviderErrorKind,
    pub message: String,
    pub retryable: bool,
    pub status: Option<u16>,
    pub correlation_id: Option<CorrelationId>,
    pub attempts: u32,
}

impl ProviderError {
    pub fn new(kind: ProviderErrorKind, message: impl Into<String>, retryable: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            retryable,
            status: None,
            correlation_id: None,
            attempts: 0,
        }
    }

    pub fn transport(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Transport, message, true)
    }

    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Timeout, message, true)
    }

    pub fn rate_limited(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::RateLimited, message, true).with_status(429)
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Server, message, true).with_status(status)
    }

    pub fn client(status: u16, message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::Client, message, false).with_status(status)
    }

    pub fn contract_violation(message: impl Into<String>) -> Self {
        Self::new(ProviderErrorKind::ContractViolation, message, false)
    }

    /// Classifies a non-success HTTP status: 429 and 5xx are retryable, the rest fatal.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        match status {
            429 => Self::rate_limited(message),
            500.. => Self::server(status, message),
            _ => Self::client(status, message),
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    pub fn with_correlation_id(mut self, correlation_id: CorrelationId) -> Self {
        self.correlation_id = Some(correlation_id);
        self
    }

    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = attempts;
        self
    }

    pub fn is_rate_limited(&self) -> bool {
        self.kind == ProviderErrorKind::RateLimited
    }
}

impl Display for ProviderError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ProviderError {}

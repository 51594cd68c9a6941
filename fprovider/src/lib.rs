//! Resilient client for the chat completion endpoint.
//!
//! A [`ResilientClient`] issues one logical request as up to
//! `max_retries + 1` transport calls sharing a single [`CorrelationId`],
//! classifies every failure into a [`ProviderError`], validates the shape of
//! successful responses, and keeps running [`ApiMetrics`].
//!
//! ```rust
//! use fprovider::{ProviderError, RetryPolicy};
//! use std::time::Duration;
//!
//! let policy = RetryPolicy::default();
//! assert_eq!(policy.delay_before_attempt(1), Duration::from_millis(1000));
//! assert_eq!(policy.delay_before_attempt(2), Duration::from_millis(2000));
//! assert!(policy.should_retry(0, &ProviderError::server(503, "busy")));
//! assert!(!policy.should_retry(0, &ProviderError::client(400, "bad")));
//! ```
//!
//! [`CorrelationId`]: fcommon::CorrelationId

mod client;
mod credentials;
mod error;
mod hooks;
mod metrics;
mod resilience;
mod transport;
mod wire;

pub mod prelude;

pub use client::{ResilientClient, ResilientClientBuilder, Sleeper, TokioSleeper};
pub use credentials::SecretString;
pub use error::{ProviderError, ProviderErrorKind};
pub use hooks::{MetricsOperationHooks, SafeOperationHooks};
pub use metrics::{ApiMetrics, MetricsThresholds};
pub use resilience::{NoopOperationHooks, ProviderOperationHooks, RetryPolicy, execute_with_retry};
#[cfg(feature = "http-transport")]
pub use transport::HttpCompletionTransport;
pub use transport::{CompletionTransport, REQUEST_ID_HEADER, TransportResponse};
pub use wire::{
    Choice, CompletionRequest, ContentPart, GenerationParams, MessageContent, RequestMessage,
    RequestRole, ResponseMessage, Source, TokenUsage, ValidatedResponse, extract_error_message,
    validate_response,
};

//! Common `fprovider` imports for downstream crates.

pub use crate::{
    ApiMetrics, CompletionRequest, CompletionTransport, GenerationParams, MetricsThresholds,
    NoopOperationHooks, ProviderError, ProviderErrorKind, ProviderOperationHooks, RequestMessage,
    RequestRole, ResilientClient, RetryPolicy, Source, TransportResponse, ValidatedResponse,
};
pub use fcommon::{BoxFuture, CorrelationId};

//! Completion transport trait and reqwest-based HTTP implementation.

use fcommon::{BoxFuture, CorrelationId};

use crate::{CompletionRequest, ProviderError};

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// Raw outcome of one HTTP exchange, before any classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransportResponse {
    pub status: u16,
    pub status_text: String,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl TransportResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            status_text: default_status_text(status).to_string(),
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Issues one POST to the completion endpoint.
///
/// Implementations report only transport-level failures as errors; every HTTP
/// response, whatever its status, is returned as a [`TransportResponse`].
pub trait CompletionTransport: Send + Sync {
    fn send<'a>(
        &'a self,
        request: &'a CompletionRequest,
        correlation_id: &'a CorrelationId,
    ) -> BoxFuture<'a, Result<TransportResponse, ProviderError>>;
}

fn default_status_text(status: u16) -> &'static str {
    match status {
        200 => "OK",
        400 => "Bad Request",
        401 => "Unauthorized",
        403 => "Forbidden",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        502 => "Bad Gateway",
        503 => "Service Unavailable",
        504 => "Gateway Timeout",
        _ => "",
    }
}

#[cfg(feature = "http-transport")]
pub use http::HttpCompletionTransport;

#[cfg(feature = "http-transport")]
mod http {
    use std::time::Duration;

    use fcommon::{BoxFuture, CorrelationId};
    use reqwest::Client;

    use super::{CompletionTransport, REQUEST_ID_HEADER, TransportResponse};
    use crate::{CompletionRequest, ProviderError, SecretString};

    #[derive(Debug, Clone)]
    pub struct HttpCompletionTransport {
        client: Client,
        endpoint: String,
        api_key: Option<SecretString>,
    }

    impl HttpCompletionTransport {
        pub fn new(client: Client, endpoint: impl Into<String>) -> Self {
            Self {
                client,
                endpoint: endpoint.into(),
                api_key: None,
            }
        }

        pub fn with_timeout(
            endpoint: impl Into<String>,
            timeout: Duration,
        ) -> Result<Self, ProviderError> {
            let client = Client::builder()
                .timeout(timeout)
                .build()
                .map_err(|err| ProviderError::transport(err.to_string()))?;
            Ok(Self::new(client, endpoint))
        }

        pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
            self.api_key = Some(SecretString::new(api_key));
            self
        }

        pub fn endpoint(&self) -> &str {
            &self.endpoint
        }
    }

    impl CompletionTransport for HttpCompletionTransport {
        fn send<'a>(
            &'a self,
            request: &'a CompletionRequest,
            correlation_id: &'a CorrelationId,
        ) -> BoxFuture<'a, Result<TransportResponse, ProviderError>> {
            Box::pin(async move {
                let mut builder = self
                    .client
                    .post(&self.endpoint)
                    .header(REQUEST_ID_HEADER, correlation_id.as_str())
                    .json(request);
                if let Some(api_key) = &self.api_key {
                    builder = builder.bearer_auth(api_key.expose());
                }

                let response = builder.send().await.map_err(|err| {
                    if err.is_timeout() {
                        ProviderError::timeout(err.to_string())
                    } else {
                        ProviderError::transport(err.to_string())
                    }
                })?;

                let status = response.status();
                let headers = response
                    .headers()
                    .iter()
                    .filter_map(|(name, value)| {
                        value
                            .to_str()
                            .ok()
                            .map(|value| (name.as_str().to_string(), value.to_string()))
                    })
                    .collect();
                let body = response
                    .text()
                    .await
                    .map_err(|err| ProviderError::transport(err.to_string()))?;

                Ok(TransportResponse {
                    status: status.as_u16(),
                    status_text: status.canonical_reason().unwrap_or_default().to_string(),
                    headers,
                    body,
                })
            })
        }
    }
}

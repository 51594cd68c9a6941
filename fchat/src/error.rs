//! Chat-layer errors and classification.

use std::error::Error;
use std::fmt::{Display, Formatter};

use fprovider::ProviderError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatErrorKind {
    Provider,
    Store,
    Attachment,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatError {
    pub kind: ChatErrorKind,
    pub message: String,
    /// Set when the failure came from the completion client.
    pub provider: Option<ProviderError>,
}

impl ChatError {
    pub fn new(kind: ChatErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            provider: None,
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Store, message)
    }

    pub fn attachment(message: impl Into<String>) -> Self {
        Self::new(ChatErrorKind::Attachment, message)
    }

    pub fn is_rate_limited(&self) -> bool {
        self.provider
            .as_ref()
            .is_some_and(ProviderError::is_rate_limited)
    }
}

impl Display for ChatError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ChatError {}

impl From<ProviderError> for ChatError {
    fn from(value: ProviderError) -> Self {
        Self {
            kind: ChatErrorKind::Provider,
            message: value.to_string(),
            provider: Some(value),
        }
    }
}

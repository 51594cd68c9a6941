//! Application configuration and environment loading.

use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Duration;

use url::Url;

use crate::{
    ChatSettings, DEFAULT_LOG_CAPACITY, MemoryError, MetricsThresholds, PromptStyle,
    ProviderError, RateLimitConfig, RetryPolicy, SecretString, StorageBackendConfig,
};

pub const DEFAULT_ENDPOINT: &str = "https://api.together.xyz/v1/chat/completions";
pub const MIN_API_KEY_LEN: usize = 32;

pub const ENV_ENDPOINT: &str = "WEBCHAT_ENDPOINT";
pub const ENV_API_KEY: &str = "WEBCHAT_API_KEY";
pub const ENV_MODEL: &str = "WEBCHAT_MODEL";
pub const ENV_PROMPT_STYLE: &str = "WEBCHAT_PROMPT_STYLE";
pub const ENV_RATE_LIMIT_PER_MINUTE: &str = "WEBCHAT_RATE_LIMIT_PER_MINUTE";
pub const ENV_MAX_RETRIES: &str = "WEBCHAT_MAX_RETRIES";
pub const ENV_STORAGE: &str = "WEBCHAT_STORAGE";
pub const ENV_LOG_CAPACITY: &str = "WEBCHAT_LOG_CAPACITY";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// A setting is present but unusable.
    InvalidValue,
    InvalidEndpoint,
    InvalidApiKey,
    /// The configured storage backend could not be opened.
    Storage,
    /// The HTTP client could not be constructed.
    Transport,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

impl ConfigError {
    pub fn new(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_value(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidValue, message)
    }

    pub fn invalid_endpoint(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidEndpoint, message)
    }

    pub fn invalid_api_key(message: impl Into<String>) -> Self {
        Self::new(ConfigErrorKind::InvalidApiKey, message)
    }
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}: {}", self.kind, self.message)
    }
}

impl Error for ConfigError {}

impl From<MemoryError> for ConfigError {
    fn from(value: MemoryError) -> Self {
        Self::new(ConfigErrorKind::Storage, value.to_string())
    }
}

impl From<ProviderError> for ConfigError {
    fn from(value: ProviderError) -> Self {
        Self::new(ConfigErrorKind::Transport, value.to_string())
    }
}

/// Everything needed to assemble one chat runtime.
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub endpoint: String,
    pub api_key: Option<SecretString>,
    pub chat: ChatSettings,
    pub retry: RetryPolicy,
    pub rate_limit: RateLimitConfig,
    pub thresholds: MetricsThresholds,
    pub log_capacity: usize,
    pub storage: StorageBackendConfig,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_key: None,
            chat: ChatSettings::default(),
            retry: RetryPolicy::default(),
            rate_limit: RateLimitConfig::default(),
            thresholds: MetricsThresholds::default(),
            log_capacity: DEFAULT_LOG_CAPACITY,
            storage: StorageBackendConfig::default(),
        }
    }
}

impl AppConfig {
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::new(api_key));
        self
    }

    pub fn with_storage(mut self, storage: StorageBackendConfig) -> Self {
        self.storage = storage;
        self
    }

    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Reads `WEBCHAT_*` variables from the process environment and validates
    /// the result. Unset or blank variables keep their defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let mut config = Self::default();

        if let Some(endpoint) = read(ENV_ENDPOINT) {
            config.endpoint = endpoint;
        }
        if let Some(api_key) = read(ENV_API_KEY) {
            config.api_key = Some(SecretString::new(api_key));
        }
        if let Some(model) = read(ENV_MODEL) {
            config.chat = config.chat.with_model(model);
        }
        if let Some(style) = read(ENV_PROMPT_STYLE) {
            let style = PromptStyle::parse(&style).ok_or_else(|| {
                ConfigError::invalid_value(format!(
                    "{ENV_PROMPT_STYLE} must be balanced, creative, precise, or helpful; got '{style}'"
                ))
            })?;
            config.chat = config.chat.with_prompt_style(style);
        }
        if let Some(raw) = read(ENV_RATE_LIMIT_PER_MINUTE) {
            let max_requests = parse_number::<usize>(ENV_RATE_LIMIT_PER_MINUTE, &raw)?;
            config.rate_limit.max_requests = max_requests;
            config.rate_limit.window = Duration::from_secs(60);
        }
        if let Some(raw) = read(ENV_MAX_RETRIES) {
            config.retry.max_retries = parse_number::<u32>(ENV_MAX_RETRIES, &raw)?;
        }
        if let Some(raw) = read(ENV_STORAGE) {
            config.storage = StorageBackendConfig::parse(&raw)
                .map_err(|err| ConfigError::invalid_value(err.message))?;
        }
        if let Some(raw) = read(ENV_LOG_CAPACITY) {
            config.log_capacity = parse_number::<usize>(ENV_LOG_CAPACITY, &raw)?;
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = Url::parse(&self.endpoint).map_err(|err| {
            ConfigError::invalid_endpoint(format!(
                "endpoint '{}' is not a URL: {err}",
                self.endpoint
            ))
        })?;
        if !matches!(endpoint.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_endpoint(format!(
                "endpoint must use http or https, got '{}'",
                endpoint.scheme()
            )));
        }

        if let Some(api_key) = &self.api_key
            && api_key.len() < MIN_API_KEY_LEN
        {
            return Err(ConfigError::invalid_api_key(format!(
                "API key looks truncated; expected at least {MIN_API_KEY_LEN} characters"
            )));
        }

        if self.rate_limit.max_requests == 0 {
            return Err(ConfigError::invalid_value(
                "rate limit must admit at least one request",
            ));
        }
        if self.rate_limit.window.is_zero() {
            return Err(ConfigError::invalid_value("rate limit window must be non-zero"));
        }
        if self.log_capacity == 0 {
            return Err(ConfigError::invalid_value("log capacity must be non-zero"));
        }
        if self.chat.max_messages == 0 {
            return Err(ConfigError::invalid_value(
                "conversation must keep at least one message",
            ));
        }
        if self.retry.attempt_timeout.is_zero() {
            return Err(ConfigError::invalid_value("attempt timeout must be non-zero"));
        }

        Ok(())
    }
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
{
    raw.parse::<T>()
        .map_err(|_| ConfigError::invalid_value(format!("{name} must be a number; got '{raw}'")))
}

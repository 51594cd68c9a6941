//! Completion endpoint payloads and response-shape validation.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RequestRole {
    User,
    Assistant,
    System,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    ImageUrl { image_url: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMessage {
    pub role: RequestRole,
    pub content: MessageContent,
}

impl RequestMessage {
    pub fn text(role: RequestRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: MessageContent::Text(content.into()),
        }
    }

    /// Text plus an inline image, as multimodal endpoints expect it.
    pub fn with_image(
        role: RequestRole,
        text: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            role,
            content: MessageContent::Parts(vec![
                ContentPart::Text { text: text.into() },
                ContentPart::ImageUrl {
                    image_url: image_url.into(),
                },
            ]),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationParams {
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            model: "meta-llama/Llama-3.3-70b-instruct-turbo-free".to_string(),
            max_tokens: 500,
            temperature: 0.7,
            top_p: 0.7,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompletionRequest {
    pub messages: Vec<RequestMessage>,
    pub image: Option<String>,
    pub model: String,
    pub max_tokens: u32,
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,
}

impl CompletionRequest {
    pub fn new(params: &GenerationParams, messages: Vec<RequestMessage>) -> Self {
        Self {
            messages,
            image: None,
            model: params.model.clone(),
            max_tokens: params.max_tokens,
            temperature: params.temperature,
            top_p: params.top_p,
            frequency_penalty: params.frequency_penalty,
            presence_penalty: params.presence_penalty,
        }
    }

    pub fn with_image(mut self, data_uri: impl Into<String>) -> Self {
        self.image = Some(data_uri.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResponseMessage {
    pub content: String,
    pub role: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Choice {
    pub message: ResponseMessage,
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub prompt_tokens: u32,
    #[serde(default)]
    pub completion_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// A provider response whose shape has been checked.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidatedResponse {
    pub choices: Vec<Choice>,
    pub usage: Option<TokenUsage>,
    pub sources: Vec<Source>,
}

impl ValidatedResponse {
    pub fn content(&self) -> &str {
        self.choices
            .first()
            .map(|choice| choice.message.content.as_str())
            .unwrap_or_default()
    }
}

/// Requires a non-empty `choices` array whose entries each carry a message
/// with string `content` and string `role`. Usage and sources are optional
/// and ignored when malformed.
pub fn validate_response(body: &Value) -> Result<ValidatedResponse, String> {
    let choices = body
        .get("choices")
        .ok_or_else(|| "response is missing `choices`".to_string())?
        .as_array()
        .ok_or_else(|| "`choices` is not an array".to_string())?;

    if choices.is_empty() {
        return Err("`choices` is empty".to_string());
    }

    let choices = choices
        .iter()
        .enumerate()
        .map(|(index, choice)| validate_choice(index, choice))
        .collect::<Result<Vec<_>, _>>()?;

    let usage = body
        .get("usage")
        .and_then(|usage| serde_json::from_value::<TokenUsage>(usage.clone()).ok());
    let sources = body
        .get("sources")
        .and_then(|sources| serde_json::from_value::<Vec<Source>>(sources.clone()).ok())
        .unwrap_or_default();

    Ok(ValidatedResponse {
        choices,
        usage,
        sources,
    })
}

fn validate_choice(index: usize, choice: &Value) -> Result<Choice, String> {
    let message = choice
        .get("message")
        .filter(|message| message.is_object())
        .ok_or_else(|| format!("choices[{index}] has no `message` object"))?;

    let content = message
        .get("content")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("choices[{index}].message.content is not a string"))?;
    let role = message
        .get("role")
        .and_then(Value::as_str)
        .ok_or_else(|| format!("choices[{index}].message.role is not a string"))?;

    Ok(Choice {
        message: ResponseMessage {
            content: content.to_string(),
            role: role.to_string(),
        },
        finish_reason: choice
            .get("finish_reason")
            .and_then(Value::as_str)
            .map(str::to_string),
    })
}

/// Reads `{error: string}` or `{error: {message: string}}` from an error body.
pub fn extract_error_message(body: &str) -> Option<String> {
    let parsed = serde_json::from_str::<Value>(body).ok()?;
    match parsed.get("error")? {
        Value::String(message) if !message.trim().is_empty() => Some(message.clone()),
        Value::Object(fields) => fields
            .get("message")
            .and_then(Value::as_str)
            .filter(|message| !message.trim().is_empty())
            .map(str::to_string),
        _ => None,
    }
}

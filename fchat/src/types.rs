//! Conversation, settings, and turn outcome types.

use std::time::Duration;

use fprovider::{GenerationParams, Source};
use serde::{Deserialize, Serialize};

use crate::ChatError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sources: Vec<Source>,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
            sources: Vec::new(),
        }
    }

    pub fn with_sources(mut self, sources: Vec<Source>) -> Self {
        self.sources = sources;
        self
    }
}

/// Snapshot of one conversation as the UI observes it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    pub messages: Vec<ChatMessage>,
    pub is_loading: bool,
    pub error: Option<String>,
}

/// How a `send_message` call ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TurnOutcome {
    /// Nothing to send; state untouched.
    Skipped,
    /// A previous turn is still in flight; state untouched.
    Busy,
    AdmissionDenied {
        retry_after: Duration,
        remaining: usize,
    },
    Resolved {
        message: ChatMessage,
    },
    Failed {
        error: ChatError,
    },
}

impl TurnOutcome {
    pub fn is_resolved(&self) -> bool {
        matches!(self, Self::Resolved { .. })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PromptStyle {
    #[default]
    Balanced,
    Creative,
    Precise,
    Helpful,
}

impl PromptStyle {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Balanced => "balanced",
            Self::Creative => "creative",
            Self::Precise => "precise",
            Self::Helpful => "helpful",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "balanced" => Some(Self::Balanced),
            "creative" => Some(Self::Creative),
            "precise" => Some(Self::Precise),
            "helpful" => Some(Self::Helpful),
            _ => None,
        }
    }

    pub fn system_prompt(self) -> &'static str {
        match self {
            Self::Balanced => {
                "You are a helpful AI assistant that can understand both text and images. \
                 Keep responses clear, concise, accurate, and safe. If you are unsure about \
                 something, say so instead of guessing, and politely decline harmful requests."
            }
            Self::Creative => {
                "You are an imaginative AI assistant that can understand both text and images. \
                 Give inspiring, expressive answers rich with examples and analogies, and offer \
                 unusual perspectives while staying accurate."
            }
            Self::Precise => {
                "You are a precise AI assistant that can understand both text and images. \
                 Give detailed, structured, fact-based answers, use technical terminology where \
                 it helps, and define the terms you use."
            }
            Self::Helpful => {
                "You are a supportive AI assistant that can understand both text and images. \
                 Be warm and patient, keep explanations accessible to every skill level, and \
                 walk through complex topics step by step."
            }
        }
    }
}

pub const DEFAULT_MAX_MESSAGES: usize = 50;

/// Generation parameters plus conversation limits for one orchestrator.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub generation: GenerationParams,
    pub max_messages: usize,
    pub prompt_style: PromptStyle,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            generation: GenerationParams::default(),
            max_messages: DEFAULT_MAX_MESSAGES,
            prompt_style: PromptStyle::default(),
        }
    }
}

impl ChatSettings {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.generation.model = model.into();
        self
    }

    pub fn with_max_messages(mut self, max_messages: usize) -> Self {
        self.max_messages = max_messages.max(1);
        self
    }

    pub fn with_prompt_style(mut self, prompt_style: PromptStyle) -> Self {
        self.prompt_style = prompt_style;
        self
    }
}

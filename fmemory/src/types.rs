//! Persisted preference records and their storage keys.

use fchat::PromptStyle;
use serde::{Deserialize, Serialize};

pub const MESSAGES_KEY: &str = "chat_messages";
pub const THEME_KEY: &str = "theme_preference";
pub const ACCESSIBILITY_KEY: &str = "accessibility_settings";

pub const MAX_STORED_MESSAGES: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThemePreference {
    Light,
    Dark,
    #[default]
    System,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontSize {
    #[default]
    Normal,
    Large,
    Larger,
}

/// Display and prompt preferences, stored as one JSON object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AccessibilitySettings {
    pub reduced_motion: bool,
    pub high_contrast: bool,
    pub font_size: FontSize,
    pub prompt_style: PromptStyle,
}

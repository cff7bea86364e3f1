//! Configuration components
//!
//! Every section defaults to the values the editor ships with, so a config
//! file only needs to name what it overrides.

use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, ConfigResult};

/// Root configuration for the markdown core
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MarkdownConfig {
    /// Suggestion popup limits
    pub suggestion: SuggestionConfig,
    /// Tag defaults
    pub tags: TagConfig,
    /// Item mention defaults
    pub mentions: MentionConfig,
    /// Interactive editor settings
    pub editor: EditorConfig,
    /// Read-only preview settings
    pub preview: PreviewConfig,
}

/// Suggestion popup limits
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SuggestionConfig {
    /// Tags listed when the query after `#` is empty
    pub hashtag_empty_query_limit: usize,
    /// Prefix matches listed for a non-empty hashtag query
    pub hashtag_match_limit: usize,
    /// Items listed for an `@` query
    pub mention_limit: usize,
    /// Whether a mention query may contain spaces
    pub allow_spaces: bool,
}

/// Tag defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagConfig {
    /// Color assigned to tags created from the editor
    pub new_tag_color: String,
    /// Color used for a hashtag whose tag is unknown
    pub fallback_color: String,
}

/// Item mention defaults
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MentionConfig {
    /// Color used when neither a resolver nor the item provides one
    pub fallback_color: String,
}

/// Interactive editor settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditorConfig {
    /// Text shown while the document is empty
    pub placeholder: String,
}

/// Read-only preview settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Visible character limit applied before rendering
    pub truncate_limit: Option<usize>,
}

impl Default for SuggestionConfig {
    fn default() -> Self {
        Self {
            hashtag_empty_query_limit: 8,
            hashtag_match_limit: 7,
            mention_limit: 8,
            allow_spaces: false,
        }
    }
}

impl Default for TagConfig {
    fn default() -> Self {
        Self {
            new_tag_color: "#888888".to_string(),
            fallback_color: "inherit".to_string(),
        }
    }
}

impl Default for MentionConfig {
    fn default() -> Self {
        Self {
            fallback_color: "#3b82f6".to_string(),
        }
    }
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            placeholder: "Write something...".to_string(),
        }
    }
}

impl MarkdownConfig {
    /// Check limits and colors
    pub fn validate(&self) -> ConfigResult<()> {
        let limits = [
            (
                "suggestion.hashtag_empty_query_limit",
                self.suggestion.hashtag_empty_query_limit,
            ),
            (
                "suggestion.hashtag_match_limit",
                self.suggestion.hashtag_match_limit,
            ),
            ("suggestion.mention_limit", self.suggestion.mention_limit),
        ];
        for (name, value) in limits {
            if value == 0 {
                return Err(ConfigError::invalid(format!(
                    "{name} must be greater than zero"
                )));
            }
        }

        let colors = [
            ("tags.new_tag_color", &self.tags.new_tag_color),
            ("tags.fallback_color", &self.tags.fallback_color),
            ("mentions.fallback_color", &self.mentions.fallback_color),
        ];
        for (name, value) in colors {
            if value.trim().is_empty() {
                return Err(ConfigError::invalid(format!("{name} must not be empty")));
            }
        }

        if self.preview.truncate_limit == Some(0) {
            return Err(ConfigError::invalid(
                "preview.truncate_limit must be greater than zero",
            ));
        }

        Ok(())
    }
}

//! Domain records shared by the parser, the editor and the renderers

use serde::{Deserialize, Serialize};

/// Color given to tags created from the editor
pub const DEFAULT_TAG_COLOR: &str = "#888888";

/// Hashtag color when no tag matches the label
pub const FALLBACK_TAG_COLOR: &str = "inherit";

/// Mention color when neither a resolver nor the item provides one
pub const FALLBACK_MENTION_COLOR: &str = "#3b82f6";

/// A tag owned by the external tag collection
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: String,
    /// Display name without `#`, unique case-insensitively
    pub name: String,
    pub color: String,
}

impl Tag {
    pub fn new(id: impl Into<String>, name: impl Into<String>, color: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            color: color.into(),
        }
    }

    /// Create a tag with a random id, as done when a user confirms an unknown hashtag
    pub fn create(name: impl Into<String>, color: impl Into<String>) -> Self {
        Self::new(uuid::Uuid::new_v4().to_string(), name, color)
    }

    /// Case-insensitive name comparison
    pub fn matches_name(&self, name: &str) -> bool {
        self.name.to_lowercase() == name.to_lowercase()
    }
}

/// A mention target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub color: Option<String>,
}

impl Item {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: Some(name.into()),
            color: None,
        }
    }

    pub fn with_color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    /// The name, if present and not blank
    pub fn display_name(&self) -> Option<&str> {
        self.name.as_deref().filter(|name| !name.trim().is_empty())
    }
}

/// Look up a tag by name, ignoring case
pub fn find_tag<'a>(tags: &'a [Tag], name: &str) -> Option<&'a Tag> {
    let needle = name.to_lowercase();
    tags.iter().find(|tag| tag.name.to_lowercase() == needle)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_tag_ignores_case() {
        let tags = vec![Tag::new("1", "Nature", "#00ff00")];
        assert_eq!(find_tag(&tags, "NATURE").map(|t| t.id.as_str()), Some("1"));
        assert_eq!(find_tag(&tags, "nature").map(|t| t.id.as_str()), Some("1"));
        assert!(find_tag(&tags, "natur").is_none());
    }

    #[test]
    fn test_created_tags_get_unique_ids() {
        let a = Tag::create("garden", DEFAULT_TAG_COLOR);
        let b = Tag::create("garden", DEFAULT_TAG_COLOR);
        assert_ne!(a.id, b.id);
        assert_eq!(a.color, "#888888");
    }

    #[test]
    fn test_item_without_name() {
        let item = Item {
            id: "x".into(),
            name: Some("   ".into()),
            color: None,
        };
        assert!(item.display_name().is_none());
    }
}

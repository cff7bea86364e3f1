//! Custom document nodes: hashtag, item mention and video embed
//!
//! Each node implements [`NodeSpec`], the engine-independent contract of
//! parse (markdown and HTML), render and serialize, and registers
//! markdown-it inline rules that produce it. Node views resolve the live
//! presentation (color, cursor, click behavior) against a [`ViewContext`].

pub mod hashtag;
pub mod mention;
pub mod video;

use std::collections::HashMap;
use std::sync::{Arc, LazyLock};

use markdown_it::MarkdownIt;
use regex::Regex;
use utopia_config::MarkdownConfig;

use crate::traits::ItemColorResolver;
use crate::types::{Item, Tag};

pub use hashtag::{HashtagAttrs, HashtagExtension, HashtagNode, HashtagView, add_hashtag_plugin};
pub use mention::{MentionAttrs, MentionExtension, MentionNode, MentionView, add_mention_plugin};
pub use video::{VideoEmbedExtension, VideoEmbedNode, add_video_plugin};

static ATTRIBUTE_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"([a-zA-Z][a-zA-Z0-9-]*)(?:="([^"]*)")?"#).expect("html attribute regex")
});

/// Where a node sits in the document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeGroup {
    Inline,
    Block,
}

/// Parse, render and serialize contract of a custom node.
///
/// All custom nodes are atomic: they have no editable children.
pub trait NodeSpec {
    type Attrs;

    /// Node type name
    const NAME: &'static str;
    const GROUP: NodeGroup;

    /// Recognize the node's markdown form at the start of `src`, returning
    /// the attributes and the bytes consumed
    fn parse_markdown(src: &str) -> Option<(Self::Attrs, usize)>;

    /// Recognize the node's HTML form at the start of `src`
    fn parse_html(src: &str) -> Option<(Self::Attrs, usize)>;

    /// Canonical HTML markup
    fn render_html(attrs: &Self::Attrs) -> String;

    /// Markdown written on save
    fn serialize_markdown(attrs: &Self::Attrs) -> String;
}

/// Cursor shown over an interactive node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cursor {
    /// Read-only: the node is a link or filter trigger
    Pointer,
    /// Editable: clicks place the caret
    Text,
}

impl Cursor {
    pub fn as_css(&self) -> &'static str {
        match self {
            Cursor::Pointer => "pointer",
            Cursor::Text => "text",
        }
    }
}

/// Result of clicking a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeClick {
    /// The node consumed the click
    Handled,
    /// Default behavior applies (caret placement)
    Ignored,
}

/// Data node views resolve against
#[derive(Clone)]
pub struct ViewContext {
    pub tags: Vec<Tag>,
    pub items: Vec<Item>,
    pub item_color: Option<ItemColorResolver>,
    pub editable: bool,
    pub tag_fallback_color: String,
    pub mention_fallback_color: String,
}

impl ViewContext {
    pub fn new(tags: Vec<Tag>, items: Vec<Item>, editable: bool) -> Self {
        let config = MarkdownConfig::default();
        Self {
            tags,
            items,
            item_color: None,
            editable,
            tag_fallback_color: config.tags.fallback_color,
            mention_fallback_color: config.mentions.fallback_color,
        }
    }

    pub fn with_config(mut self, config: &MarkdownConfig) -> Self {
        self.tag_fallback_color = config.tags.fallback_color.clone();
        self.mention_fallback_color = config.mentions.fallback_color.clone();
        self
    }

    pub fn with_item_color(mut self, resolver: Option<ItemColorResolver>) -> Self {
        self.item_color = resolver;
        self
    }

    pub fn cursor(&self) -> Cursor {
        if self.editable {
            Cursor::Text
        } else {
            Cursor::Pointer
        }
    }
}

impl std::fmt::Debug for ViewContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewContext")
            .field("tags", &self.tags.len())
            .field("items", &self.items.len())
            .field("item_color", &self.item_color.is_some())
            .field("editable", &self.editable)
            .finish()
    }
}

/// Install all three node plugins into a markdown-it parser
pub fn add_node_plugins(md: &mut MarkdownIt) {
    add_hashtag_plugin(md);
    add_mention_plugin(md);
    add_video_plugin(md);
}

/// Parse the attributes of an HTML start tag body, unescaping values
pub(crate) fn parse_attributes(tag_body: &str) -> HashMap<String, String> {
    ATTRIBUTE_REGEX
        .captures_iter(tag_body)
        .map(|caps| {
            let value = caps.get(2).map_or("", |m| m.as_str());
            (caps[1].to_string(), unescape_attribute(value))
        })
        .collect()
}

fn unescape_attribute(value: &str) -> String {
    value
        .replace("&quot;", "\"")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Escape text for HTML content and double-quoted attributes
pub(crate) fn escape(text: &str) -> String {
    markdown_it::common::utils::escape_html(text).into_owned()
}

/// Shared handle to a resolver, if any
pub(crate) fn resolve_with(
    resolver: Option<&Arc<dyn Fn(&Item, &str) -> String + Send + Sync>>,
    item: &Item,
    fallback: &str,
) -> Option<String> {
    resolver.map(|resolve| resolve(item, fallback))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_attributes() {
        let attrs = parse_attributes(r#"span data-hashtag data-label="a&amp;b" data-id="7""#);
        assert_eq!(attrs.get("data-label").map(String::as_str), Some("a&b"));
        assert_eq!(attrs.get("data-id").map(String::as_str), Some("7"));
        assert_eq!(attrs.get("data-hashtag").map(String::as_str), Some(""));
    }

    #[test]
    fn test_cursor_follows_editability() {
        assert_eq!(ViewContext::new(vec![], vec![], true).cursor(), Cursor::Text);
        assert_eq!(ViewContext::new(vec![], vec![], false).cursor(), Cursor::Pointer);
    }
}

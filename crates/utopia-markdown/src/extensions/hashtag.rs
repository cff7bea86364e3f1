//! Hashtag node (`#label`)
//!
//! Recognized in free text wherever `#` follows a non-word character, and
//! in the `<span data-hashtag ...>` markup the preprocessor and the HTML
//! renderer emit. Serializes back to the bare `#label`.

use std::sync::LazyLock;

use markdown_it::parser::inline::{InlineRule, InlineState};
use markdown_it::{MarkdownIt, Node, NodeValue, Renderer};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{NodeClick, NodeGroup, NodeSpec, ViewContext, escape, parse_attributes};
use crate::hashtag::{TAG_CHAR_CLASS, decode_tag, is_tag_char, is_valid_label, starts_hashtag_after};
use crate::traits::FilterSink;
use crate::types::{Tag, find_tag};

static HASHTAG_SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r#"^<span(\s[^>]*\bdata-hashtag\b[^>]*)>#?([{TAG_CHAR_CLASS}]*)</span>"#
    ))
    .expect("hashtag span regex")
});

/// Attributes of a hashtag node
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HashtagAttrs {
    /// Tag id, known once the tag exists in the collection
    pub id: Option<String>,
    /// Raw label without `#`
    pub label: String,
}

impl HashtagAttrs {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: None,
            label: label.into(),
        }
    }

    pub fn from_tag(tag: &Tag) -> Self {
        Self {
            id: Some(tag.id.clone()),
            label: tag.name.clone(),
        }
    }
}

/// Hashtag node spec
pub struct HashtagExtension;

impl NodeSpec for HashtagExtension {
    type Attrs = HashtagAttrs;

    const NAME: &'static str = "hashtag";
    const GROUP: NodeGroup = NodeGroup::Inline;

    fn parse_markdown(src: &str) -> Option<(HashtagAttrs, usize)> {
        let rest = src.strip_prefix('#')?;
        let end = rest.find(|c: char| !is_tag_char(c)).unwrap_or(rest.len());
        if end == 0 {
            return None;
        }
        Some((HashtagAttrs::new(&rest[..end]), end + 1))
    }

    fn parse_html(src: &str) -> Option<(HashtagAttrs, usize)> {
        let caps = HASHTAG_SPAN_REGEX.captures(src)?;
        let attrs = parse_attributes(&caps[1]);
        let label = attrs
            .get("data-label")
            .cloned()
            .filter(|label| is_valid_label(label))
            .or_else(|| Some(caps[2].to_string()).filter(|label| is_valid_label(label)))?;
        let id = attrs.get("data-id").cloned().filter(|id| !id.is_empty());
        Some((HashtagAttrs { id, label }, caps[0].len()))
    }

    fn render_html(attrs: &HashtagAttrs) -> String {
        let id = attrs
            .id
            .as_ref()
            .map(|id| format!(r#" data-id="{}""#, escape(id)))
            .unwrap_or_default();
        format!(
            r#"<span data-hashtag{id} data-label="{label}">#{label}</span>"#,
            label = escape(&attrs.label)
        )
    }

    fn serialize_markdown(attrs: &HashtagAttrs) -> String {
        format!("#{}", attrs.label)
    }
}

/// Live presentation of a hashtag
pub struct HashtagView<'a> {
    pub attrs: &'a HashtagAttrs,
    pub ctx: &'a ViewContext,
}

impl<'a> HashtagView<'a> {
    pub fn new(attrs: &'a HashtagAttrs, ctx: &'a ViewContext) -> Self {
        Self { attrs, ctx }
    }

    /// The tag this hashtag refers to, matched by name ignoring case
    pub fn tag(&self) -> Option<&'a Tag> {
        find_tag(&self.ctx.tags, &self.attrs.label)
    }

    pub fn color(&self) -> &'a str {
        self.tag()
            .map(|tag| tag.color.as_str())
            .unwrap_or(self.ctx.tag_fallback_color.as_str())
    }

    /// Label with underscores shown as non-breaking spaces
    pub fn display_text(&self) -> String {
        format!("#{}", decode_tag(&self.attrs.label))
    }

    pub fn render(&self) -> String {
        let id = self
            .attrs
            .id
            .as_ref()
            .map(|id| format!(r#" data-id="{}""#, escape(id)))
            .unwrap_or_default();
        format!(
            r#"<span data-hashtag{id} data-label="{label}" class="hashtag" style="color: {color}; cursor: {cursor}">{text}</span>"#,
            label = escape(&self.attrs.label),
            color = escape(self.color()),
            cursor = self.ctx.cursor().as_css(),
            text = escape(&self.display_text()),
        )
    }

    /// In read-only mode a click adds the matching tag to the active filter
    pub fn click(&self, filter: Option<&dyn FilterSink>) -> NodeClick {
        if self.ctx.editable {
            return NodeClick::Ignored;
        }
        match (self.tag(), filter) {
            (Some(tag), Some(filter)) => {
                tracing::debug!(tag = %tag.name, "hashtag clicked, adding filter");
                filter.add_filter_tag(tag);
                NodeClick::Handled
            }
            _ => NodeClick::Ignored,
        }
    }
}

/// markdown-it node produced by the hashtag rules
#[derive(Debug, Clone)]
pub struct HashtagNode {
    pub attrs: HashtagAttrs,
}

impl NodeValue for HashtagNode {
    fn render(&self, _node: &Node, fmt: &mut dyn Renderer) {
        let mut attrs = vec![("data-hashtag", String::new())];
        if let Some(id) = &self.attrs.id {
            attrs.push(("data-id", id.clone()));
        }
        attrs.push(("data-label", self.attrs.label.clone()));
        fmt.open("span", &attrs);
        fmt.text(&format!("#{}", self.attrs.label));
        fmt.close("span");
    }
}

/// Free-text `#label`
pub struct HashtagScanner;

impl InlineRule for HashtagScanner {
    const MARKER: char = '#';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let prev = state.src[..state.pos].chars().next_back();
        if !starts_hashtag_after(prev) {
            return None;
        }

        let input = &state.src[state.pos..state.pos_max];
        let (attrs, len) = HashtagExtension::parse_markdown(input)?;
        Some((Node::new(HashtagNode { attrs }), len))
    }
}

/// `<span data-hashtag data-label="...">#...</span>`
pub struct HashtagSpanScanner;

impl InlineRule for HashtagSpanScanner {
    const MARKER: char = '<';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let input = &state.src[state.pos..state.pos_max];
        let (attrs, len) = HashtagExtension::parse_html(input)?;
        Some((Node::new(HashtagNode { attrs }), len))
    }
}

/// Add hashtag rules to a markdown-it parser
pub fn add_hashtag_plugin(md: &mut MarkdownIt) {
    md.inline.add_rule::<HashtagSpanScanner>().before_all();
    md.inline.add_rule::<HashtagScanner>();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_hashtags(input: &str) -> Vec<String> {
        let mut md = MarkdownIt::new();
        markdown_it::plugins::cmark::add(&mut md);
        add_hashtag_plugin(&mut md);

        let ast = md.parse(input);
        let mut labels = Vec::new();

        fn walk(node: &Node, labels: &mut Vec<String>) {
            if let Some(tag) = node.cast::<HashtagNode>() {
                labels.push(tag.attrs.label.clone());
            }
            for child in &node.children {
                walk(child, labels);
            }
        }

        walk(&ast, &mut labels);
        labels
    }

    #[test]
    fn test_free_text_hashtags() {
        assert_eq!(parse_hashtags("Hello #world and #open_source"), vec!["world", "open_source"]);
    }

    #[test]
    fn test_hashtag_requires_boundary() {
        assert!(parse_hashtags("test#tag").is_empty());
        assert!(parse_hashtags("Just # alone").is_empty());
    }

    #[test]
    fn test_heading_is_not_a_hashtag() {
        assert_eq!(parse_hashtags("# Title with #tag"), vec!["tag"]);
    }

    #[test]
    fn test_placeholder_span() {
        let input = r#"Go <span data-hashtag data-label="hiking">#hiking</span> now"#;
        assert_eq!(parse_hashtags(input), vec!["hiking"]);
    }

    #[test]
    fn test_parse_html_reads_id() {
        let src = r#"<span data-hashtag data-id="t1" data-label="x">#x</span>"#;
        let (attrs, len) = HashtagExtension::parse_html(src).unwrap();
        assert_eq!(attrs.id.as_deref(), Some("t1"));
        assert_eq!(attrs.label, "x");
        assert_eq!(len, src.len());
    }

    #[test]
    fn test_render_round_trips_through_parse_html() {
        let attrs = HashtagAttrs {
            id: Some("7".into()),
            label: "café".into(),
        };
        let html = HashtagExtension::render_html(&attrs);
        let (parsed, _) = HashtagExtension::parse_html(&html).unwrap();
        assert_eq!(parsed, attrs);
    }

    #[test]
    fn test_view_color_and_click() {
        use std::sync::{Arc, Mutex};

        let tags = vec![Tag::new("1", "Nature", "#00aa00")];
        let read_only = ViewContext::new(tags.clone(), vec![], false);
        let attrs = HashtagAttrs::new("nature");
        let view = HashtagView::new(&attrs, &read_only);
        assert_eq!(view.color(), "#00aa00");

        let clicked = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let clicked = clicked.clone();
            move |tag: &Tag| clicked.lock().unwrap().push(tag.id.clone())
        };
        assert_eq!(view.click(Some(&sink)), NodeClick::Handled);
        assert_eq!(*clicked.lock().unwrap(), vec!["1"]);

        let editable = ViewContext::new(tags, vec![], true);
        let view = HashtagView::new(&attrs, &editable);
        assert_eq!(view.click(Some(&sink)), NodeClick::Ignored);
        assert!(view.render().contains("cursor: text"));
    }

    #[test]
    fn test_unknown_label_uses_fallback() {
        let ctx = ViewContext::new(vec![], vec![], false);
        let attrs = HashtagAttrs::new("open_source");
        let view = HashtagView::new(&attrs, &ctx);
        assert_eq!(view.color(), "inherit");
        assert_eq!(view.display_text(), "#open\u{00A0}source");
    }
}

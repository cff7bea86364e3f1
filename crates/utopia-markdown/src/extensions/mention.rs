//! Item mention node (`[@Label](/item/id)`)
//!
//! The legacy form `[@Label](/item/layer/id)` is still read; only the
//! two-segment form is written.

use std::sync::LazyLock;

use markdown_it::parser::inline::{InlineRule, InlineState};
use markdown_it::{MarkdownIt, Node, NodeValue, Renderer};
use regex::Regex;
use serde::{Deserialize, Serialize};

use super::{NodeClick, NodeGroup, NodeSpec, ViewContext, escape, parse_attributes, resolve_with};
use crate::traits::Navigator;
use crate::types::Item;

static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\[@((?:[^\]\\\n]|\\.)+)\]\(/item/(?:[^/()\s]+/)?([A-Za-z0-9_-]+)\)")
        .expect("mention regex")
});

static MENTION_SPAN_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"^<span(\s[^>]*\bdata-type="mention"[^>]*)>[^<]*</span>"#)
        .expect("mention span regex")
});

static ESCAPED_CHAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\\(.)").expect("escaped char regex"));

/// Attributes of an item mention
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MentionAttrs {
    pub id: String,
    pub label: String,
}

impl MentionAttrs {
    pub fn new(id: impl Into<String>, label: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            label: label.into(),
        }
    }

    /// Client-side route of the mentioned item
    pub fn path(&self) -> String {
        format!("/item/{}", self.id)
    }
}

/// Item mention node spec
pub struct MentionExtension;

impl NodeSpec for MentionExtension {
    type Attrs = MentionAttrs;

    const NAME: &'static str = "itemMention";
    const GROUP: NodeGroup = NodeGroup::Inline;

    fn parse_markdown(src: &str) -> Option<(MentionAttrs, usize)> {
        let caps = MENTION_REGEX.captures(src)?;
        let label = ESCAPED_CHAR_REGEX.replace_all(&caps[1], "$1").into_owned();
        Some((MentionAttrs::new(&caps[2], label), caps[0].len()))
    }

    fn parse_html(src: &str) -> Option<(MentionAttrs, usize)> {
        let caps = MENTION_SPAN_REGEX.captures(src)?;
        let attrs = parse_attributes(&caps[1]);
        let id = attrs.get("data-id").filter(|id| !id.is_empty())?.clone();
        let label = attrs.get("data-label").cloned().unwrap_or_default();
        Some((MentionAttrs { id, label }, caps[0].len()))
    }

    fn render_html(attrs: &MentionAttrs) -> String {
        format!(
            r#"<span data-type="mention" data-id="{id}" data-label="{label}">@{label}</span>"#,
            id = escape(&attrs.id),
            label = escape(&attrs.label),
        )
    }

    fn serialize_markdown(attrs: &MentionAttrs) -> String {
        let mut label = String::with_capacity(attrs.label.len());
        for c in attrs.label.chars() {
            if matches!(c, '[' | ']' | '\\') {
                label.push('\\');
            }
            label.push(c);
        }
        format!("[@{label}](/item/{})", attrs.id)
    }
}

/// Live presentation of a mention
pub struct MentionView<'a> {
    pub attrs: &'a MentionAttrs,
    pub ctx: &'a ViewContext,
}

impl<'a> MentionView<'a> {
    pub fn new(attrs: &'a MentionAttrs, ctx: &'a ViewContext) -> Self {
        Self { attrs, ctx }
    }

    pub fn item(&self) -> Option<&'a Item> {
        self.ctx.items.iter().find(|item| item.id == self.attrs.id)
    }

    /// Resolver first, then the item's own color, then the fallback
    pub fn color(&self) -> String {
        let fallback = self.ctx.mention_fallback_color.as_str();
        let Some(item) = self.item() else {
            return fallback.to_string();
        };
        resolve_with(self.ctx.item_color.as_ref(), item, fallback)
            .or_else(|| item.color.clone())
            .unwrap_or_else(|| fallback.to_string())
    }

    pub fn render(&self) -> String {
        format!(
            r#"<span data-type="mention" data-id="{id}" data-label="{label}" class="item-mention" style="color: {color}; cursor: {cursor}">@{label}</span>"#,
            id = escape(&self.attrs.id),
            label = escape(&self.attrs.label),
            color = escape(&self.color()),
            cursor = self.ctx.cursor().as_css(),
        )
    }

    /// In read-only mode a click navigates to the item
    pub fn click(&self, navigator: Option<&dyn Navigator>) -> NodeClick {
        if self.ctx.editable {
            return NodeClick::Ignored;
        }
        let Some(navigator) = navigator else {
            return NodeClick::Ignored;
        };
        let path = self.attrs.path();
        tracing::debug!(%path, "mention clicked");
        navigator.navigate(&path);
        NodeClick::Handled
    }
}

/// markdown-it node produced by the mention rules
#[derive(Debug, Clone)]
pub struct MentionNode {
    pub attrs: MentionAttrs,
}

impl NodeValue for MentionNode {
    fn render(&self, _node: &Node, fmt: &mut dyn Renderer) {
        fmt.open(
            "span",
            &[
                ("data-type", "mention".to_string()),
                ("data-id", self.attrs.id.clone()),
                ("data-label", self.attrs.label.clone()),
            ],
        );
        fmt.text(&format!("@{}", self.attrs.label));
        fmt.close("span");
    }
}

/// `[@Label](/item/id)`
pub struct MentionScanner;

impl InlineRule for MentionScanner {
    const MARKER: char = '[';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let input = &state.src[state.pos..state.pos_max];
        let (attrs, len) = MentionExtension::parse_markdown(input)?;
        Some((Node::new(MentionNode { attrs }), len))
    }
}

/// `<span data-type="mention" ...>`
pub struct MentionSpanScanner;

impl InlineRule for MentionSpanScanner {
    const MARKER: char = '<';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let input = &state.src[state.pos..state.pos_max];
        let (attrs, len) = MentionExtension::parse_html(input)?;
        Some((Node::new(MentionNode { attrs }), len))
    }
}

/// Add mention rules to a markdown-it parser. They run before the link
/// rule so the mention wins over a plain link.
pub fn add_mention_plugin(md: &mut MarkdownIt) {
    md.inline.add_rule::<MentionScanner>().before_all();
    md.inline.add_rule::<MentionSpanScanner>().before_all();
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};
    use test_case::test_case;

    #[test_case("[@Alice](/item/abc-123)", "abc-123", "Alice" ; "current form")]
    #[test_case("[@Alice](/item/layer1/abc-123)", "abc-123", "Alice" ; "legacy form")]
    #[test_case(r"[@A \[b\]](/item/x)", "x", "A [b]" ; "escaped brackets")]
    fn test_parse_markdown(src: &str, id: &str, label: &str) {
        let (attrs, len) = MentionExtension::parse_markdown(src).unwrap();
        assert_eq!(attrs, MentionAttrs::new(id, label));
        assert_eq!(len, src.len());
    }

    #[test_case("[Alice](/item/abc)" ; "missing at sign")]
    #[test_case("[@Alice](/items/abc)" ; "wrong route")]
    #[test_case("[@Alice](https://example.com)" ; "external link")]
    fn test_not_a_mention(src: &str) {
        assert!(MentionExtension::parse_markdown(src).is_none());
    }

    #[test]
    fn test_serialize_writes_current_form() {
        let (attrs, _) = MentionExtension::parse_markdown("[@Alice](/item/layer1/abc)").unwrap();
        assert_eq!(MentionExtension::serialize_markdown(&attrs), "[@Alice](/item/abc)");

        let tricky = MentionAttrs::new("x", "A [b]");
        let md = MentionExtension::serialize_markdown(&tricky);
        assert_eq!(md, r"[@A \[b\]](/item/x)");
        assert_eq!(MentionExtension::parse_markdown(&md).unwrap().0, tricky);
    }

    #[test]
    fn test_parse_html() {
        let html = MentionExtension::render_html(&MentionAttrs::new("abc", "Alice & Bob"));
        let (attrs, len) = MentionExtension::parse_html(&html).unwrap();
        assert_eq!(attrs, MentionAttrs::new("abc", "Alice & Bob"));
        assert_eq!(len, html.len());
    }

    #[test]
    fn test_color_priority() {
        let items = vec![
            Item::new("a", "Alice").with_color("#ff0000"),
            Item::new("b", "Bob"),
        ];
        let mut ctx = ViewContext::new(vec![], items, false);
        let alice = MentionAttrs::new("a", "Alice");
        let bob = MentionAttrs::new("b", "Bob");
        let ghost = MentionAttrs::new("zzz", "Ghost");

        assert_eq!(MentionView::new(&alice, &ctx).color(), "#ff0000");
        assert_eq!(MentionView::new(&bob, &ctx).color(), "#3b82f6");
        assert_eq!(MentionView::new(&ghost, &ctx).color(), "#3b82f6");

        ctx.item_color = Some(Arc::new(|item: &Item, _fallback: &str| {
            format!("resolved-{}", item.id)
        }));
        assert_eq!(MentionView::new(&alice, &ctx).color(), "resolved-a");
    }

    #[test]
    fn test_click_navigates_when_read_only() {
        let visited = Arc::new(Mutex::new(Vec::new()));
        let navigator = {
            let visited = visited.clone();
            move |path: &str| visited.lock().unwrap().push(path.to_string())
        };
        let attrs = MentionAttrs::new("abc", "Alice");

        let ctx = ViewContext::new(vec![], vec![], false);
        assert_eq!(
            MentionView::new(&attrs, &ctx).click(Some(&navigator)),
            NodeClick::Handled
        );
        assert_eq!(*visited.lock().unwrap(), vec!["/item/abc"]);

        let ctx = ViewContext::new(vec![], vec![], true);
        assert_eq!(
            MentionView::new(&attrs, &ctx).click(Some(&navigator)),
            NodeClick::Ignored
        );
        assert_eq!(visited.lock().unwrap().len(), 1);
    }
}

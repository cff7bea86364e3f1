//! [`Document`] to HTML through the node views

use super::{Block, Document, Inline, Mark};
use crate::extensions::{HashtagView, MentionView, NodeSpec, VideoEmbedExtension, ViewContext, escape};
use crate::preprocess::is_safe_href;

/// Render a document; an empty document shows `placeholder` when given
pub fn render_document(doc: &Document, ctx: &ViewContext, placeholder: Option<&str>) -> String {
    if doc.is_empty() {
        return match placeholder {
            Some(text) => format!(
                r#"<p class="is-editor-empty" data-placeholder="{}"></p>"#,
                escape(text)
            ),
            None => String::new(),
        };
    }
    render_blocks(&doc.blocks, ctx)
}

fn render_blocks(blocks: &[Block], ctx: &ViewContext) -> String {
    blocks.iter().map(|block| render_block(block, ctx)).collect()
}

fn render_block(block: &Block, ctx: &ViewContext) -> String {
    match block {
        Block::Paragraph { content } => format!("<p>{}</p>", render_inlines(content, ctx)),
        Block::Heading { level, content } => {
            format!("<h{level}>{}</h{level}>", render_inlines(content, ctx))
        }
        Block::Blockquote { blocks } => {
            format!("<blockquote>{}</blockquote>", render_blocks(blocks, ctx))
        }
        Block::BulletList { items } => format!("<ul>{}</ul>", render_items(items, ctx)),
        Block::OrderedList { start, items } => {
            let start = if *start == 1 {
                String::new()
            } else {
                format!(r#" start="{start}""#)
            };
            format!("<ol{start}>{}</ol>", render_items(items, ctx))
        }
        Block::CodeBlock { language, code } => {
            let class = language
                .as_ref()
                .map(|lang| format!(r#" class="language-{}""#, escape(lang)))
                .unwrap_or_default();
            format!("<pre><code{class}>{}</code></pre>", escape(code))
        }
        Block::HorizontalRule => "<hr>".to_string(),
        Block::VideoEmbed(video) => VideoEmbedExtension::render_html(video),
    }
}

fn render_items(items: &[Vec<Block>], ctx: &ViewContext) -> String {
    items
        .iter()
        .map(|item| format!("<li>{}</li>", render_blocks(item, ctx)))
        .collect()
}

/// Render inline content, opening and closing mark tags as runs change
pub fn render_inlines(content: &[Inline], ctx: &ViewContext) -> String {
    let mut out = String::new();
    let mut open: Vec<Mark> = Vec::new();

    for inline in content {
        let target = inline.marks();
        let keep = open
            .iter()
            .position(|mark| !target.contains(mark))
            .unwrap_or(open.len());
        while open.len() > keep {
            if let Some(mark) = open.pop() {
                out.push_str(close_tag(&mark));
            }
        }
        for mark in target {
            if !open.contains(mark) {
                out.push_str(&open_tag(mark));
                open.push(mark.clone());
            }
        }

        match inline {
            Inline::Text { text, .. } => out.push_str(&escape(text)),
            Inline::Hashtag(attrs) => out.push_str(&HashtagView::new(attrs, ctx).render()),
            Inline::ItemMention(attrs) => out.push_str(&MentionView::new(attrs, ctx).render()),
            Inline::HardBreak => out.push_str("<br>"),
        }
    }

    while let Some(mark) = open.pop() {
        out.push_str(close_tag(&mark));
    }

    out
}

fn open_tag(mark: &Mark) -> String {
    match mark {
        Mark::Link { href, .. } if !is_safe_href(href) => "<span>".to_string(),
        Mark::Link { href, title } => {
            let title = title
                .as_ref()
                .map(|t| format!(r#" title="{}""#, escape(t)))
                .unwrap_or_default();
            let target = if href.starts_with('/') || href.starts_with('#') {
                ""
            } else {
                r#" target="_blank" rel="noopener noreferrer""#
            };
            format!(r#"<a href="{}"{title}{target}>"#, escape(href))
        }
        Mark::Bold => "<strong>".to_string(),
        Mark::Italic => "<em>".to_string(),
        Mark::Code => "<code>".to_string(),
    }
}

fn close_tag(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { href, .. } if !is_safe_href(href) => "</span>",
        Mark::Link { .. } => "</a>",
        Mark::Bold => "</strong>",
        Mark::Italic => "</em>",
        Mark::Code => "</code>",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_markdown;
    use crate::types::Tag;

    #[test]
    fn test_paragraph_with_colored_hashtag() {
        let ctx = ViewContext::new(vec![Tag::new("1", "world", "#0a0")], vec![], false);
        let html = render_document(&parse_markdown("Hello #world"), &ctx, None);
        assert!(html.starts_with("<p>Hello <span data-hashtag"));
        assert!(html.contains(r#"style="color: #0a0; cursor: pointer""#));
        assert!(html.ends_with(">#world</span></p>"));
    }

    #[test]
    fn test_text_is_escaped() {
        let ctx = ViewContext::new(vec![], vec![], false);
        let html = render_document(&parse_markdown("a <b> & c"), &ctx, None);
        assert_eq!(html, "<p>a &lt;b&gt; &amp; c</p>");
    }

    #[test]
    fn test_placeholder_for_empty_document() {
        let ctx = ViewContext::new(vec![], vec![], true);
        let html = render_document(&Document::empty(), &ctx, Some("Write something..."));
        assert!(html.contains(r#"data-placeholder="Write something...""#));
    }

    #[test]
    fn test_unsafe_link_is_not_clickable() {
        let ctx = ViewContext::new(vec![], vec![], false);
        let html = render_document(&parse_markdown("[x](javascript:alert(1))"), &ctx, None);
        assert!(!html.contains("href"));
    }

    #[test]
    fn test_links_and_breaks() {
        let ctx = ViewContext::new(vec![], vec![], false);
        let html = render_document(&parse_markdown("[x](/map)\n**b**"), &ctx, None);
        assert_eq!(html, r#"<p><a href="/map">x</a><br><strong>b</strong></p>"#);
    }
}

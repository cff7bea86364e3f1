//! Editor-free HTML rendering
//!
//! [`simple_markdown_to_html`] turns preprocessed markdown into HTML that
//! looks like the interactive editor's output, for lists and previews
//! where mounting an editor per entry is too expensive. It is a separate
//! implementation, not a wrapper around the document renderer: only the
//! URL builders, the hashtag codec and the preprocessor are shared.
//!
//! The input is HTML-escaped first. Only the exact placeholder tags the
//! preprocessor emits are turned back into markup, so any other `<...>` in
//! user text stays inert.

use std::sync::LazyLock;

use markdown_it::common::utils::escape_html;
use regex::{Captures, Regex};
use tracing::trace;

use crate::hashtag::{TAG_CHAR_CLASS, decode_tag};
use crate::preprocess::{is_safe_href, preprocess_markdown};
use crate::traits::{FilterSink, ItemColorResolver, Navigator};
use crate::types::{FALLBACK_MENTION_COLOR, FALLBACK_TAG_COLOR, Item, Tag, find_tag};
use crate::video::{VideoProvider, embed_url, sanitize_video_id};

const NODE_OPEN: char = '\u{E000}';
const NODE_CLOSE: char = '\u{E001}';
const HREF_OPEN: char = '\u{E002}';
const HREF_CLOSE: char = '\u{E003}';

static NODE_SENTINEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E000}(\\d+)\u{E001}").expect("node sentinel regex"));

static HREF_SENTINEL_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new("\u{E002}(\\d+)\u{E003}").expect("href sentinel regex"));

static ESCAPED_VIDEO_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"&lt;video-embed provider=&quot;(youtube|rumble)&quot; video-id=&quot;([A-Za-z0-9_-]+)&quot;&gt;&lt;/video-embed&gt;",
    )
    .expect("escaped video regex")
});

static ESCAPED_HASHTAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"&lt;span data-hashtag data-label=&quot;([{TAG_CHAR_CLASS}]+)&quot;&gt;#[{TAG_CHAR_CLASS}]+&lt;/span&gt;"
    ))
    .expect("escaped hashtag regex")
});

static MENTION_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\[@([^\]\n]+)\]\(/item/(?:[^/)\s]+/)?([A-Za-z0-9_-]+)\)").expect("lite mention regex")
});

static LINK_TARGET_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[([^\]\n]*)\]\(([^)\s]+)\)").expect("link target regex"));

static BOLD_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*\*(.+?)\*\*|__(.+?)__").expect("bold regex"));

static ITALIC_STAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\*([^*\n]+)\*").expect("italic regex"));

static ITALIC_UNDERSCORE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\b_([^_\n]+)_\b").expect("italic underscore regex"));

static CODE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"`([^`\n]+)`").expect("inline code regex"));

static LINK_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new("\\[([^\\]\\n]*)\\]\\(\u{E002}(\\d+)\u{E003}\\)").expect("lite link regex")
});

static HEADER_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^(#{1,6}) (.+)$").expect("header regex"));

static BLOCKQUOTE_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^&gt; ?(.*)$").expect("blockquote regex"));

static PARAGRAPH_BREAK_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n{2,}").expect("paragraph break regex"));

/// Data the renderer resolves colors against
#[derive(Clone, Copy)]
pub struct LiteOptions<'a> {
    pub items: &'a [Item],
    pub item_color: Option<&'a ItemColorResolver>,
    pub tag_fallback_color: &'a str,
    pub mention_fallback_color: &'a str,
}

impl<'a> LiteOptions<'a> {
    pub fn new(items: &'a [Item]) -> Self {
        Self {
            items,
            item_color: None,
            tag_fallback_color: FALLBACK_TAG_COLOR,
            mention_fallback_color: FALLBACK_MENTION_COLOR,
        }
    }

    pub fn with_item_color(mut self, resolver: &'a ItemColorResolver) -> Self {
        self.item_color = Some(resolver);
        self
    }

    fn mention_color(&self, id: &str) -> String {
        let Some(item) = self.items.iter().find(|item| item.id == id) else {
            trace!(id, "mention of unknown item");
            return self.mention_fallback_color.to_string();
        };
        match self.item_color {
            Some(resolve) => resolve(item, self.mention_fallback_color),
            None => item
                .color
                .clone()
                .unwrap_or_else(|| self.mention_fallback_color.to_string()),
        }
    }
}

impl Default for LiteOptions<'_> {
    fn default() -> Self {
        LiteOptions::new(&[])
    }
}

/// Markup substituted back in at the end, out of reach of the regex passes
#[derive(Default)]
struct Stash {
    nodes: Vec<(String, bool)>,
    hrefs: Vec<String>,
}

impl Stash {
    fn node(&mut self, html: String, is_block: bool) -> String {
        self.nodes.push((html, is_block));
        format!("{NODE_OPEN}{}{NODE_CLOSE}", self.nodes.len() - 1)
    }

    fn href(&mut self, href: &str) -> String {
        self.hrefs.push(href.to_string());
        format!("{HREF_OPEN}{}{HREF_CLOSE}", self.hrefs.len() - 1)
    }

    fn is_block_sentinel(&self, line: &str) -> bool {
        NODE_SENTINEL_REGEX
            .captures(line)
            .filter(|caps| caps[0].len() == line.len())
            .and_then(|caps| caps[1].parse::<usize>().ok())
            .and_then(|index| self.nodes.get(index))
            .is_some_and(|(_, is_block)| *is_block)
    }

    fn restore(&self, html: &str) -> String {
        let html = NODE_SENTINEL_REGEX.replace_all(html, |caps: &Captures| {
            caps[1]
                .parse::<usize>()
                .ok()
                .and_then(|index| self.nodes.get(index))
                .map(|(node, _)| node.clone())
                .unwrap_or_default()
        });
        HREF_SENTINEL_REGEX
            .replace_all(&html, |caps: &Captures| self.lookup_href(&caps[1]))
            .into_owned()
    }

    fn lookup_href(&self, index: &str) -> String {
        index
            .parse::<usize>()
            .ok()
            .and_then(|index| self.hrefs.get(index))
            .cloned()
            .unwrap_or_default()
    }
}

/// Render markdown to HTML without an editor
pub fn simple_markdown_to_html(text: &str, tags: &[Tag], options: &LiteOptions<'_>) -> String {
    let cleaned: String = text
        .chars()
        .filter(|c| !matches!(*c, NODE_OPEN | NODE_CLOSE | HREF_OPEN | HREF_CLOSE))
        .collect();
    let prepared = preprocess_markdown(&cleaned);
    let escaped = escape_html(&prepared).into_owned();
    let mut stash = Stash::default();

    let html = ESCAPED_VIDEO_REGEX.replace_all(&escaped, |caps: &Captures| {
        let provider = caps[1].parse::<VideoProvider>().unwrap_or(VideoProvider::YouTube);
        stash.node(video_html(provider, &caps[2]), true)
    });

    let html = ESCAPED_HASHTAG_REGEX.replace_all(&html, |caps: &Captures| {
        let label = &caps[1];
        let color = find_tag(tags, label)
            .map(|tag| tag.color.clone())
            .unwrap_or_else(|| {
                trace!(label, "hashtag without tag");
                options.tag_fallback_color.to_string()
            });
        stash.node(hashtag_html(label, &color), false)
    });

    let html = CODE_REGEX.replace_all(&html, |caps: &Captures| {
        stash.node(format!("<code>{}</code>", &caps[1]), false)
    });

    let html = MENTION_REGEX.replace_all(&html, |caps: &Captures| {
        let color = options.mention_color(&caps[2]);
        stash.node(mention_html(&caps[2], &caps[1], &color), false)
    });

    let html = LINK_TARGET_REGEX.replace_all(&html, |caps: &Captures| {
        format!("[{}]({})", &caps[1], stash.href(&caps[2]))
    });

    let html = BOLD_REGEX.replace_all(&html, |caps: &Captures| {
        let inner = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
        format!("<strong>{inner}</strong>")
    });
    let html = ITALIC_STAR_REGEX.replace_all(&html, "<em>$1</em>");
    let html = ITALIC_UNDERSCORE_REGEX.replace_all(&html, "<em>$1</em>");

    let html = LINK_REGEX.replace_all(&html, |caps: &Captures| {
        let text = &caps[1];
        let href = stash.lookup_href(&caps[2]);
        link_html(text, &href)
    });

    let html = HEADER_REGEX.replace_all(&html, |caps: &Captures| {
        let level = caps[1].len();
        format!("<h{level}>{}</h{level}>", &caps[2])
    });
    let html = BLOCKQUOTE_REGEX.replace_all(&html, "<blockquote>$1</blockquote>");

    let html = paragraphs(&html, &stash);
    stash.restore(&html)
}

fn paragraphs(html: &str, stash: &Stash) -> String {
    let mut out = String::new();

    for chunk in PARAGRAPH_BREAK_REGEX.split(html) {
        let mut lines: Vec<&str> = Vec::new();
        for line in chunk.split('\n') {
            let trimmed = line.trim();
            let is_block = trimmed.starts_with("<h")
                || trimmed.starts_with("<blockquote>")
                || stash.is_block_sentinel(trimmed);
            if is_block {
                flush_paragraph(&mut lines, &mut out);
                out.push_str(trimmed);
            } else {
                lines.push(line);
            }
        }
        flush_paragraph(&mut lines, &mut out);
    }

    out
}

fn flush_paragraph(lines: &mut Vec<&str>, out: &mut String) {
    let content = lines.join("<br>");
    lines.clear();
    let trimmed = content.trim();
    if trimmed.is_empty() || trimmed.split("<br>").all(|part| part.trim().is_empty()) {
        return;
    }
    out.push_str("<p>");
    out.push_str(trimmed);
    out.push_str("</p>");
}

fn video_html(provider: VideoProvider, video_id: &str) -> String {
    let id = sanitize_video_id(video_id);
    format!(
        r#"<div class="video-embed" data-video-embed data-provider="{provider}" data-video-id="{id}"><iframe src="{src}" width="100%" height="315" frameborder="0" allow="accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture" allowfullscreen></iframe></div>"#,
        src = embed_url(provider, &id),
    )
}

fn hashtag_html(label: &str, color: &str) -> String {
    format!(
        r#"<span data-hashtag data-label="{label}" class="hashtag" style="color: {color}">#{text}</span>"#,
        color = escape_html(color),
        text = decode_tag(label),
    )
}

/// `label` arrives HTML-escaped
fn mention_html(id: &str, label: &str, color: &str) -> String {
    format!(
        r#"<a href="/item/{id}" data-type="mention" data-id="{id}" data-label="{label}" class="item-mention" style="color: {color}">@{label}</a>"#,
        color = escape_html(color),
    )
}

/// `text` and `href` arrive HTML-escaped
fn link_html(text: &str, href: &str) -> String {
    if !is_safe_href(href) {
        trace!(href, "unsafe link rendered as text");
        return text.to_string();
    }
    if href.starts_with('/') || href.starts_with('#') {
        format!(r#"<a href="{href}">{text}</a>"#)
    } else {
        format!(r#"<a href="{href}" target="_blank" rel="noopener noreferrer">{text}</a>"#)
    }
}

/// Element a click landed on, reduced to what the container handler needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickTarget {
    Hashtag { label: String },
    Link { href: String },
    Other,
}

impl ClickTarget {
    /// Classify by the attributes of the closest element carrying
    /// `data-hashtag` or `href`
    pub fn from_attributes(attributes: &[(&str, &str)]) -> Self {
        let get = |name: &str| attributes.iter().find(|(n, _)| *n == name).map(|(_, v)| *v);
        if get("data-hashtag").is_some() {
            if let Some(label) = get("data-label") {
                return ClickTarget::Hashtag {
                    label: label.to_string(),
                };
            }
        }
        match get("href") {
            Some(href) => ClickTarget::Link {
                href: href.to_string(),
            },
            None => ClickTarget::Other,
        }
    }
}

/// Whether the host should suppress the browser's default action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClickOutcome {
    PreventDefault,
    Default,
}

/// Container-level click handling for lite-rendered HTML.
///
/// A hashtag click filters by its tag; a relative link navigates in-app;
/// everything else, external links included, keeps the default.
pub fn handle_container_click(
    target: &ClickTarget,
    tags: &[Tag],
    navigator: Option<&dyn Navigator>,
    filter: Option<&dyn FilterSink>,
) -> ClickOutcome {
    match target {
        ClickTarget::Hashtag { label } => {
            let (Some(tag), Some(filter)) = (find_tag(tags, label), filter) else {
                trace!(%label, "hashtag click without tag or filter");
                return ClickOutcome::Default;
            };
            tracing::debug!(tag = %tag.name, "hashtag clicked, adding filter");
            filter.add_filter_tag(tag);
            ClickOutcome::PreventDefault
        }
        ClickTarget::Link { href } if href.starts_with('/') && !href.starts_with("//") => {
            match navigator {
                Some(navigator) => {
                    tracing::debug!(%href, "in-app navigation");
                    navigator.navigate(href);
                    ClickOutcome::PreventDefault
                }
                None => ClickOutcome::Default,
            }
        }
        _ => ClickOutcome::Default,
    }
}

//! Video embed node
//!
//! Block-level atom stored in markdown as the autolink `<canonical-url>`.
//! A `[text](video-url)` link and the preprocessor's `<video-embed>`
//! placeholder are also recognized. Pasting a single video URL inserts the
//! node directly.

use std::sync::LazyLock;

use markdown_it::parser::inline::{InlineRule, InlineState};
use markdown_it::{MarkdownIt, Node, NodeValue, Renderer};
use regex::Regex;

use super::{NodeGroup, NodeSpec, escape, parse_attributes};
use crate::video::{VideoProvider, VideoRef, match_autolink, match_markdown_link, match_pasted_text, sanitize_video_id};

static VIDEO_PLACEHOLDER_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^<video-embed(\s[^>]*)?>\s*</video-embed>").expect("video placeholder regex")
});

const IFRAME_ALLOW: &str =
    "accelerometer; autoplay; clipboard-write; encrypted-media; gyroscope; picture-in-picture";

/// Video embed node spec
pub struct VideoEmbedExtension;

impl NodeSpec for VideoEmbedExtension {
    type Attrs = VideoRef;

    const NAME: &'static str = "videoEmbed";
    const GROUP: NodeGroup = NodeGroup::Block;

    fn parse_markdown(src: &str) -> Option<(VideoRef, usize)> {
        match_autolink(src).or_else(|| match_markdown_link(src))
    }

    fn parse_html(src: &str) -> Option<(VideoRef, usize)> {
        let caps = VIDEO_PLACEHOLDER_REGEX.captures(src)?;
        let attrs = parse_attributes(caps.get(1).map_or("", |m| m.as_str()));
        let provider = attrs.get("provider")?.parse::<VideoProvider>().ok()?;
        let video_id = sanitize_video_id(attrs.get("video-id")?);
        if video_id.is_empty() {
            return None;
        }
        Some((VideoRef::new(provider, video_id), caps[0].len()))
    }

    fn render_html(video: &VideoRef) -> String {
        format!(
            r#"<div class="video-embed" data-video-embed data-provider="{provider}" data-video-id="{id}"><iframe src="{src}" width="100%" height="315" frameborder="0" allow="{IFRAME_ALLOW}" allowfullscreen></iframe></div>"#,
            provider = video.provider,
            id = escape(&sanitize_video_id(&video.video_id)),
            src = escape(&video.embed_url()),
        )
    }

    fn serialize_markdown(video: &VideoRef) -> String {
        format!("<{}>", video.canonical_url())
    }
}

impl VideoEmbedExtension {
    /// Paste handler: a paste made of exactly one video URL becomes a node
    pub fn handle_paste(text: &str) -> Option<VideoRef> {
        let video = match_pasted_text(text)?;
        tracing::debug!(provider = %video.provider, id = %video.video_id, "pasted video url");
        Some(video)
    }
}

/// markdown-it node produced by the video rules. Inline while parsing;
/// the document converter lifts it to block level.
#[derive(Debug, Clone)]
pub struct VideoEmbedNode {
    pub video: VideoRef,
}

impl NodeValue for VideoEmbedNode {
    fn render(&self, _node: &Node, fmt: &mut dyn Renderer) {
        fmt.open(
            "div",
            &[
                ("class", "video-embed".to_string()),
                ("data-provider", self.video.provider.to_string()),
                ("data-video-id", self.video.video_id.clone()),
            ],
        );
        fmt.open(
            "iframe",
            &[
                ("src", self.video.embed_url()),
                ("allow", IFRAME_ALLOW.to_string()),
                ("allowfullscreen", String::new()),
            ],
        );
        fmt.close("iframe");
        fmt.close("div");
    }
}

/// `<video-url>` autolinks and `<video-embed>` placeholders
pub struct VideoScanner;

impl InlineRule for VideoScanner {
    const MARKER: char = '<';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let input = &state.src[state.pos..state.pos_max];
        let (video, len) = match_autolink(input).or_else(|| VideoEmbedExtension::parse_html(input))?;
        Some((Node::new(VideoEmbedNode { video }), len))
    }
}

/// `[text](video-url)`
pub struct VideoLinkScanner;

impl InlineRule for VideoLinkScanner {
    const MARKER: char = '[';

    fn run(state: &mut InlineState) -> Option<(Node, usize)> {
        let input = &state.src[state.pos..state.pos_max];
        let (video, len) = match_markdown_link(input)?;
        Some((Node::new(VideoEmbedNode { video }), len))
    }
}

/// Add video rules to a markdown-it parser, ahead of the autolink and link rules
pub fn add_video_plugin(md: &mut MarkdownIt) {
    md.inline.add_rule::<VideoScanner>().before_all();
    md.inline.add_rule::<VideoLinkScanner>().before_all();
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_videos(input: &str) -> Vec<VideoRef> {
        let mut md = MarkdownIt::new();
        markdown_it::plugins::cmark::add(&mut md);
        add_video_plugin(&mut md);

        let ast = md.parse(input);
        let mut videos = Vec::new();

        fn walk(node: &Node, videos: &mut Vec<VideoRef>) {
            if let Some(embed) = node.cast::<VideoEmbedNode>() {
                videos.push(embed.video.clone());
            }
            for child in &node.children {
                walk(child, videos);
            }
        }

        walk(&ast, &mut videos);
        videos
    }

    #[test]
    fn test_three_forms_are_one_node() {
        let expected = VideoRef::new(VideoProvider::YouTube, "dQw4w9WgXcQ");
        for input in [
            "<https://youtu.be/dQw4w9WgXcQ>",
            "[clip](https://www.youtube.com/watch?v=dQw4w9WgXcQ)",
            r#"<video-embed provider="youtube" video-id="dQw4w9WgXcQ"></video-embed>"#,
        ] {
            assert_eq!(parse_videos(input), vec![expected.clone()], "{input}");
        }
    }

    #[test]
    fn test_other_links_stay_links() {
        assert!(parse_videos("<https://example.com> [x](https://vimeo.com/1)").is_empty());
    }

    #[test]
    fn test_placeholder_rejects_unknown_provider() {
        let src = r#"<video-embed provider="vimeo" video-id="123"></video-embed>"#;
        assert!(VideoEmbedExtension::parse_html(src).is_none());
    }

    #[test]
    fn test_serialize_canonical() {
        let video = VideoRef::new(VideoProvider::Rumble, "v4abc12");
        assert_eq!(
            VideoEmbedExtension::serialize_markdown(&video),
            "<https://rumble.com/embed/v4abc12>"
        );
        assert!(VideoEmbedExtension::render_html(&video)
            .contains(r#"src="https://rumble.com/embed/v4abc12/""#));
    }
}

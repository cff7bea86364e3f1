//! Markdown to [`Document`]
//!
//! Parses with markdown-it (CommonMark rules plus the hashtag, mention and
//! video plugins) and converts the AST. Soft and hard line breaks both
//! become [`Inline::HardBreak`]. Video nodes found inside a paragraph are
//! lifted out, splitting the paragraph around them.

use markdown_it::parser::core::Root;
use markdown_it::parser::inline::{Text, TextSpecial};
use markdown_it::plugins::cmark::block::blockquote::Blockquote;
use markdown_it::plugins::cmark::block::code::CodeBlock as MdCodeBlock;
use markdown_it::plugins::cmark::block::fence::CodeFence;
use markdown_it::plugins::cmark::block::heading::ATXHeading;
use markdown_it::plugins::cmark::block::hr::ThematicBreak;
use markdown_it::plugins::cmark::block::lheading::SetextHeader;
use markdown_it::plugins::cmark::block::list::{BulletList, ListItem, OrderedList};
use markdown_it::plugins::cmark::block::paragraph::Paragraph;
use markdown_it::plugins::cmark::inline::autolink::Autolink;
use markdown_it::plugins::cmark::inline::backticks::CodeInline;
use markdown_it::plugins::cmark::inline::emphasis::{Em, Strong};
use markdown_it::plugins::cmark::inline::image::Image;
use markdown_it::plugins::cmark::inline::link::Link;
use markdown_it::plugins::cmark::inline::newline::{Hardbreak, Softbreak};
use markdown_it::{MarkdownIt, Node};

use super::{Block, Document, Inline, Mark, canonical_marks, normalize, serialize, trim_content};
use crate::extensions::{HashtagNode, MentionNode, VideoEmbedNode, add_node_plugins};
use crate::video::VideoRef;

/// Markdown parser and serializer with the custom nodes installed
pub struct MarkdownCodec {
    md: MarkdownIt,
}

impl MarkdownCodec {
    pub fn new() -> Self {
        let mut md = MarkdownIt::new();
        markdown_it::plugins::cmark::add(&mut md);
        add_node_plugins(&mut md);
        Self { md }
    }

    pub fn parse(&self, markdown: &str) -> Document {
        let ast = self.md.parse(markdown);
        let doc = DocumentConverter::convert(&ast);
        tracing::trace!(blocks = doc.blocks.len(), "parsed markdown");
        doc
    }

    pub fn serialize(&self, doc: &Document) -> String {
        serialize::to_markdown(doc)
    }
}

impl Default for MarkdownCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for MarkdownCodec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MarkdownCodec").finish_non_exhaustive()
    }
}

/// Parse markdown with a fresh codec
pub fn parse_markdown(markdown: &str) -> Document {
    MarkdownCodec::new().parse(markdown)
}

/// Inline conversion result: an inline node, or a video to lift out
enum Piece {
    Inline(Inline),
    Video(VideoRef),
}

/// Converts the markdown-it AST to a [`Document`]
struct DocumentConverter;

impl DocumentConverter {
    fn convert(root: &Node) -> Document {
        let children = if root.is::<Root>() {
            &root.children[..]
        } else {
            std::slice::from_ref(root)
        };
        Document::new(Self::blocks(children))
    }

    fn blocks(nodes: &[Node]) -> Vec<Block> {
        let mut blocks = Vec::new();
        let mut loose_inlines: Vec<&Node> = Vec::new();

        for node in nodes {
            if Self::is_block(node) {
                Self::flush_inlines(&mut loose_inlines, &mut blocks);
                Self::block(node, &mut blocks);
            } else {
                loose_inlines.push(node);
            }
        }
        Self::flush_inlines(&mut loose_inlines, &mut blocks);

        blocks
    }

    /// Tight list items hold inline nodes without a paragraph around them
    fn flush_inlines(pending: &mut Vec<&Node>, blocks: &mut Vec<Block>) {
        if pending.is_empty() {
            return;
        }
        let mut pieces = Vec::new();
        for node in pending.drain(..) {
            Self::inline(node, &[], &mut pieces);
        }
        Self::push_textblock(pieces, Block::paragraph, blocks);
    }

    fn is_block(node: &Node) -> bool {
        node.is::<Paragraph>()
            || node.is::<ATXHeading>()
            || node.is::<SetextHeader>()
            || node.is::<Blockquote>()
            || node.is::<BulletList>()
            || node.is::<OrderedList>()
            || node.is::<CodeFence>()
            || node.is::<MdCodeBlock>()
            || node.is::<ThematicBreak>()
    }

    fn block(node: &Node, out: &mut Vec<Block>) {
        if node.is::<Paragraph>() {
            let pieces = Self::inlines(&node.children);
            Self::push_textblock(pieces, Block::paragraph, out);
            return;
        }

        let heading_level = node
            .cast::<ATXHeading>()
            .map(|h| h.level)
            .or_else(|| node.cast::<SetextHeader>().map(|h| h.level));
        if let Some(level) = heading_level {
            let pieces = Self::inlines(&node.children);
            Self::push_textblock(pieces, |content| Block::Heading { level, content }, out);
            return;
        }

        if node.is::<Blockquote>() {
            out.push(Block::Blockquote {
                blocks: Self::blocks(&node.children),
            });
            return;
        }

        if node.is::<BulletList>() {
            out.push(Block::BulletList {
                items: Self::list_items(node),
            });
            return;
        }

        if let Some(list) = node.cast::<OrderedList>() {
            out.push(Block::OrderedList {
                start: list.start,
                items: Self::list_items(node),
            });
            return;
        }

        if let Some(fence) = node.cast::<CodeFence>() {
            let language = fence.info.split_whitespace().next().map(str::to_string);
            out.push(Block::CodeBlock {
                language,
                code: fence.content.clone(),
            });
            return;
        }

        if let Some(code) = node.cast::<MdCodeBlock>() {
            out.push(Block::CodeBlock {
                language: None,
                code: code.content.clone(),
            });
            return;
        }

        if node.is::<ThematicBreak>() {
            out.push(Block::HorizontalRule);
        }
    }

    fn list_items(list: &Node) -> Vec<Vec<Block>> {
        list.children
            .iter()
            .filter(|child| child.is::<ListItem>())
            .map(|item| Self::blocks(&item.children))
            .collect()
    }

    /// Emit a text block, lifting videos out of it
    fn push_textblock(pieces: Vec<Piece>, make: impl Fn(Vec<Inline>) -> Block, out: &mut Vec<Block>) {
        let has_video = pieces.iter().any(|p| matches!(p, Piece::Video(_)));
        if !has_video {
            let content: Vec<Inline> = pieces
                .into_iter()
                .filter_map(|p| match p {
                    Piece::Inline(inline) => Some(inline),
                    Piece::Video(_) => None,
                })
                .collect();
            out.push(make(normalize(content)));
            return;
        }

        let mut current = Vec::new();
        for piece in pieces {
            match piece {
                Piece::Inline(inline) => current.push(inline),
                Piece::Video(video) => {
                    if let Some(content) = trimmed(std::mem::take(&mut current)) {
                        out.push(make(content));
                    }
                    out.push(Block::VideoEmbed(video));
                }
            }
        }
        if let Some(content) = trimmed(current) {
            out.push(make(content));
        }
    }

    fn inlines(nodes: &[Node]) -> Vec<Piece> {
        let mut pieces = Vec::new();
        for node in nodes {
            Self::inline(node, &[], &mut pieces);
        }
        pieces
    }

    fn inline(node: &Node, marks: &[Mark], out: &mut Vec<Piece>) {
        let in_link = marks.iter().any(Mark::is_link);

        if let Some(text) = node.cast::<Text>() {
            push_text(out, &text.content, marks);
            return;
        }

        if let Some(text) = node.cast::<TextSpecial>() {
            push_text(out, &text.content, marks);
            return;
        }

        if node.is::<Softbreak>() || node.is::<Hardbreak>() {
            out.push(Piece::Inline(Inline::HardBreak));
            return;
        }

        if node.is::<Strong>() {
            Self::inline_children(node, marks, Mark::Bold, out);
            return;
        }

        if node.is::<Em>() {
            Self::inline_children(node, marks, Mark::Italic, out);
            return;
        }

        if node.is::<CodeInline>() {
            let mut code_marks = marks.to_vec();
            code_marks.push(Mark::Code);
            push_text(out, &collect_text(node), &canonical_marks(code_marks));
            return;
        }

        if let Some(link) = node.cast::<Link>() {
            let mark = Mark::Link {
                href: link.url.clone(),
                title: link.title.clone(),
            };
            Self::inline_children(node, marks, mark, out);
            return;
        }

        if let Some(link) = node.cast::<Autolink>() {
            let mark = Mark::Link {
                href: link.url.clone(),
                title: None,
            };
            Self::inline_children(node, marks, mark, out);
            return;
        }

        if node.is::<Image>() {
            push_text(out, &collect_text(node), marks);
            return;
        }

        // Atoms inside link text degrade to their text form
        if let Some(tag) = node.cast::<HashtagNode>() {
            if in_link {
                push_text(out, &format!("#{}", tag.attrs.label), marks);
            } else {
                out.push(Piece::Inline(Inline::Hashtag(tag.attrs.clone())));
            }
            return;
        }

        if let Some(mention) = node.cast::<MentionNode>() {
            if in_link {
                push_text(out, &format!("@{}", mention.attrs.label), marks);
            } else {
                out.push(Piece::Inline(Inline::ItemMention(mention.attrs.clone())));
            }
            return;
        }

        if let Some(embed) = node.cast::<VideoEmbedNode>() {
            if in_link {
                push_text(out, &embed.video.canonical_url(), marks);
            } else {
                out.push(Piece::Video(embed.video.clone()));
            }
            return;
        }

        for child in node.children.iter() {
            Self::inline(child, marks, out);
        }
    }

    fn inline_children(node: &Node, marks: &[Mark], mark: Mark, out: &mut Vec<Piece>) {
        let mut inner = marks.to_vec();
        inner.push(mark);
        let inner = canonical_marks(inner);
        for child in node.children.iter() {
            Self::inline(child, &inner, out);
        }
    }
}

fn push_text(out: &mut Vec<Piece>, text: &str, marks: &[Mark]) {
    if text.is_empty() {
        return;
    }
    out.push(Piece::Inline(Inline::Text {
        text: text.to_string(),
        marks: marks.to_vec(),
    }));
}

/// Strip whitespace and breaks left at the edges of a split paragraph;
/// `None` when nothing remains
fn trimmed(content: Vec<Inline>) -> Option<Vec<Inline>> {
    let content = trim_content(content);
    (!content.is_empty()).then_some(content)
}

/// Plain text of a node tree
fn collect_text(node: &Node) -> String {
    let mut text = String::new();

    if let Some(t) = node.cast::<Text>() {
        text.push_str(&t.content);
    }
    if let Some(t) = node.cast::<TextSpecial>() {
        text.push_str(&t.content);
    }

    for child in node.children.iter() {
        text.push_str(&collect_text(child));
    }

    text
}

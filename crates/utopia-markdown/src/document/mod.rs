//! Structured document model
//!
//! A [`Document`] is a list of blocks. Text blocks (paragraphs and
//! headings) hold inline content: marked text runs, hard breaks and the
//! atomic hashtag and mention nodes. Video embeds are block-level atoms.
//!
//! Offsets inside inline content count characters; every atom and hard
//! break counts as one.
//!
//! Blockquotes and lists are containers. Every other block is a leaf, and
//! leaves are addressed by their index in document order, so a paragraph
//! inside a list item is reached the same way as a top-level one.

pub mod html;
pub mod parse;
pub mod serialize;

use serde::{Deserialize, Serialize};

use crate::extensions::{HashtagAttrs, MentionAttrs};
use crate::video::VideoRef;

pub use html::render_document;
pub use parse::{MarkdownCodec, parse_markdown};
pub use serialize::to_markdown;

/// Character standing in for an atom in [`text_before`]
pub const OBJECT_REPLACEMENT: char = '\u{FFFC}';

/// Formatting applied to a text run
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Mark {
    Link { href: String, title: Option<String> },
    Bold,
    Italic,
    Code,
}

impl Mark {
    /// Nesting rank: outer marks sort first
    pub fn rank(&self) -> u8 {
        match self {
            Mark::Link { .. } => 0,
            Mark::Bold => 1,
            Mark::Italic => 2,
            Mark::Code => 3,
        }
    }

    pub fn is_link(&self) -> bool {
        matches!(self, Mark::Link { .. })
    }
}

/// Sort marks into nesting order and drop duplicates
pub fn canonical_marks(mut marks: Vec<Mark>) -> Vec<Mark> {
    marks.sort_by_key(Mark::rank);
    marks.dedup_by(|a, b| a.rank() == b.rank());
    marks
}

/// Inline content of a text block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Inline {
    Text { text: String, marks: Vec<Mark> },
    Hashtag(HashtagAttrs),
    ItemMention(MentionAttrs),
    HardBreak,
}

impl Inline {
    pub fn text(text: impl Into<String>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: Vec::new(),
        }
    }

    pub fn marked(text: impl Into<String>, marks: Vec<Mark>) -> Self {
        Inline::Text {
            text: text.into(),
            marks: canonical_marks(marks),
        }
    }

    pub fn hashtag(label: impl Into<String>) -> Self {
        Inline::Hashtag(HashtagAttrs::new(label))
    }

    pub fn mention(id: impl Into<String>, label: impl Into<String>) -> Self {
        Inline::ItemMention(MentionAttrs::new(id, label))
    }

    /// Width in offset units
    pub fn size(&self) -> usize {
        match self {
            Inline::Text { text, .. } => text.chars().count(),
            _ => 1,
        }
    }

    pub fn is_atom(&self) -> bool {
        matches!(self, Inline::Hashtag(_) | Inline::ItemMention(_))
    }

    pub fn marks(&self) -> &[Mark] {
        match self {
            Inline::Text { marks, .. } => marks,
            _ => &[],
        }
    }
}

/// A top-level or nested block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Block {
    Paragraph { content: Vec<Inline> },
    Heading { level: u8, content: Vec<Inline> },
    Blockquote { blocks: Vec<Block> },
    BulletList { items: Vec<Vec<Block>> },
    OrderedList { start: u32, items: Vec<Vec<Block>> },
    CodeBlock { language: Option<String>, code: String },
    HorizontalRule,
    VideoEmbed(VideoRef),
}

impl Block {
    pub fn paragraph(content: Vec<Inline>) -> Self {
        Block::Paragraph { content }
    }

    /// Inline content of a text block
    pub fn content(&self) -> Option<&[Inline]> {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => Some(content.as_slice()),
            _ => None,
        }
    }

    /// The same kind of text block holding `content`
    pub fn with_content(&self, content: Vec<Inline>) -> Option<Block> {
        match self {
            Block::Paragraph { .. } => Some(Block::Paragraph { content }),
            Block::Heading { level, .. } => Some(Block::Heading {
                level: *level,
                content,
            }),
            _ => None,
        }
    }

    pub fn is_textblock(&self) -> bool {
        self.content().is_some()
    }

    /// Anything but a blockquote or list
    pub fn is_leaf(&self) -> bool {
        !matches!(
            self,
            Block::Blockquote { .. } | Block::BulletList { .. } | Block::OrderedList { .. }
        )
    }

    /// Number of leaf blocks this block holds, itself included
    pub fn leaf_count(&self) -> usize {
        match self {
            Block::Blockquote { blocks } => leaf_count(blocks),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                items.iter().map(|item| leaf_count(item)).sum()
            }
            _ => 1,
        }
    }

    /// Size of the block's content in offset units
    pub fn content_size(&self) -> usize {
        self.content().map_or(0, content_size)
    }

    fn visit_inlines<'a>(&'a self, out: &mut Vec<&'a Inline>) {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => out.extend(content),
            Block::Blockquote { blocks } => blocks.iter().for_each(|b| b.visit_inlines(out)),
            Block::BulletList { items } | Block::OrderedList { items, .. } => items
                .iter()
                .flatten()
                .for_each(|b| b.visit_inlines(out)),
            _ => {}
        }
    }

    fn visit_videos<'a>(&'a self, out: &mut Vec<&'a VideoRef>) {
        match self {
            Block::VideoEmbed(video) => out.push(video),
            Block::Blockquote { blocks } => blocks.iter().for_each(|b| b.visit_videos(out)),
            Block::BulletList { items } | Block::OrderedList { items, .. } => {
                items.iter().flatten().for_each(|b| b.visit_videos(out))
            }
            _ => {}
        }
    }

    fn for_each_inline_mut(&mut self, f: &mut dyn FnMut(&mut Inline)) {
        match self {
            Block::Paragraph { content } | Block::Heading { content, .. } => {
                content.iter_mut().for_each(f)
            }
            Block::Blockquote { blocks } => blocks.iter_mut().for_each(|b| b.for_each_inline_mut(f)),
            Block::BulletList { items } | Block::OrderedList { items, .. } => items
                .iter_mut()
                .flatten()
                .for_each(|b| b.for_each_inline_mut(f)),
            _ => {}
        }
    }
}

/// A parsed document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    pub fn new(blocks: Vec<Block>) -> Self {
        Self { blocks }
    }

    /// A document holding a single empty paragraph
    pub fn empty() -> Self {
        Self::new(vec![Block::paragraph(Vec::new())])
    }

    /// No blocks, or only paragraphs without content
    pub fn is_empty(&self) -> bool {
        self.blocks.iter().all(|block| match block {
            Block::Paragraph { content } => content.is_empty(),
            _ => false,
        })
    }

    /// Every inline node in document order, nested blocks included
    pub fn inlines(&self) -> Vec<&Inline> {
        let mut out = Vec::new();
        self.blocks.iter().for_each(|b| b.visit_inlines(&mut out));
        out
    }

    pub fn hashtags(&self) -> Vec<&HashtagAttrs> {
        self.inlines()
            .into_iter()
            .filter_map(|inline| match inline {
                Inline::Hashtag(attrs) => Some(attrs),
                _ => None,
            })
            .collect()
    }

    pub fn mentions(&self) -> Vec<&MentionAttrs> {
        self.inlines()
            .into_iter()
            .filter_map(|inline| match inline {
                Inline::ItemMention(attrs) => Some(attrs),
                _ => None,
            })
            .collect()
    }

    pub fn videos(&self) -> Vec<&VideoRef> {
        let mut out = Vec::new();
        self.blocks.iter().for_each(|b| b.visit_videos(&mut out));
        out
    }

    /// Apply `f` to every inline node, nested blocks included
    pub fn for_each_inline_mut(&mut self, mut f: impl FnMut(&mut Inline)) {
        for block in &mut self.blocks {
            block.for_each_inline_mut(&mut f);
        }
    }

    pub fn leaf_count(&self) -> usize {
        leaf_count(&self.blocks)
    }

    /// The leaf block at `index` in document order
    pub fn leaf(&self, index: usize) -> Option<&Block> {
        leaf_in(&self.blocks, index)
    }

    pub fn leaf_mut(&mut self, index: usize) -> Option<&mut Block> {
        leaf_in_mut(&mut self.blocks, index)
    }

    /// Put `replacement` where leaf `index` is. Returns false if there is
    /// no such leaf.
    pub fn replace_leaf(&mut self, index: usize, replacement: Vec<Block>) -> bool {
        replace_in(&mut self.blocks, index, replacement)
    }

    /// Remove leaf `index`, along with any list item, list or blockquote
    /// left empty
    pub fn remove_leaf(&mut self, index: usize) -> Option<Block> {
        remove_in(&mut self.blocks, index)
    }

    /// Split text block `index` into `left` and a paragraph holding
    /// `right`. A block directly inside a list item splits the item.
    pub fn split_leaf(&mut self, index: usize, left: Vec<Inline>, right: Vec<Inline>) -> bool {
        split_in(&mut self.blocks, index, left, right)
    }
}

fn leaf_count(blocks: &[Block]) -> usize {
    blocks.iter().map(Block::leaf_count).sum()
}

/// Child of `blocks` holding leaf `leaf`, and the leaf's index inside it
fn locate(blocks: &[Block], mut leaf: usize) -> Option<(usize, usize)> {
    for (index, block) in blocks.iter().enumerate() {
        let count = block.leaf_count();
        if leaf < count {
            return Some((index, leaf));
        }
        leaf -= count;
    }
    None
}

fn locate_item(items: &[Vec<Block>], mut leaf: usize) -> Option<(usize, usize)> {
    for (index, item) in items.iter().enumerate() {
        let count = leaf_count(item);
        if leaf < count {
            return Some((index, leaf));
        }
        leaf -= count;
    }
    None
}

fn leaf_in(blocks: &[Block], leaf: usize) -> Option<&Block> {
    let (index, inner) = locate(blocks, leaf)?;
    match &blocks[index] {
        Block::Blockquote { blocks } => leaf_in(blocks, inner),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let (item, inner) = locate_item(items, inner)?;
            leaf_in(&items[item], inner)
        }
        block => Some(block),
    }
}

fn leaf_in_mut(blocks: &mut [Block], leaf: usize) -> Option<&mut Block> {
    let (index, inner) = locate(blocks, leaf)?;
    match &mut blocks[index] {
        Block::Blockquote { blocks } => leaf_in_mut(blocks, inner),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let (item, inner) = locate_item(items, inner)?;
            leaf_in_mut(&mut items[item], inner)
        }
        block => Some(block),
    }
}

fn replace_in(blocks: &mut Vec<Block>, leaf: usize, replacement: Vec<Block>) -> bool {
    let Some((index, inner)) = locate(blocks, leaf) else {
        return false;
    };
    if blocks[index].is_leaf() {
        blocks.splice(index..=index, replacement);
        return true;
    }
    match &mut blocks[index] {
        Block::Blockquote { blocks } => replace_in(blocks, inner, replacement),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            match locate_item(items, inner) {
                Some((item, inner)) => replace_in(&mut items[item], inner, replacement),
                None => false,
            }
        }
        _ => false,
    }
}

fn remove_in(blocks: &mut Vec<Block>, leaf: usize) -> Option<Block> {
    let (index, inner) = locate(blocks, leaf)?;
    if blocks[index].is_leaf() {
        return Some(blocks.remove(index));
    }
    let removed = match &mut blocks[index] {
        Block::Blockquote { blocks } => remove_in(blocks, inner),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let (item, inner) = locate_item(items, inner)?;
            let removed = remove_in(&mut items[item], inner);
            if leaf_count(&items[item]) == 0 {
                items.remove(item);
            }
            removed
        }
        _ => None,
    };
    if blocks[index].leaf_count() == 0 {
        blocks.remove(index);
    }
    removed
}

fn split_in(blocks: &mut Vec<Block>, leaf: usize, left: Vec<Inline>, right: Vec<Inline>) -> bool {
    let Some((index, inner)) = locate(blocks, leaf) else {
        return false;
    };
    if blocks[index].is_leaf() {
        let Some(first) = blocks[index].with_content(left) else {
            return false;
        };
        blocks[index] = first;
        blocks.insert(index + 1, Block::paragraph(right));
        return true;
    }
    match &mut blocks[index] {
        Block::Blockquote { blocks } => split_in(blocks, inner, left, right),
        Block::BulletList { items } | Block::OrderedList { items, .. } => {
            let Some((item, inner)) = locate_item(items, inner) else {
                return false;
            };
            let Some((child, _)) = locate(&items[item], inner) else {
                return false;
            };
            if !items[item][child].is_leaf() {
                return split_in(&mut items[item], inner, left, right);
            }
            let Some(first) = items[item][child].with_content(left) else {
                return false;
            };
            let rest = items[item].split_off(child + 1);
            items[item][child] = first;
            let mut next = vec![Block::paragraph(right)];
            next.extend(rest);
            items.insert(item + 1, next);
            true
        }
        _ => false,
    }
}

/// Total size of inline content in offset units
pub fn content_size(content: &[Inline]) -> usize {
    content.iter().map(Inline::size).sum()
}

/// Merge adjacent text runs with equal marks and drop empty runs
pub fn normalize(content: Vec<Inline>) -> Vec<Inline> {
    let mut out: Vec<Inline> = Vec::with_capacity(content.len());
    for inline in content {
        if let Inline::Text { text, marks } = &inline {
            if text.is_empty() {
                continue;
            }
            if let Some(Inline::Text {
                text: prev_text,
                marks: prev_marks,
            }) = out.last_mut()
            {
                if prev_marks == marks {
                    prev_text.push_str(text);
                    continue;
                }
            }
        }
        out.push(inline);
    }
    out
}

/// Drop whitespace and hard breaks at both edges of inline content
pub fn trim_content(content: Vec<Inline>) -> Vec<Inline> {
    let mut content = normalize(content);

    while let Some(last) = content.last_mut() {
        match last {
            Inline::HardBreak => {
                content.pop();
            }
            Inline::Text { text, .. } => {
                let kept = text.trim_end().len();
                if kept == 0 {
                    content.pop();
                } else {
                    text.truncate(kept);
                    break;
                }
            }
            _ => break,
        }
    }

    let leading = content
        .iter()
        .position(|inline| match inline {
            Inline::HardBreak => false,
            Inline::Text { text, .. } => !text.trim_start().is_empty(),
            _ => true,
        })
        .unwrap_or(content.len());
    content.drain(..leading);
    if let Some(Inline::Text { text, .. }) = content.first_mut() {
        *text = text.trim_start().to_string();
    }

    content
}

/// Split inline content at `offset`, cutting a text run if needed
pub fn split_content(content: &[Inline], offset: usize) -> (Vec<Inline>, Vec<Inline>) {
    let mut left = Vec::new();
    let mut right = Vec::new();
    let mut pos = 0;

    for inline in content {
        let size = inline.size();
        if pos + size <= offset {
            left.push(inline.clone());
        } else if pos >= offset {
            right.push(inline.clone());
        } else if let Inline::Text { text, marks } = inline {
            let cut = byte_offset(text, offset - pos);
            left.push(Inline::Text {
                text: text[..cut].to_string(),
                marks: marks.clone(),
            });
            right.push(Inline::Text {
                text: text[cut..].to_string(),
                marks: marks.clone(),
            });
        }
        pos += size;
    }

    (left, right)
}

/// Replace the range `from..to` with `insert`
pub fn replace_content(content: &[Inline], from: usize, to: usize, insert: Vec<Inline>) -> Vec<Inline> {
    let (mut out, _) = split_content(content, from);
    let (_, tail) = split_content(content, to.max(from));
    out.extend(insert);
    out.extend(tail);
    normalize(out)
}

/// Text from the start of the block to `offset`, atoms shown as U+FFFC
/// and hard breaks as `\n`
pub fn text_before(content: &[Inline], offset: usize) -> String {
    let (left, _) = split_content(content, offset);
    left.iter()
        .map(|inline| match inline {
            Inline::Text { text, .. } => text.clone(),
            Inline::HardBreak => "\n".to_string(),
            _ => OBJECT_REPLACEMENT.to_string(),
        })
        .collect()
}

/// The node occupying `offset..offset + 1`, if it is not text
pub fn node_at(content: &[Inline], offset: usize) -> Option<&Inline> {
    let mut pos = 0;
    for inline in content {
        let size = inline.size();
        if offset < pos + size {
            return (!matches!(inline, Inline::Text { .. })).then_some(inline);
        }
        pos += size;
    }
    None
}

/// Marks a character typed at `offset` inherits: those of the run before it
pub fn marks_at(content: &[Inline], offset: usize) -> Vec<Mark> {
    let (left, _) = split_content(content, offset);
    match left.last() {
        Some(Inline::Text { marks, .. }) => marks.iter().filter(|m| !m.is_link()).cloned().collect(),
        _ => Vec::new(),
    }
}

fn byte_offset(text: &str, chars: usize) -> usize {
    text.char_indices().nth(chars).map_or(text.len(), |(i, _)| i)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Vec<Inline> {
        vec![
            Inline::text("Hi "),
            Inline::hashtag("world"),
            Inline::marked(" bold", vec![Mark::Bold]),
        ]
    }

    #[test]
    fn test_atoms_count_as_one() {
        assert_eq!(content_size(&sample()), 3 + 1 + 5);
    }

    #[test]
    fn test_split_inside_text() {
        let (left, right) = split_content(&sample(), 5);
        assert_eq!(left.len(), 3);
        assert_eq!(left[2], Inline::marked(" ", vec![Mark::Bold]));
        assert_eq!(right, vec![Inline::marked("bold", vec![Mark::Bold])]);
    }

    #[test]
    fn test_replace_merges_runs() {
        let content = vec![Inline::text("ab")];
        let out = replace_content(&content, 1, 1, vec![Inline::text("X")]);
        assert_eq!(out, vec![Inline::text("aXb")]);
    }

    #[test]
    fn test_text_before_marks_atoms() {
        assert_eq!(text_before(&sample(), 6), "Hi \u{FFFC} b");
    }

    #[test]
    fn test_node_at() {
        assert_eq!(node_at(&sample(), 3), Some(&Inline::hashtag("world")));
        assert_eq!(node_at(&sample(), 2), None);
        assert_eq!(node_at(&sample(), 99), None);
    }

    #[test]
    fn test_canonical_marks_order() {
        let marks = canonical_marks(vec![
            Mark::Code,
            Mark::Bold,
            Mark::Link {
                href: "/x".into(),
                title: None,
            },
        ]);
        assert_eq!(marks.iter().map(Mark::rank).collect::<Vec<_>>(), vec![0, 1, 3]);
    }

    fn nested() -> Document {
        Document::new(vec![
            Block::paragraph(vec![Inline::text("intro")]),
            Block::BulletList {
                items: vec![
                    vec![Block::paragraph(vec![Inline::mention("a", "Alice")])],
                    vec![
                        Block::paragraph(vec![Inline::text("two")]),
                        Block::Blockquote {
                            blocks: vec![Block::paragraph(vec![Inline::hashtag("deep")])],
                        },
                    ],
                ],
            },
            Block::HorizontalRule,
        ])
    }

    #[test]
    fn test_leaves_in_document_order() {
        let doc = nested();
        assert_eq!(doc.leaf_count(), 5);
        assert_eq!(doc.leaf(1).and_then(Block::content), Some(&[Inline::mention("a", "Alice")][..]));
        assert_eq!(doc.leaf(3).and_then(Block::content), Some(&[Inline::hashtag("deep")][..]));
        assert_eq!(doc.leaf(4), Some(&Block::HorizontalRule));
        assert_eq!(doc.leaf(5), None);
    }

    #[test]
    fn test_split_leaf_in_list_item_adds_item() {
        let mut doc = nested();
        assert!(doc.split_leaf(2, vec![Inline::text("t")], vec![Inline::text("wo")]));
        let Block::BulletList { items } = &doc.blocks[1] else {
            panic!("list expected");
        };
        assert_eq!(items.len(), 3);
        assert_eq!(items[1], vec![Block::paragraph(vec![Inline::text("t")])]);
        assert_eq!(items[2][0], Block::paragraph(vec![Inline::text("wo")]));
        assert!(matches!(items[2][1], Block::Blockquote { .. }));
        assert_eq!(doc.leaf_count(), 6);
    }

    #[test]
    fn test_remove_leaf_prunes_empty_containers() {
        let mut doc = nested();
        assert_eq!(doc.remove_leaf(3), Some(Block::paragraph(vec![Inline::hashtag("deep")])));
        assert_eq!(doc.remove_leaf(1), Some(Block::paragraph(vec![Inline::mention("a", "Alice")])));
        let Block::BulletList { items } = &doc.blocks[1] else {
            panic!("list expected");
        };
        assert_eq!(items, &vec![vec![Block::paragraph(vec![Inline::text("two")])]]);

        assert!(doc.remove_leaf(1).is_some());
        assert_eq!(doc.blocks, vec![Block::paragraph(vec![Inline::text("intro")]), Block::HorizontalRule]);
    }

    #[test]
    fn test_replace_leaf_inside_quote() {
        let mut doc = nested();
        assert!(doc.replace_leaf(3, vec![Block::HorizontalRule, Block::paragraph(vec![])]));
        assert_eq!(doc.leaf_count(), 6);
        assert_eq!(doc.leaf(3), Some(&Block::HorizontalRule));
        assert!(!doc.replace_leaf(9, vec![]));
    }

    #[test]
    fn test_document_collects_atoms() {
        let doc = Document::new(vec![
            Block::paragraph(sample()),
            Block::BulletList {
                items: vec![vec![Block::paragraph(vec![Inline::mention("a", "Alice")])]],
            },
            Block::VideoEmbed(VideoRef::new(crate::video::VideoProvider::YouTube, "dQw4w9WgXcQ")),
        ]);
        assert_eq!(doc.hashtags().len(), 1);
        assert_eq!(doc.mentions()[0].label, "Alice");
        assert_eq!(doc.videos().len(), 1);
        assert!(!doc.is_empty());
        assert!(Document::empty().is_empty());
    }
}

//! [`Document`] to markdown
//!
//! Blocks are separated by a blank line. Hard breaks are written as a
//! plain newline. Text is escaped so it parses back to the same content.

use super::{Block, Document, Inline, Mark, normalize};
use crate::extensions::{HashtagExtension, MentionExtension, NodeSpec, VideoEmbedExtension};
use crate::hashtag::{is_tag_char, starts_hashtag_after};
use crate::preprocess::hashtag_placeholder;

/// Serialize a document
pub fn to_markdown(doc: &Document) -> String {
    serialize_blocks(&doc.blocks, "\n\n")
}

fn serialize_blocks(blocks: &[Block], separator: &str) -> String {
    blocks
        .iter()
        .filter_map(serialize_block)
        .collect::<Vec<_>>()
        .join(separator)
}

fn serialize_block(block: &Block) -> Option<String> {
    match block {
        Block::Paragraph { content } => {
            let text = serialize_inlines(content);
            if text.trim().is_empty() {
                return None;
            }
            Some(
                text.split('\n')
                    .map(|line| escape_line_start(line.trim()))
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        }
        Block::Heading { level, content } => {
            let text = serialize_inlines(content).replace('\n', " ");
            Some(format!("{} {}", "#".repeat(usize::from((*level).clamp(1, 6))), text.trim()))
        }
        Block::Blockquote { blocks } => {
            let inner = serialize_blocks(blocks, "\n\n");
            Some(prefix_lines(&inner, "> ", ">"))
        }
        Block::BulletList { items } => Some(serialize_list(items, |_| "- ".to_string())),
        Block::OrderedList { start, items } => {
            Some(serialize_list(items, |index| format!("{}. ", *start as usize + index)))
        }
        Block::CodeBlock { language, code } => {
            let fence = code_fence(code);
            let body = code.strip_suffix('\n').unwrap_or(code);
            Some(format!(
                "{fence}{}\n{body}\n{fence}",
                language.as_deref().unwrap_or("")
            ))
        }
        Block::HorizontalRule => Some("---".to_string()),
        Block::VideoEmbed(video) => Some(VideoEmbedExtension::serialize_markdown(video)),
    }
}

fn serialize_list(items: &[Vec<Block>], marker: impl Fn(usize) -> String) -> String {
    let loose = items.iter().any(|item| item.len() > 1);
    items
        .iter()
        .enumerate()
        .map(|(index, item)| {
            let marker = marker(index);
            let indent = " ".repeat(marker.len());
            let body = serialize_blocks(item, "\n\n");
            let mut lines = body.split('\n');
            let mut out = format!("{marker}{}", lines.next().unwrap_or(""));
            for line in lines {
                out.push('\n');
                if !line.is_empty() {
                    out.push_str(&indent);
                    out.push_str(line);
                }
            }
            out
        })
        .collect::<Vec<_>>()
        .join(if loose { "\n\n" } else { "\n" })
}

fn prefix_lines(text: &str, prefix: &str, empty_prefix: &str) -> String {
    text.split('\n')
        .map(|line| {
            if line.is_empty() {
                empty_prefix.to_string()
            } else {
                format!("{prefix}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn code_fence(code: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in code.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    "`".repeat(longest.max(2) + 1)
}

/// Serialize inline content, opening and closing marks as runs change.
///
/// A hashtag is written bare when it parses back as the same hashtag and
/// as its placeholder span otherwise, e.g. right after a word character or
/// right before more tag characters.
pub fn serialize_inlines(content: &[Inline]) -> String {
    let content = move_edge_whitespace(content);
    let mut out = String::new();
    let mut open: Vec<Mark> = Vec::new();
    // byte offset and label of the last bare hashtag, until the next piece is known
    let mut bare_hashtag: Option<(usize, &str)> = None;

    for inline in &content {
        let target = inline.marks();
        let mut piece = String::new();

        let keep = open
            .iter()
            .position(|mark| !target.contains(mark))
            .unwrap_or(open.len());
        while open.len() > keep {
            if let Some(mark) = open.pop() {
                piece.push_str(&close_delimiter(&mark));
            }
        }
        for mark in target {
            if !open.contains(mark) && *mark != Mark::Code {
                piece.push_str(open_delimiter(mark));
                open.push(mark.clone());
            }
        }

        let prev = piece.chars().next_back().or_else(|| out.chars().next_back());
        let mut written_bare = None;
        match inline {
            Inline::Text { text, marks } if marks.contains(&Mark::Code) => {
                piece.push_str(&code_span(text));
            }
            Inline::Text { text, .. } => piece.push_str(&escape_text(text, prev)),
            Inline::Hashtag(attrs) if starts_hashtag_after(prev) => {
                written_bare = Some(attrs.label.as_str());
                piece.push_str(&HashtagExtension::serialize_markdown(attrs));
            }
            Inline::Hashtag(attrs) => piece.push_str(&hashtag_placeholder(&attrs.label)),
            Inline::ItemMention(attrs) => piece.push_str(&MentionExtension::serialize_markdown(attrs)),
            Inline::HardBreak => piece.push('\n'),
        }

        if let Some(next) = piece.chars().next() {
            if let Some((start, label)) = bare_hashtag.take() {
                if is_tag_char(next) {
                    out.replace_range(start.., &hashtag_placeholder(label));
                }
            }
        }

        out.push_str(&piece);
        if let Some(label) = written_bare {
            bare_hashtag = Some((out.len() - label.len() - 1, label));
        }
    }

    while let Some(mark) = open.pop() {
        out.push_str(&close_delimiter(&mark));
    }

    out
}

/// Emphasis delimiters next to whitespace do not parse; keep leading and
/// trailing whitespace of a run outside its bold and italic marks
fn move_edge_whitespace(content: &[Inline]) -> Vec<Inline> {
    let mut out = Vec::with_capacity(content.len());
    for inline in content {
        let Inline::Text { text, marks } = inline else {
            out.push(inline.clone());
            continue;
        };
        if !marks.iter().any(|m| matches!(m, Mark::Bold | Mark::Italic)) {
            out.push(inline.clone());
            continue;
        }

        let outer: Vec<Mark> = marks
            .iter()
            .filter(|m| !matches!(m, Mark::Bold | Mark::Italic))
            .cloned()
            .collect();
        let core = text.trim();
        if core.is_empty() {
            out.push(Inline::Text {
                text: text.clone(),
                marks: outer,
            });
            continue;
        }
        let start = text.len() - text.trim_start().len();
        let end = start + core.len();
        out.push(Inline::Text {
            text: text[..start].to_string(),
            marks: outer.clone(),
        });
        out.push(Inline::Text {
            text: core.to_string(),
            marks: marks.clone(),
        });
        out.push(Inline::Text {
            text: text[end..].to_string(),
            marks: outer,
        });
    }
    normalize(out)
}

fn open_delimiter(mark: &Mark) -> &'static str {
    match mark {
        Mark::Link { .. } => "[",
        Mark::Bold => "**",
        Mark::Italic => "*",
        Mark::Code => "",
    }
}

fn close_delimiter(mark: &Mark) -> String {
    match mark {
        Mark::Link { href, title } => {
            let href = if href.is_empty() || href.contains([' ', '(', ')', '<', '>']) {
                format!("<{}>", href.replace(['<', '>'], ""))
            } else {
                href.clone()
            };
            match title {
                Some(title) => format!("]({href} \"{}\")", title.replace('"', "\\\"")),
                None => format!("]({href})"),
            }
        }
        Mark::Bold => "**".to_string(),
        Mark::Italic => "*".to_string(),
        Mark::Code => String::new(),
    }
}

fn code_span(text: &str) -> String {
    let mut longest = 0;
    let mut run = 0;
    for c in text.chars() {
        if c == '`' {
            run += 1;
            longest = longest.max(run);
        } else {
            run = 0;
        }
    }
    let ticks = "`".repeat(longest + 1);
    if longest > 0 || text.starts_with(' ') || text.ends_with(' ') {
        format!("{ticks} {text} {ticks}")
    } else {
        format!("{ticks}{text}{ticks}")
    }
}

/// Backslash-escape characters that would otherwise start markup, and a
/// `#` that would start a hashtag. `prev` is the character written before
/// `text`.
pub fn escape_text(text: &str, prev: Option<char>) -> String {
    let mut out = String::with_capacity(text.len());
    let mut prev = prev;
    let mut chars = text.chars().peekable();
    while let Some(c) = chars.next() {
        let starts_hashtag =
            c == '#' && starts_hashtag_after(prev) && chars.peek().is_none_or(|next| is_tag_char(*next));
        if starts_hashtag || matches!(c, '\\' | '*' | '_' | '`' | '[' | ']' | '<' | '~' | '|') {
            out.push('\\');
        }
        out.push(c);
        prev = Some(c);
    }
    out
}

/// Escape a line start that would parse as a heading, quote, list or rule
fn escape_line_start(line: &str) -> String {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if (1..=6).contains(&hashes) && line[hashes..].chars().next().is_none_or(char::is_whitespace) {
        return format!("\\{line}");
    }

    if line.starts_with(['>', '-', '+', '=']) {
        return format!("\\{line}");
    }

    let digits = line.chars().take_while(char::is_ascii_digit).count();
    if digits > 0 {
        let rest = &line[digits..];
        if rest.starts_with(['.', ')']) && rest[1..].chars().next().is_none_or(char::is_whitespace) {
            return format!("{}\\{}", &line[..digits], rest);
        }
    }

    line.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::parse_markdown;
    use crate::extensions::MentionAttrs;
    use crate::video::{VideoProvider, VideoRef};

    fn round_trip(md: &str) -> String {
        to_markdown(&parse_markdown(md))
    }

    #[test]
    fn test_atoms_serialize_to_text_forms() {
        let doc = Document::new(vec![
            Block::paragraph(vec![
                Inline::text("Hi "),
                Inline::hashtag("world"),
                Inline::text(" and "),
                Inline::ItemMention(MentionAttrs::new("a1", "Alice")),
            ]),
            Block::VideoEmbed(VideoRef::new(VideoProvider::YouTube, "dQw4w9WgXcQ")),
        ]);
        assert_eq!(
            to_markdown(&doc),
            "Hi #world and [@Alice](/item/a1)\n\n<https://www.youtube.com/watch?v=dQw4w9WgXcQ>"
        );
    }

    #[test]
    fn test_marks_nest() {
        let content = vec![
            Inline::marked("a", vec![Mark::Bold]),
            Inline::marked("b", vec![Mark::Bold, Mark::Italic]),
            Inline::text("c"),
        ];
        assert_eq!(serialize_inlines(&content), "**a*b***c");
    }

    #[test]
    fn test_bold_keeps_whitespace_outside() {
        let content = vec![Inline::text("x"), Inline::marked(" bold ", vec![Mark::Bold]), Inline::text("y")];
        assert_eq!(serialize_inlines(&content), "x **bold** y");
    }

    #[test]
    fn test_escapes_markup() {
        let content = vec![Inline::text("a*b_c [d] x#y # z")];
        assert_eq!(serialize_inlines(&content), r"a\*b\_c \[d\] x#y # z");
    }

    #[test]
    fn test_literal_hash_is_escaped_where_it_would_start_a_hashtag() {
        let content = vec![Inline::text("#foo and #bar")];
        assert_eq!(serialize_inlines(&content), r"\#foo and \#bar");
        assert_eq!(round_trip(r"\#foo"), r"\#foo");
        assert!(parse_markdown(r"\#foo").hashtags().is_empty());
    }

    #[test]
    fn test_hashtag_next_to_word_characters_uses_placeholder() {
        let content = vec![Inline::text("x"), Inline::hashtag("tag")];
        assert_eq!(
            serialize_inlines(&content),
            r#"x<span data-hashtag data-label="tag">#tag</span>"#
        );

        let content = vec![Inline::hashtag("tag"), Inline::text("abc")];
        assert_eq!(
            serialize_inlines(&content),
            r#"<span data-hashtag data-label="tag">#tag</span>abc"#
        );

        let content = vec![Inline::hashtag("tag"), Inline::text("_x")];
        assert_eq!(serialize_inlines(&content), r"#tag\_x");

        for content in [
            vec![Inline::text("x"), Inline::hashtag("tag")],
            vec![Inline::hashtag("tag"), Inline::text("abc")],
            vec![Inline::hashtag("a"), Inline::hashtag("b")],
            vec![Inline::text("#"), Inline::hashtag("b")],
        ] {
            let doc = Document::new(vec![Block::paragraph(content)]);
            assert_eq!(parse_markdown(&to_markdown(&doc)), doc);
        }
    }

    #[test]
    fn test_line_start_escapes() {
        assert_eq!(escape_line_start("# title"), r"\# title");
        assert_eq!(escape_line_start("#tag"), "#tag");
        assert_eq!(escape_line_start("1. one"), r"1\. one");
        assert_eq!(escape_line_start("- item"), r"\- item");
        assert_eq!(escape_line_start("2024 was"), "2024 was");
    }

    #[test]
    fn test_hard_break_is_newline() {
        assert_eq!(round_trip("one\ntwo"), "one\ntwo");
    }

    #[test]
    fn test_round_trips() {
        for md in [
            "Hello #world",
            "Ask [@Alice](/item/a1) about **bold** and *it*",
            "# Heading\n\ntext",
            "- a\n- b",
            "1. one\n2. two",
            "> quoted #tag",
            "```rust\nfn main() {}\n```",
            "see [docs](https://example.com) and `code`",
            "<https://rumble.com/embed/v4abc12>",
        ] {
            assert_eq!(round_trip(md), md, "{md}");
        }
    }

    #[test]
    fn test_legacy_mention_is_rewritten() {
        assert_eq!(round_trip("[@Bob](/item/l1/b2)"), "[@Bob](/item/b2)");
    }

    #[test]
    fn test_empty_paragraphs_are_skipped() {
        let doc = Document::new(vec![
            Block::paragraph(vec![Inline::text("a")]),
            Block::paragraph(vec![]),
            Block::paragraph(vec![Inline::text("b")]),
        ]);
        assert_eq!(to_markdown(&doc), "a\n\nb");
    }
}

//! Hashtag syntax and display codec
//!
//! A hashtag is `#` followed by letters (ASCII and Latin-1 supplement),
//! digits, `_` or `-`. Underscores are stored as typed and only shown as
//! non-breaking spaces.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

use crate::types::{Tag, find_tag};

/// Character class of a hashtag label
pub const TAG_CHAR_CLASS: &str = "A-Za-z0-9À-ÖØ-öø-ÿ_-";

/// `#label`, label captured in group 1
pub static HASHTAG_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!("#([{TAG_CHAR_CLASS}]+)")).expect("hashtag regex")
});

const NBSP: char = '\u{00A0}';

/// Whether `c` may appear in a hashtag label
pub fn is_tag_char(c: char) -> bool {
    c.is_ascii_alphanumeric()
        || c == '_'
        || c == '-'
        || (('\u{00C0}'..='\u{00FF}').contains(&c) && c != '\u{00D7}' && c != '\u{00F7}')
}

/// Whether `label` is a non-empty run of tag characters
pub fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.chars().all(is_tag_char)
}

/// Whether a `#` preceded by `prev` may start a hashtag.
///
/// Rejects word characters (`a#b`), entities (`&#39;`), repeated hashes,
/// URL fragments (`/#x`), link syntax (`[#x`, `(#x`) and escapes (`\#x`).
pub fn starts_hashtag_after(prev: Option<char>) -> bool {
    match prev {
        None => true,
        Some(c) => !(c.is_alphanumeric() || matches!(c, '_' | '&' | '#' | '/' | '[' | '(' | '\\')),
    }
}

/// The literal `#name` used to search free text for a tag
pub fn encode_tag(tag: &Tag) -> String {
    format!("#{}", tag.name)
}

/// Display form: underscores become non-breaking spaces
pub fn decode_tag(raw: &str) -> String {
    raw.replace('_', &NBSP.to_string())
}

/// Every hashtag label in `text`, in order, deduplicated ignoring case
pub fn extract_hashtags(text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut labels = Vec::new();

    for caps in HASHTAG_REGEX.captures_iter(text) {
        let Some(full) = caps.get(0) else { continue };
        let prev = text[..full.start()].chars().next_back();
        if !starts_hashtag_after(prev) {
            continue;
        }
        let label = &caps[1];
        if seen.insert(label.to_lowercase()) {
            labels.push(label.to_string());
        }
    }

    labels
}

/// Hashtag labels in `text` with no matching tag
pub fn unknown_hashtags(text: &str, tags: &[Tag]) -> Vec<String> {
    extract_hashtags(text)
        .into_iter()
        .filter(|label| find_tag(tags, label).is_none())
        .collect()
}

/// Tags whose `#name` occurs in `text`, ignoring case, in tag order
pub fn item_tags(text: &str, tags: &[Tag]) -> Vec<Tag> {
    let haystack = text.to_lowercase();
    tags.iter()
        .filter(|tag| contains_encoded(&haystack, &encode_tag(tag).to_lowercase()))
        .cloned()
        .collect()
}

fn contains_encoded(haystack: &str, needle: &str) -> bool {
    haystack.match_indices(needle).any(|(start, matched)| {
        let prev = haystack[..start].chars().next_back();
        let next = haystack[start + matched.len()..].chars().next();
        starts_hashtag_after(prev) && !next.is_some_and(is_tag_char)
    })
}

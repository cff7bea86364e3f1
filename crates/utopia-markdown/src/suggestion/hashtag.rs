//! Hashtag suggestions with create-on-the-fly

use std::sync::Arc;

use tracing::info;
use utopia_config::{MarkdownConfig, SuggestionConfig};

use super::{Suggestion, SuggestionEntry, SuggestionPopup};
use crate::document::Inline;
use crate::extensions::HashtagAttrs;
use crate::hashtag::is_tag_char;
use crate::traits::{TagSink, TagSource};
use crate::types::Tag;

/// A row of the hashtag popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagCandidate {
    Existing(Tag),
    /// Create a tag named after the typed query
    Create(String),
}

impl TagCandidate {
    pub fn label(&self) -> &str {
        match self {
            TagCandidate::Existing(tag) => &tag.name,
            TagCandidate::Create(name) => name,
        }
    }
}

/// Candidates for `query`.
///
/// An empty query lists the first tags unfiltered; otherwise tags whose
/// name starts with the query, ignoring case. A create candidate follows
/// when `can_create` is set and no tag has exactly the query as its name.
pub fn hashtag_items(tags: &[Tag], query: &str, can_create: bool, limits: &SuggestionConfig) -> Vec<TagCandidate> {
    if query.is_empty() {
        return tags
            .iter()
            .take(limits.hashtag_empty_query_limit)
            .cloned()
            .map(TagCandidate::Existing)
            .collect();
    }

    let needle = query.to_lowercase();
    let mut candidates: Vec<TagCandidate> = tags
        .iter()
        .filter(|tag| tag.name.to_lowercase().starts_with(&needle))
        .take(limits.hashtag_match_limit)
        .cloned()
        .map(TagCandidate::Existing)
        .collect();

    if can_create && !tags.iter().any(|tag| tag.matches_name(query)) {
        candidates.push(TagCandidate::Create(query.to_string()));
    }

    candidates
}

/// Hashtag autocomplete bound to a live tag list.
///
/// With a `sink`, unknown queries offer a create candidate; committing it
/// creates a tag with the configured default color and hands it to the
/// sink before the node is inserted.
pub fn hashtag_suggestion(
    tags: Arc<dyn TagSource>,
    sink: Option<Arc<dyn TagSink>>,
    popup: Box<dyn SuggestionPopup>,
    config: &MarkdownConfig,
) -> Suggestion<TagCandidate> {
    let limits = config.suggestion.clone();
    let can_create = sink.is_some();
    let new_tag_color = config.tags.new_tag_color.clone();

    let items = move |query: &str| hashtag_items(&tags.tags(), query, can_create, &limits);

    let command = move |candidate: &TagCandidate| -> Inline {
        match candidate {
            TagCandidate::Existing(tag) => Inline::Hashtag(HashtagAttrs::from_tag(tag)),
            TagCandidate::Create(name) => {
                let tag = Tag::create(name.clone(), new_tag_color.clone());
                info!(tag = %tag.name, id = %tag.id, "creating tag from suggestion");
                if let Some(sink) = &sink {
                    sink.add_tag(tag.clone());
                }
                Inline::Hashtag(HashtagAttrs::from_tag(&tag))
            }
        }
    };

    Suggestion::new('#', items, command, describe, popup)
        .commit_on_space(true)
        .accepts_query(|query| query.chars().all(is_tag_char))
}

fn describe(candidate: &TagCandidate) -> SuggestionEntry {
    SuggestionEntry {
        label: candidate.label().to_string(),
        is_new: matches!(candidate, TagCandidate::Create(_)),
    }
}

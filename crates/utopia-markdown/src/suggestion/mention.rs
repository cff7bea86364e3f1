//! Item mention suggestions

use std::sync::Arc;

use utopia_config::MarkdownConfig;

use super::{Suggestion, SuggestionEntry, SuggestionPopup};
use crate::document::Inline;
use crate::extensions::MentionAttrs;
use crate::traits::ItemSource;
use crate::types::Item;

/// Named items whose name contains `query`, ignoring case, at most `limit`
pub fn mention_items(items: &[Item], query: &str, limit: usize) -> Vec<Item> {
    let needle = query.to_lowercase();
    items
        .iter()
        .filter(|item| {
            item.display_name()
                .is_some_and(|name| name.to_lowercase().contains(&needle))
        })
        .take(limit)
        .cloned()
        .collect()
}

/// Mention autocomplete bound to a live item list
pub fn mention_suggestion(
    items: Arc<dyn ItemSource>,
    popup: Box<dyn SuggestionPopup>,
    config: &MarkdownConfig,
) -> Suggestion<Item> {
    let limit = config.suggestion.mention_limit;

    Suggestion::new(
        '@',
        move |query: &str| mention_items(&items.items(), query, limit),
        |item: &Item| Inline::ItemMention(MentionAttrs::new(item.id.clone(), item.display_name().unwrap_or_default())),
        describe,
        popup,
    )
    .allow_spaces(config.suggestion.allow_spaces)
}

fn describe(item: &Item) -> SuggestionEntry {
    SuggestionEntry {
        label: item.display_name().unwrap_or_default().to_string(),
        is_new: false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::suggestion::{HeadlessPopup, Key, KeyOutcome, SuggestionPlugin, SuggestionRange};

    fn people() -> Vec<Item> {
        vec![
            Item::new("1", "Alice"),
            Item::new("2", "Malik"),
            Item {
                id: "3".into(),
                name: None,
                color: None,
            },
            Item::new("4", "Bob"),
        ]
    }

    #[test]
    fn test_substring_match_ignores_case() {
        let found = mention_items(&people(), "LI", 8);
        let names: Vec<_> = found.iter().filter_map(Item::display_name).collect();
        assert_eq!(names, vec!["Alice", "Malik"]);
    }

    #[test]
    fn test_unnamed_items_are_skipped() {
        assert_eq!(mention_items(&people(), "", 8).len(), 3);
    }

    #[test]
    fn test_capped() {
        let many: Vec<Item> = (0..20).map(|i| Item::new(i.to_string(), format!("n{i}"))).collect();
        assert_eq!(mention_items(&many, "n", 8).len(), 8);
    }

    #[test]
    fn test_commit_inserts_mention() {
        let source: Arc<dyn ItemSource> = Arc::new(people());
        let mut suggestion =
            mention_suggestion(source, Box::new(HeadlessPopup::new()), &MarkdownConfig::default());
        suggestion.start(SuggestionRange { block: 0, from: 0, to: 4 }, "Ali", None);
        assert_eq!(
            suggestion.key_down(&Key::Enter),
            KeyOutcome::Commit(Inline::mention("1", "Alice"))
        );
    }
}

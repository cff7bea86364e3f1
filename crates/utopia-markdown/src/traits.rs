//! Seams to the surrounding application
//!
//! The core never owns tags, items or routing. It reads them and emits
//! one-way events through these traits. Closures implement the sink traits
//! directly, so a host can pass `|path: &str| router.push(path)`.

use std::sync::{Arc, RwLock};

use crate::types::{Item, Tag};

/// Read access to the tag collection
pub trait TagSource: Send + Sync {
    fn tags(&self) -> Vec<Tag>;
}

/// Receives tags created inside the editor. Fire-and-forget: the editor
/// inserts the node before, and regardless of, what the store does.
pub trait TagSink: Send + Sync {
    fn add_tag(&self, tag: Tag);
}

/// Read access to the mention targets
pub trait ItemSource: Send + Sync {
    fn items(&self) -> Vec<Item>;

    fn find_item(&self, id: &str) -> Option<Item> {
        self.items().into_iter().find(|item| item.id == id)
    }
}

/// Client-side navigation
pub trait Navigator: Send + Sync {
    fn navigate(&self, path: &str);
}

/// Receives hashtag clicks from read-only content
pub trait FilterSink: Send + Sync {
    fn add_filter_tag(&self, tag: &Tag);
}

/// Resolves a mention color: `(item, fallback) -> color`
pub type ItemColorResolver = Arc<dyn Fn(&Item, &str) -> String + Send + Sync>;

impl TagSource for Vec<Tag> {
    fn tags(&self) -> Vec<Tag> {
        self.clone()
    }
}

impl TagSource for RwLock<Vec<Tag>> {
    fn tags(&self) -> Vec<Tag> {
        self.read().map(|tags| tags.clone()).unwrap_or_default()
    }
}

impl ItemSource for Vec<Item> {
    fn items(&self) -> Vec<Item> {
        self.clone()
    }
}

impl ItemSource for RwLock<Vec<Item>> {
    fn items(&self) -> Vec<Item> {
        self.read().map(|items| items.clone()).unwrap_or_default()
    }
}

impl<F> TagSink for F
where
    F: Fn(Tag) + Send + Sync,
{
    fn add_tag(&self, tag: Tag) {
        self(tag)
    }
}

impl<F> Navigator for F
where
    F: Fn(&str) + Send + Sync,
{
    fn navigate(&self, path: &str) {
        self(path)
    }
}

impl<F> FilterSink for F
where
    F: Fn(&Tag) + Send + Sync,
{
    fn add_filter_tag(&self, tag: &Tag) {
        self(tag)
    }
}

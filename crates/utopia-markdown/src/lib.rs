//! Utopia Map Markdown
//!
//! Markdown extensions and rendering for map item descriptions.
//! This crate provides:
//! - Hashtag, item mention and video embed nodes with markdown, HTML and
//!   view rules
//! - A preprocessor that turns free text into parseable placeholders
//! - `#` and `@` autocomplete with popup lifecycle and keyboard handling
//! - An editor core with undo, paste interception and read-only clicks
//! - An editor-free HTML renderer for lists and previews

pub mod document;
pub mod editor;
pub mod error;
pub mod extensions;
pub mod hashtag;
pub mod lite;
pub mod preprocess;
pub mod suggestion;
pub mod traits;
pub mod types;
pub mod video;

// Re-export main types for convenience
pub use document::{Block, Document, Inline, Mark, MarkdownCodec, parse_markdown, render_document, to_markdown};
pub use editor::{
    Editor, EditorBuilder, Position, PreviewMode, PreviewOutput, PreviewState, Selection,
    TextPreview,
};
pub use error::{EditorError, EditorResult};
pub use extensions::{
    HashtagAttrs, HashtagExtension, MentionAttrs, MentionExtension, NodeClick, NodeSpec,
    VideoEmbedExtension, ViewContext,
};
pub use hashtag::{decode_tag, encode_tag, extract_hashtags, item_tags, unknown_hashtags};
pub use lite::{ClickOutcome, ClickTarget, LiteOptions, handle_container_click, simple_markdown_to_html};
pub use preprocess::{fix_urls, preprocess_markdown, remove_markdown_syntax, truncate_markdown};
pub use suggestion::{
    ClientRect, HeadlessPopup, Key, KeyOutcome, Suggestion, SuggestionPlugin, SuggestionPopup,
    TagCandidate, hashtag_suggestion, mention_suggestion,
};
pub use traits::{FilterSink, ItemColorResolver, ItemSource, Navigator, TagSink, TagSource};
pub use types::{Item, Tag};
pub use video::{VideoProvider, VideoRef, parse_video_url};

pub use utopia_config::MarkdownConfig;

//! Read-only text previews
//!
//! A preview distinguishes three inputs: no access to the text at all, an
//! explicitly empty text, and content. The first shows a login prompt, the
//! second nothing; they must never share a branch.

use std::sync::Arc;

use utopia_config::MarkdownConfig;

use super::Editor;
use crate::lite::{LiteOptions, simple_markdown_to_html};
use crate::preprocess::{preprocess_markdown, truncate_markdown};
use crate::traits::{ItemColorResolver, ItemSource, TagSource};
use crate::types::{Item, Tag};

/// What a preview was given
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PreviewState<'a> {
    /// The viewer may not read the text
    LoginRequired,
    /// No text, or an empty one
    Empty,
    Content(&'a str),
}

impl<'a> PreviewState<'a> {
    /// `None` means the text is unavailable to the viewer; `Some(None)` and
    /// `Some(Some(""))` mean there is no text.
    pub fn from_input(input: Option<Option<&'a str>>) -> Self {
        match input {
            None => PreviewState::LoginRequired,
            Some(None) | Some(Some("")) => PreviewState::Empty,
            Some(Some(text)) => PreviewState::Content(text),
        }
    }
}

/// What to show for a [`PreviewState`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreviewOutput {
    LoginPrompt,
    Nothing,
    Html(String),
}

/// Which renderer a preview uses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PreviewMode {
    /// Regex-based renderer, no editor instance
    #[default]
    Lite,
    /// Read-only editor
    Editor,
}

/// Renders previews against shared tag and item sources
pub struct TextPreview {
    tags: Arc<dyn TagSource>,
    items: Arc<dyn ItemSource>,
    item_color: Option<ItemColorResolver>,
    config: MarkdownConfig,
    mode: PreviewMode,
    truncate: Option<usize>,
}

impl TextPreview {
    pub fn new(tags: Arc<dyn TagSource>, items: Arc<dyn ItemSource>) -> Self {
        Self {
            tags,
            items,
            item_color: None,
            config: MarkdownConfig::default(),
            mode: PreviewMode::default(),
            truncate: None,
        }
    }

    /// Use `config`, including its default truncation limit
    pub fn with_config(mut self, config: MarkdownConfig) -> Self {
        self.truncate = config.preview.truncate_limit;
        self.config = config;
        self
    }

    pub fn with_item_color(mut self, resolver: ItemColorResolver) -> Self {
        self.item_color = Some(resolver);
        self
    }

    pub fn mode(mut self, mode: PreviewMode) -> Self {
        self.mode = mode;
        self
    }

    /// Cut content to `limit` visible characters
    pub fn truncate(mut self, limit: Option<usize>) -> Self {
        self.truncate = limit;
        self
    }

    pub fn render(&self, state: PreviewState<'_>) -> PreviewOutput {
        match state {
            PreviewState::LoginRequired => PreviewOutput::LoginPrompt,
            PreviewState::Empty => PreviewOutput::Nothing,
            PreviewState::Content(text) => PreviewOutput::Html(self.render_content(text)),
        }
    }

    /// The text as it is shown: truncated, then preprocessed
    pub fn prepare(&self, text: &str) -> String {
        let text = match self.truncate {
            Some(limit) => truncate_markdown(text, limit),
            None => text.to_string(),
        };
        preprocess_markdown(&text)
    }

    /// A read-only editor over the prepared text, for hosts that route
    /// node clicks through [`Editor::click`]
    pub fn editor(&self, text: &str) -> Editor {
        let mut builder = Editor::builder()
            .editable(false)
            .config(self.config.clone())
            .tags(self.tags.clone())
            .items(self.items.clone())
            .content(self.prepare(text));
        if let Some(resolver) = &self.item_color {
            builder = builder.item_color(resolver.clone());
        }
        builder.build()
    }

    fn render_content(&self, text: &str) -> String {
        match self.mode {
            PreviewMode::Editor => self.editor(text).render_html(),
            PreviewMode::Lite => {
                let tags: Vec<Tag> = self.tags.tags();
                let items: Vec<Item> = self.items.items();
                let options = LiteOptions {
                    items: &items,
                    item_color: self.item_color.as_ref(),
                    tag_fallback_color: &self.config.tags.fallback_color,
                    mention_fallback_color: &self.config.mentions.fallback_color,
                };
                simple_markdown_to_html(&self.prepare(text), &tags, &options)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use test_case::test_case;

    fn preview() -> TextPreview {
        TextPreview::new(
            Arc::new(vec![Tag::new("1", "map", "#0af")]),
            Arc::new(Vec::<Item>::new()),
        )
    }

    #[test_case(None, PreviewState::LoginRequired ; "undefined")]
    #[test_case(Some(None), PreviewState::Empty ; "null")]
    #[test_case(Some(Some("")), PreviewState::Empty ; "empty string")]
    #[test_case(Some(Some("hi")), PreviewState::Content("hi") ; "content")]
    fn test_state_from_input(input: Option<Option<&str>>, expected: PreviewState<'_>) {
        assert_eq!(PreviewState::from_input(input), expected);
    }

    #[test]
    fn test_login_and_empty_differ() {
        let preview = preview();
        assert_eq!(preview.render(PreviewState::from_input(None)), PreviewOutput::LoginPrompt);
        assert_eq!(
            preview.render(PreviewState::from_input(Some(Some("")))),
            PreviewOutput::Nothing
        );
    }

    #[test]
    fn test_lite_preview() {
        let output = preview().render(PreviewState::Content("on the #map"));
        let PreviewOutput::Html(html) = output else {
            panic!("expected html");
        };
        assert!(html.contains(r#"class="hashtag" style="color: #0af""#));
    }

    #[test]
    fn test_editor_preview_is_read_only() {
        let preview = preview().mode(PreviewMode::Editor);
        let PreviewOutput::Html(html) = preview.render(PreviewState::Content("on the #map")) else {
            panic!("expected html");
        };
        assert!(html.contains("cursor: pointer"));
        assert!(!preview.editor("x").is_editable());
    }

    #[test]
    fn test_truncated_preview() {
        let preview = preview().truncate(Some(5));
        assert_eq!(preview.prepare("abcdefghij"), "abcde...");
    }
}

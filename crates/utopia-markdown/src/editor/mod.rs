//! Interactive editor core
//!
//! An [`Editor`] owns a [`Document`], a selection and the node extensions.
//! Two configurations share the same extensions:
//!
//! - edit mode: suggestion popups bound to live tag and item sources, a
//!   placeholder while empty, and the markdown emitted after every change
//! - read-only mode: no suggestions, content set programmatically, node
//!   clicks navigate or filter
//!
//! Positions address leaf blocks in document order, so text inside list
//! items and blockquotes is reached like any top-level paragraph. An
//! offset counts characters, with every hashtag, mention and hard break
//! taking one unit.

pub mod history;
pub mod preview;

use std::collections::HashSet;
use std::sync::Arc;

use tracing::{debug, info};
use utopia_config::MarkdownConfig;

pub use history::{DEFAULT_HISTORY_LIMIT, History};
pub use preview::{PreviewMode, PreviewOutput, PreviewState, TextPreview};

use crate::document::{
    Block, Document, Inline, MarkdownCodec, content_size, marks_at, node_at, normalize,
    replace_content, split_content, text_before, to_markdown, trim_content,
};
use crate::document::html::render_document;
use crate::error::{EditorError, EditorResult};
use crate::extensions::{HashtagView, MentionView, NodeClick, VideoEmbedExtension, ViewContext};
use crate::suggestion::{
    ClientRect, Key, KeyOutcome, SuggestionPlugin, SuggestionPopup, SuggestionRange,
    hashtag_suggestion, mention_suggestion,
};
use crate::traits::{FilterSink, ItemColorResolver, ItemSource, Navigator, TagSink, TagSource};
use crate::types::{Item, Tag, find_tag};

/// A caret position: leaf block index and offset inside it
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Position {
    pub block: usize,
    pub offset: usize,
}

impl Position {
    pub fn new(block: usize, offset: usize) -> Self {
        Self { block, offset }
    }
}

/// Anchor and head of the selection; equal when it is a caret
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    pub anchor: Position,
    pub head: Position,
}

impl Selection {
    pub fn caret(position: Position) -> Self {
        Self {
            anchor: position,
            head: position,
        }
    }

    pub fn new(anchor: Position, head: Position) -> Self {
        Self { anchor, head }
    }

    pub fn from(&self) -> Position {
        self.anchor.min(self.head)
    }

    pub fn to(&self) -> Position {
        self.anchor.max(self.head)
    }

    pub fn is_collapsed(&self) -> bool {
        self.anchor == self.head
    }
}

type UpdateFn = Box<dyn Fn(&str) + Send + Sync>;

#[derive(Debug, Clone, PartialEq)]
struct Snapshot {
    doc: Document,
    selection: Selection,
}

/// Builder for [`Editor`]
pub struct EditorBuilder {
    config: MarkdownConfig,
    editable: bool,
    content: String,
    tags: Arc<dyn TagSource>,
    items: Arc<dyn ItemSource>,
    item_color: Option<ItemColorResolver>,
    navigator: Option<Arc<dyn Navigator>>,
    filter: Option<Arc<dyn FilterSink>>,
    tag_sink: Option<Arc<dyn TagSink>>,
    hashtag_popup: Option<Box<dyn SuggestionPopup>>,
    mention_popup: Option<Box<dyn SuggestionPopup>>,
    placeholder: Option<String>,
    on_update: Option<UpdateFn>,
    history_limit: usize,
}

impl Default for EditorBuilder {
    fn default() -> Self {
        Self {
            config: MarkdownConfig::default(),
            editable: true,
            content: String::new(),
            tags: Arc::new(Vec::<Tag>::new()),
            items: Arc::new(Vec::<Item>::new()),
            item_color: None,
            navigator: None,
            filter: None,
            tag_sink: None,
            hashtag_popup: None,
            mention_popup: None,
            placeholder: None,
            on_update: None,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl EditorBuilder {
    pub fn config(mut self, config: MarkdownConfig) -> Self {
        self.config = config;
        self
    }

    pub fn editable(mut self, editable: bool) -> Self {
        self.editable = editable;
        self
    }

    /// Initial markdown
    pub fn content(mut self, markdown: impl Into<String>) -> Self {
        self.content = markdown.into();
        self
    }

    pub fn tags(mut self, tags: Arc<dyn TagSource>) -> Self {
        self.tags = tags;
        self
    }

    pub fn items(mut self, items: Arc<dyn ItemSource>) -> Self {
        self.items = items;
        self
    }

    pub fn item_color(mut self, resolver: ItemColorResolver) -> Self {
        self.item_color = Some(resolver);
        self
    }

    pub fn navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = Some(navigator);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn FilterSink>) -> Self {
        self.filter = Some(filter);
        self
    }

    /// Receiver of tags created in the editor; enables the create candidate
    pub fn tag_sink(mut self, sink: Arc<dyn TagSink>) -> Self {
        self.tag_sink = Some(sink);
        self
    }

    /// Enable `#` suggestions, shown in `popup`
    pub fn hashtag_suggestions(mut self, popup: Box<dyn SuggestionPopup>) -> Self {
        self.hashtag_popup = Some(popup);
        self
    }

    /// Enable `@` suggestions, shown in `popup`
    pub fn mention_suggestions(mut self, popup: Box<dyn SuggestionPopup>) -> Self {
        self.mention_popup = Some(popup);
        self
    }

    pub fn placeholder(mut self, placeholder: impl Into<String>) -> Self {
        self.placeholder = Some(placeholder.into());
        self
    }

    /// Called with the markdown after every document change
    pub fn on_update(mut self, callback: impl Fn(&str) + Send + Sync + 'static) -> Self {
        self.on_update = Some(Box::new(callback));
        self
    }

    pub fn history_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Build the editor. Suggestions are only installed when editable.
    pub fn build(self) -> Editor {
        let mut suggestions: Vec<Box<dyn SuggestionPlugin>> = Vec::new();
        if self.editable {
            if let Some(popup) = self.hashtag_popup {
                suggestions.push(Box::new(hashtag_suggestion(
                    self.tags.clone(),
                    self.tag_sink.clone(),
                    popup,
                    &self.config,
                )));
            }
            if let Some(popup) = self.mention_popup {
                suggestions.push(Box::new(mention_suggestion(
                    self.items.clone(),
                    popup,
                    &self.config,
                )));
            }
        }

        let placeholder = self
            .placeholder
            .unwrap_or_else(|| self.config.editor.placeholder.clone());

        let mut editor = Editor {
            codec: MarkdownCodec::new(),
            doc: Document::empty(),
            selection: Selection::default(),
            editable: self.editable,
            config: self.config,
            tags: self.tags,
            items: self.items,
            item_color: self.item_color,
            navigator: self.navigator,
            filter: self.filter,
            tag_sink: self.tag_sink,
            suggestions,
            dismissed: None,
            caret_rect: None,
            placeholder,
            history: History::with_limit(self.history_limit),
            on_update: self.on_update,
        };
        editor.load(&self.content);
        editor
    }
}

/// Document, selection, history and suggestion sessions
pub struct Editor {
    codec: MarkdownCodec,
    doc: Document,
    selection: Selection,
    editable: bool,
    config: MarkdownConfig,
    tags: Arc<dyn TagSource>,
    items: Arc<dyn ItemSource>,
    item_color: Option<ItemColorResolver>,
    navigator: Option<Arc<dyn Navigator>>,
    filter: Option<Arc<dyn FilterSink>>,
    tag_sink: Option<Arc<dyn TagSink>>,
    suggestions: Vec<Box<dyn SuggestionPlugin>>,
    /// Trigger, block and start of a session closed with Escape
    dismissed: Option<(char, usize, usize)>,
    caret_rect: Option<ClientRect>,
    placeholder: String,
    history: History<Snapshot>,
    on_update: Option<UpdateFn>,
}

impl std::fmt::Debug for Editor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Editor")
            .field("doc", &self.doc)
            .field("selection", &self.selection)
            .field("editable", &self.editable)
            .field("suggestions", &self.suggestions.len())
            .finish()
    }
}

impl Editor {
    pub fn builder() -> EditorBuilder {
        EditorBuilder::default()
    }

    /// Read-only editor showing `markdown`
    pub fn read_only(markdown: &str) -> Editor {
        Editor::builder().editable(false).content(markdown).build()
    }

    pub fn is_editable(&self) -> bool {
        self.editable
    }

    pub fn document(&self) -> &Document {
        &self.doc
    }

    /// Current content as markdown
    pub fn markdown(&self) -> String {
        to_markdown(&self.doc)
    }

    pub fn is_empty(&self) -> bool {
        self.doc.is_empty()
    }

    /// Replace the whole content. Not an undo step and no update event.
    pub fn set_content(&mut self, markdown: &str) {
        debug!(len = markdown.len(), "replacing editor content");
        self.load(markdown);
    }

    fn load(&mut self, markdown: &str) {
        let mut doc = self.codec.parse(markdown);
        if doc.leaf_count() == 0 {
            doc = Document::empty();
        }
        self.doc = doc;
        self.selection = Selection::caret(self.end_position());
        self.history.clear();
        self.dismissed = None;
        for plugin in &mut self.suggestions {
            plugin.exit();
        }
    }

    /// Placeholder shown while the editor is empty
    pub fn placeholder(&self) -> &str {
        &self.placeholder
    }

    /// HTML of the current content. An empty edit-mode editor renders the
    /// placeholder paragraph.
    pub fn render_html(&self) -> String {
        let placeholder = self.editable.then_some(self.placeholder.as_str());
        render_document(&self.doc, &self.view_context(), placeholder)
    }

    /// Data the node views resolve colors and clicks against
    pub fn view_context(&self) -> ViewContext {
        ViewContext::new(self.tags.tags(), self.items.items(), self.editable)
            .with_config(&self.config)
            .with_item_color(self.item_color.clone())
    }

    pub fn selection(&self) -> Selection {
        self.selection
    }

    pub fn set_selection(&mut self, selection: Selection) -> EditorResult<()> {
        self.check_position(selection.anchor)?;
        self.check_position(selection.head)?;
        self.selection = selection;
        self.sync_suggestions();
        Ok(())
    }

    pub fn set_caret(&mut self, position: Position) -> EditorResult<()> {
        self.set_selection(Selection::caret(position))
    }

    /// Client rectangle of the caret, used to anchor suggestion popups
    pub fn set_caret_rect(&mut self, rect: Option<ClientRect>) {
        self.caret_rect = rect;
    }

    /// The suggestion whose popup is open
    pub fn active_suggestion(&self) -> Option<&dyn SuggestionPlugin> {
        self.suggestions
            .iter()
            .find(|plugin| plugin.is_active())
            .map(|plugin| plugin.as_ref())
    }

    /// Type `text` over the selection. Line breaks become hard breaks;
    /// the text takes the marks of the run before the caret.
    pub fn insert_text(&mut self, text: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let (from, to) = self.text_range()?;
        let content = self.block_content(from.block)?;
        let marks = marks_at(content, from.offset);

        let mut insert = Vec::new();
        for (index, line) in text.split('\n').enumerate() {
            if index > 0 {
                insert.push(Inline::HardBreak);
            }
            if !line.is_empty() {
                insert.push(Inline::marked(line, marks.clone()));
            }
        }

        self.replace_in_block(from.block, from.offset, to.offset, insert)
    }

    /// Backspace: delete the selection, or the unit before the caret.
    /// At the start of a block, joins it onto the previous text block or
    /// removes a preceding video embed. Returns whether anything changed.
    pub fn delete_backward(&mut self) -> EditorResult<bool> {
        self.ensure_editable()?;
        let (from, to) = self.text_range()?;

        if from != to {
            self.replace_in_block(from.block, from.offset, to.offset, Vec::new())?;
            return Ok(true);
        }
        if from.offset > 0 {
            self.replace_in_block(from.block, from.offset - 1, from.offset, Vec::new())?;
            return Ok(true);
        }
        if from.block == 0 {
            return Ok(false);
        }

        let previous = from.block - 1;
        let Some(before) = self.doc.leaf(previous) else {
            return Ok(false);
        };
        if matches!(before, Block::VideoEmbed(_)) {
            self.transact(|doc, selection| {
                doc.remove_leaf(previous);
                *selection = Selection::caret(Position::new(previous, 0));
                Ok(())
            })?;
            return Ok(true);
        }
        if !before.is_textblock() {
            return Ok(false);
        }

        let joined_at = before.content_size();
        self.transact(|doc, selection| {
            let current = doc
                .remove_leaf(from.block)
                .ok_or(EditorError::NotATextBlock(from.block))?;
            let target = doc
                .leaf_mut(previous)
                .ok_or(EditorError::NotATextBlock(previous))?;
            let mut content = target.content().unwrap_or_default().to_vec();
            content.extend(current.content().unwrap_or_default().iter().cloned());
            if let Some(block) = target.with_content(normalize(content)) {
                *target = block;
            }
            *selection = Selection::caret(Position::new(previous, joined_at));
            Ok(())
        })?;
        Ok(true)
    }

    /// Enter: split the text block at the caret. The second half of a
    /// heading becomes a paragraph; inside a list item it starts a new item.
    pub fn split_block(&mut self) -> EditorResult<()> {
        self.ensure_editable()?;
        let (from, to) = self.text_range()?;
        let content = self.block_content(from.block)?;
        let (left, _) = split_content(content, from.offset);
        let (_, right) = split_content(content, to.offset);

        self.transact(|doc, selection| {
            if !doc.split_leaf(from.block, left, right) {
                return Err(EditorError::NotATextBlock(from.block));
            }
            *selection = Selection::caret(Position::new(from.block + 1, 0));
            Ok(())
        })
    }

    /// Keyboard input. An open suggestion sees the key first; otherwise the
    /// default action applies. Returns whether the key was consumed.
    pub fn handle_key(&mut self, key: &Key) -> EditorResult<bool> {
        if !self.editable {
            return Ok(false);
        }

        if let Some(index) = self.suggestions.iter().position(|plugin| plugin.is_active()) {
            let plugin = &mut self.suggestions[index];
            let range = plugin.range();
            let trigger = plugin.trigger();
            match plugin.key_down(key) {
                KeyOutcome::Commit(node) => {
                    if let Some(range) = range {
                        self.commit_suggestion(range, node)?;
                    }
                    return Ok(true);
                }
                KeyOutcome::Exit => {
                    self.dismissed = range.map(|r| (trigger, r.block, r.from));
                    return Ok(true);
                }
                KeyOutcome::Handled => return Ok(true),
                KeyOutcome::Ignored => {}
            }
        }

        match key {
            Key::Char(c) => self.insert_text(c.encode_utf8(&mut [0; 4])).map(|_| true),
            Key::Space => self.insert_text(" ").map(|_| true),
            Key::Enter => self.split_block().map(|_| true),
            Key::Backspace => self.delete_backward(),
            Key::ArrowUp | Key::ArrowDown | Key::Escape => Ok(false),
        }
    }

    /// Commit the candidate at `index` of the open popup, as a click does
    pub fn select_suggestion(&mut self, index: usize) -> EditorResult<()> {
        let plugin = self
            .suggestions
            .iter_mut()
            .find(|plugin| plugin.is_active())
            .ok_or(EditorError::NoActiveSuggestion)?;
        let range = plugin.range().ok_or(EditorError::NoActiveSuggestion)?;
        let node = plugin.choose(index).ok_or(EditorError::NoSuchCandidate(index))?;
        self.commit_suggestion(range, node)
    }

    /// Paste plain text. A single video URL becomes a video embed that
    /// splits the current block; anything else is typed in.
    pub fn paste_text(&mut self, text: &str) -> EditorResult<()> {
        self.ensure_editable()?;
        let Some(video) = VideoEmbedExtension::handle_paste(text) else {
            return self.insert_text(text);
        };

        let (from, to) = self.text_range()?;
        let content = self.block_content(from.block)?;
        let left = trim_content(split_content(content, from.offset).0);
        let right = trim_content(split_content(content, to.offset).1);

        self.transact(|doc, selection| {
            let current = doc
                .leaf(from.block)
                .cloned()
                .ok_or(EditorError::NotATextBlock(from.block))?;
            let mut replacement = Vec::with_capacity(3);
            if !left.is_empty() {
                replacement.extend(current.with_content(left));
            }
            replacement.push(Block::VideoEmbed(video));
            let tail = if right.is_empty() {
                Block::paragraph(Vec::new())
            } else {
                current
                    .with_content(right)
                    .ok_or(EditorError::NotATextBlock(from.block))?
            };
            replacement.push(tail);

            let caret_block = from.block + replacement.len() - 1;
            doc.replace_leaf(from.block, replacement);
            *selection = Selection::caret(Position::new(caret_block, 0));
            Ok(())
        })
    }

    /// Dispatch a click on the unit at `position` to its node view
    pub fn click(&self, position: Position) -> NodeClick {
        let Some(content) = self.doc.leaf(position.block).and_then(Block::content) else {
            return NodeClick::Ignored;
        };
        let ctx = self.view_context();
        match node_at(content, position.offset) {
            Some(Inline::Hashtag(attrs)) => HashtagView::new(attrs, &ctx).click(self.filter.as_deref()),
            Some(Inline::ItemMention(attrs)) => {
                MentionView::new(attrs, &ctx).click(self.navigator.as_deref())
            }
            _ => NodeClick::Ignored,
        }
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    pub fn undo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(previous) = self.history.undo(current) else {
            return false;
        };
        self.restore(previous);
        true
    }

    pub fn redo(&mut self) -> bool {
        let current = self.snapshot();
        let Some(next) = self.history.redo(current) else {
            return false;
        };
        self.restore(next);
        true
    }

    /// Create a tag for every hashtag in the document that matches none,
    /// hand each to the tag sink and give the nodes the new ids.
    pub fn commit_new_hashtags(&mut self) -> Vec<Tag> {
        let known = self.tags.tags();
        let mut seen = HashSet::new();
        let created: Vec<Tag> = self
            .doc
            .hashtags()
            .into_iter()
            .filter(|attrs| find_tag(&known, &attrs.label).is_none())
            .filter(|attrs| seen.insert(attrs.label.to_lowercase()))
            .map(|attrs| Tag::create(attrs.label.clone(), self.config.tags.new_tag_color.clone()))
            .collect();

        for tag in &created {
            info!(tag = %tag.name, id = %tag.id, "creating tag from text");
            if let Some(sink) = &self.tag_sink {
                sink.add_tag(tag.clone());
            }
        }

        if !created.is_empty() {
            self.doc.for_each_inline_mut(|inline| {
                if let Inline::Hashtag(attrs) = inline {
                    if let Some(tag) = find_tag(&created, &attrs.label) {
                        attrs.id = Some(tag.id.clone());
                    }
                }
            });
        }

        created
    }

    fn commit_suggestion(&mut self, range: SuggestionRange, node: Inline) -> EditorResult<()> {
        debug!(block = range.block, from = range.from, to = range.to, "inserting suggestion");
        self.dismissed = None;
        self.replace_in_block(range.block, range.from, range.to, vec![node, Inline::text(" ")])
    }

    fn replace_in_block(
        &mut self,
        block: usize,
        from: usize,
        to: usize,
        insert: Vec<Inline>,
    ) -> EditorResult<()> {
        let inserted = content_size(&insert);
        self.transact(|doc, selection| {
            let target = doc
                .leaf_mut(block)
                .ok_or(EditorError::InvalidPosition { block, offset: from })?;
            let content = target.content().ok_or(EditorError::NotATextBlock(block))?;
            if to > content_size(content) {
                return Err(EditorError::InvalidPosition { block, offset: to });
            }
            let replaced = replace_content(content, from, to, insert);
            let updated = target
                .with_content(replaced)
                .ok_or(EditorError::NotATextBlock(block))?;
            *target = updated;
            *selection = Selection::caret(Position::new(block, from + inserted));
            Ok(())
        })
    }

    /// Apply one undoable change to copies of the document and selection
    fn transact(
        &mut self,
        change: impl FnOnce(&mut Document, &mut Selection) -> EditorResult<()>,
    ) -> EditorResult<()> {
        let mut doc = self.doc.clone();
        let mut selection = self.selection;
        change(&mut doc, &mut selection)?;

        if doc == self.doc {
            self.selection = selection;
            self.sync_suggestions();
            return Ok(());
        }

        let before = self.snapshot();
        self.history.record(before);
        self.doc = doc;
        self.selection = selection;
        self.after_change();
        Ok(())
    }

    fn snapshot(&self) -> Snapshot {
        Snapshot {
            doc: self.doc.clone(),
            selection: self.selection,
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.doc = snapshot.doc;
        self.selection = snapshot.selection;
        self.after_change();
    }

    fn after_change(&mut self) {
        if let Some(callback) = &self.on_update {
            callback(&to_markdown(&self.doc));
        }
        self.sync_suggestions();
    }

    /// Start, update or exit suggestion sessions for the text before the
    /// caret. At most one session is open: the match nearest the caret.
    fn sync_suggestions(&mut self) {
        if self.suggestions.is_empty() {
            return;
        }

        let caret = self.selection.head;
        let text = if self.selection.is_collapsed() {
            self.doc
                .leaf(caret.block)
                .and_then(Block::content)
                .map(|content| text_before(content, caret.offset))
        } else {
            None
        };

        let matches: Vec<_> = self
            .suggestions
            .iter()
            .map(|plugin| text.as_deref().and_then(|text| plugin.find_match(text)))
            .collect();

        if let Some((trigger, block, from)) = self.dismissed {
            let still_there = self
                .suggestions
                .iter()
                .zip(&matches)
                .any(|(plugin, matched)| {
                    plugin.trigger() == trigger
                        && block == caret.block
                        && matched.as_ref().is_some_and(|m| m.from == from)
                });
            if !still_there {
                self.dismissed = None;
            }
        }

        let winner = matches
            .iter()
            .enumerate()
            .filter_map(|(index, matched)| matched.as_ref().map(|m| (index, m.from)))
            .max_by_key(|(_, from)| *from)
            .map(|(index, _)| index);

        for (index, (plugin, matched)) in self.suggestions.iter_mut().zip(matches).enumerate() {
            let Some(matched) = matched.filter(|_| winner == Some(index)) else {
                plugin.exit();
                continue;
            };
            if self.dismissed == Some((plugin.trigger(), caret.block, matched.from)) {
                plugin.exit();
                continue;
            }
            let range = SuggestionRange {
                block: caret.block,
                from: matched.from,
                to: matched.to,
            };
            if plugin.is_active() {
                plugin.update(range, &matched.query, self.caret_rect);
            } else {
                plugin.start(range, &matched.query, self.caret_rect);
            }
        }
    }

    fn ensure_editable(&self) -> EditorResult<()> {
        if self.editable {
            Ok(())
        } else {
            Err(EditorError::ReadOnly)
        }
    }

    /// Ordered selection bounds, both in one text block
    fn text_range(&self) -> EditorResult<(Position, Position)> {
        let from = self.selection.from();
        let to = self.selection.to();
        if from.block != to.block {
            return Err(EditorError::CrossBlockSelection);
        }
        self.block_content(from.block)?;
        Ok((from, to))
    }

    fn block_content(&self, block: usize) -> EditorResult<&[Inline]> {
        self.doc
            .leaf(block)
            .ok_or(EditorError::InvalidPosition { block, offset: 0 })?
            .content()
            .ok_or(EditorError::NotATextBlock(block))
    }

    fn check_position(&self, position: Position) -> EditorResult<()> {
        let invalid = EditorError::InvalidPosition {
            block: position.block,
            offset: position.offset,
        };
        let block = self.doc.leaf(position.block).ok_or(invalid.clone())?;
        let size = if block.is_textblock() { block.content_size() } else { 0 };
        if position.offset > size {
            return Err(invalid);
        }
        Ok(())
    }

    fn end_position(&self) -> Position {
        let block = self.doc.leaf_count().saturating_sub(1);
        let offset = self.doc.leaf(block).map_or(0, Block::content_size);
        Position::new(block, offset)
    }
}

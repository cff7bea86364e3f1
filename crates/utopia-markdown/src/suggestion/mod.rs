//! Trigger-character autocomplete
//!
//! A [`Suggestion`] pairs a trigger character with a candidate source, a
//! command turning the chosen candidate into an inline node, and a
//! [`SuggestionPopup`] that displays the candidates. The editor drives it:
//! after every change it looks for a trigger match before the caret and
//! starts, updates or exits the session.
//!
//! Two factories build the concrete configurations: [`hashtag_suggestion`]
//! and [`mention_suggestion`].

pub mod hashtag;
pub mod list;
pub mod mention;

use std::sync::{Arc, Mutex};

use tracing::debug;

use crate::document::{Inline, OBJECT_REPLACEMENT};

pub use hashtag::{TagCandidate, hashtag_items, hashtag_suggestion};
pub use list::{ListAction, SuggestionList};
pub use mention::{mention_items, mention_suggestion};

/// Keys the editor forwards while a session may be open
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Key {
    ArrowUp,
    ArrowDown,
    Enter,
    Escape,
    Space,
    Backspace,
    Char(char),
}

/// Caret rectangle in client coordinates
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClientRect {
    pub left: f64,
    pub top: f64,
    pub width: f64,
    pub height: f64,
}

/// One row of the popup
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SuggestionEntry {
    pub label: String,
    /// The row creates something that does not exist yet
    pub is_new: bool,
}

/// Floating UI showing the candidates.
///
/// A session calls `open` once, `update` any number of times and `close`
/// exactly once, including when the session is dropped while open.
pub trait SuggestionPopup: Send {
    fn open(&mut self, anchor: Option<ClientRect>, entries: &[SuggestionEntry], selected: usize);
    fn update(&mut self, anchor: Option<ClientRect>, entries: &[SuggestionEntry], selected: usize);
    fn close(&mut self);
}

/// What a popup currently shows
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PopupState {
    pub is_open: bool,
    pub anchor: Option<ClientRect>,
    pub entries: Vec<SuggestionEntry>,
    pub selected: usize,
    pub open_count: usize,
    pub close_count: usize,
}

/// Popup that keeps its state in memory, for hosts that draw it
/// themselves and for tests
#[derive(Debug, Clone, Default)]
pub struct HeadlessPopup {
    state: Arc<Mutex<PopupState>>,
}

impl HeadlessPopup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> PopupState {
        self.state.lock().map(|s| s.clone()).unwrap_or_default()
    }

    fn with_state(&self, f: impl FnOnce(&mut PopupState)) {
        if let Ok(mut state) = self.state.lock() {
            f(&mut state);
        }
    }
}

impl SuggestionPopup for HeadlessPopup {
    fn open(&mut self, anchor: Option<ClientRect>, entries: &[SuggestionEntry], selected: usize) {
        self.with_state(|s| {
            s.is_open = true;
            s.anchor = anchor;
            s.entries = entries.to_vec();
            s.selected = selected;
            s.open_count += 1;
        });
    }

    fn update(&mut self, anchor: Option<ClientRect>, entries: &[SuggestionEntry], selected: usize) {
        self.with_state(|s| {
            s.anchor = anchor;
            s.entries = entries.to_vec();
            s.selected = selected;
        });
    }

    fn close(&mut self) {
        self.with_state(|s| {
            s.is_open = false;
            s.entries.clear();
            s.selected = 0;
            s.close_count += 1;
        });
    }
}

/// A trigger found before the caret; offsets are within the text block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TriggerMatch {
    /// Offset of the trigger character
    pub from: usize,
    /// Caret offset
    pub to: usize,
    /// Text typed after the trigger
    pub query: String,
}

/// Range of an active session
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SuggestionRange {
    pub block: usize,
    pub from: usize,
    pub to: usize,
}

/// Find `trigger` before the caret. `text_before` runs from the start of
/// the text block to the caret, atoms as U+FFFC. The trigger must start
/// the block or follow whitespace.
pub fn find_trigger(trigger: char, allow_spaces: bool, text_before: &str) -> Option<TriggerMatch> {
    let chars: Vec<char> = text_before.chars().collect();
    let to = chars.len();

    for index in (0..to).rev() {
        let c = chars[index];
        if c == trigger {
            let prev = index.checked_sub(1).map(|i| chars[i]);
            if prev.is_some_and(|p| !p.is_whitespace()) {
                return None;
            }
            return Some(TriggerMatch {
                from: index,
                to,
                query: chars[index + 1..].iter().collect(),
            });
        }
        if c == OBJECT_REPLACEMENT || c == '\n' || (!allow_spaces && c.is_whitespace()) {
            return None;
        }
    }
    None
}

/// Result of a key press during a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyOutcome {
    /// Not consumed; the editor applies its default action
    Ignored,
    /// Consumed by the popup (selection moved)
    Handled,
    /// Insert this node over the session range
    Commit(Inline),
    /// The session was dismissed
    Exit,
}

/// Object-safe view of a [`Suggestion`], as held by the editor
pub trait SuggestionPlugin: Send {
    fn trigger(&self) -> char;
    fn find_match(&self, text_before: &str) -> Option<TriggerMatch>;
    fn range(&self) -> Option<SuggestionRange>;
    fn query(&self) -> Option<&str>;
    fn start(&mut self, range: SuggestionRange, query: &str, anchor: Option<ClientRect>);
    fn update(&mut self, range: SuggestionRange, query: &str, anchor: Option<ClientRect>);
    fn exit(&mut self);
    fn key_down(&mut self, key: &Key) -> KeyOutcome;
    /// Commit the candidate at `index`, as a click in the popup does
    fn choose(&mut self, index: usize) -> Option<Inline>;
    fn entries(&self) -> Vec<SuggestionEntry>;
    fn selected_index(&self) -> usize;

    fn is_active(&self) -> bool {
        self.range().is_some()
    }
}

type ItemsFn<T> = Box<dyn Fn(&str) -> Vec<T> + Send + Sync>;
type CommandFn<T> = Box<dyn Fn(&T) -> Inline + Send + Sync>;

struct Session {
    range: SuggestionRange,
    query: String,
    anchor: Option<ClientRect>,
}

/// Autocomplete configuration and session state for one trigger character
pub struct Suggestion<T> {
    trigger: char,
    allow_spaces: bool,
    commit_on_space: bool,
    accepts_query: fn(&str) -> bool,
    items: ItemsFn<T>,
    command: CommandFn<T>,
    describe: fn(&T) -> SuggestionEntry,
    list: SuggestionList<T>,
    popup: Box<dyn SuggestionPopup>,
    session: Option<Session>,
}

impl<T: Clone + Send + 'static> Suggestion<T> {
    pub fn new(
        trigger: char,
        items: impl Fn(&str) -> Vec<T> + Send + Sync + 'static,
        command: impl Fn(&T) -> Inline + Send + Sync + 'static,
        describe: fn(&T) -> SuggestionEntry,
        popup: Box<dyn SuggestionPopup>,
    ) -> Self {
        Self {
            trigger,
            allow_spaces: false,
            commit_on_space: false,
            accepts_query: |_| true,
            items: Box::new(items),
            command: Box::new(command),
            describe,
            list: SuggestionList::new(),
            popup,
            session: None,
        }
    }

    /// Let the query contain spaces
    pub fn allow_spaces(mut self, allow: bool) -> Self {
        self.allow_spaces = allow;
        self
    }

    /// Space commits the first candidate
    pub fn commit_on_space(mut self, commit: bool) -> Self {
        self.commit_on_space = commit;
        self
    }

    /// Queries failing `accepts` do not open or keep a session
    pub fn accepts_query(mut self, accepts: fn(&str) -> bool) -> Self {
        self.accepts_query = accepts;
        self
    }

    /// Candidates currently listed
    pub fn candidates(&self) -> &[T] {
        self.list.items()
    }

    fn render_entries(&self) -> Vec<SuggestionEntry> {
        self.list.items().iter().map(self.describe).collect()
    }

    fn refresh_popup(&mut self, anchor: Option<ClientRect>) {
        let entries = self.render_entries();
        self.popup.update(anchor, &entries, self.list.selected_index());
    }

    fn commit(&mut self, item: &T) -> Inline {
        let node = (self.command)(item);
        self.exit();
        node
    }
}

impl<T: Clone + Send + 'static> SuggestionPlugin for Suggestion<T> {
    fn trigger(&self) -> char {
        self.trigger
    }

    fn find_match(&self, text_before: &str) -> Option<TriggerMatch> {
        find_trigger(self.trigger, self.allow_spaces, text_before)
            .filter(|m| (self.accepts_query)(&m.query))
    }

    fn range(&self) -> Option<SuggestionRange> {
        self.session.as_ref().map(|s| s.range)
    }

    fn query(&self) -> Option<&str> {
        self.session.as_ref().map(|s| s.query.as_str())
    }

    fn start(&mut self, range: SuggestionRange, query: &str, anchor: Option<ClientRect>) {
        if self.session.is_some() {
            self.exit();
        }
        self.list.set_items((self.items)(query));
        debug!(trigger = %self.trigger, query, candidates = self.list.items().len(), "suggestion started");
        let entries = self.render_entries();
        self.popup.open(anchor, &entries, self.list.selected_index());
        self.session = Some(Session {
            range,
            query: query.to_string(),
            anchor,
        });
    }

    fn update(&mut self, range: SuggestionRange, query: &str, anchor: Option<ClientRect>) {
        let Some(session) = self.session.as_mut() else {
            self.start(range, query, anchor);
            return;
        };
        session.range = range;
        session.anchor = anchor;
        if session.query != query {
            session.query = query.to_string();
            self.list.set_items((self.items)(query));
            debug!(trigger = %self.trigger, query, candidates = self.list.items().len(), "suggestion updated");
        }
        self.refresh_popup(anchor);
    }

    fn exit(&mut self) {
        if self.session.take().is_some() {
            debug!(trigger = %self.trigger, "suggestion exited");
            self.popup.close();
            self.list.set_items(Vec::new());
        }
    }

    fn key_down(&mut self, key: &Key) -> KeyOutcome {
        if self.session.is_none() {
            return KeyOutcome::Ignored;
        }

        match key {
            Key::Escape => {
                self.exit();
                KeyOutcome::Exit
            }
            Key::Space if self.commit_on_space => {
                let typed = self.query().is_some_and(|q| !q.is_empty());
                match self.list.get(0).cloned() {
                    Some(first) if typed => KeyOutcome::Commit(self.commit(&first)),
                    _ => KeyOutcome::Ignored,
                }
            }
            _ => match self.list.on_key_down(key) {
                ListAction::Moved => {
                    let anchor = self.session.as_ref().and_then(|s| s.anchor);
                    self.refresh_popup(anchor);
                    KeyOutcome::Handled
                }
                ListAction::Chosen(item) => KeyOutcome::Commit(self.commit(&item)),
                ListAction::Ignored => KeyOutcome::Ignored,
            },
        }
    }

    fn choose(&mut self, index: usize) -> Option<Inline> {
        self.session.as_ref()?;
        let item = self.list.get(index).cloned()?;
        Some(self.commit(&item))
    }

    fn entries(&self) -> Vec<SuggestionEntry> {
        self.render_entries()
    }

    fn selected_index(&self) -> usize {
        self.list.selected_index()
    }
}

impl<T> Drop for Suggestion<T> {
    fn drop(&mut self) {
        if self.session.take().is_some() {
            self.popup.close();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn words() -> Suggestion<String> {
        Suggestion::new(
            '@',
            |query: &str| {
                ["alpha", "beta", "gamma"]
                    .iter()
                    .filter(|w| w.contains(query))
                    .map(|w| w.to_string())
                    .collect()
            },
            |word: &String| Inline::text(word.clone()),
            |word: &String| SuggestionEntry {
                label: word.clone(),
                is_new: false,
            },
            Box::new(HeadlessPopup::new()),
        )
    }

    fn range(to: usize) -> SuggestionRange {
        SuggestionRange { block: 0, from: 0, to }
    }

    #[test]
    fn test_find_trigger() {
        let m = find_trigger('#', false, "Hello #wor").unwrap();
        assert_eq!((m.from, m.to, m.query.as_str()), (6, 10, "wor"));
        assert_eq!(find_trigger('#', false, "#").unwrap().query, "");
    }

    #[test]
    fn test_trigger_needs_whitespace_before() {
        assert!(find_trigger('#', false, "a#b").is_none());
        assert!(find_trigger('@', false, "mail me@home").is_none());
    }

    #[test]
    fn test_whitespace_ends_query_unless_allowed() {
        assert!(find_trigger('@', false, "@Ali ce").is_none());
        assert_eq!(find_trigger('@', true, "@Ali ce").unwrap().query, "Ali ce");
        assert!(find_trigger('@', true, "@Ali\nce").is_none());
    }

    #[test]
    fn test_atom_ends_query() {
        assert!(find_trigger('#', false, "#a\u{FFFC}b").is_none());
    }

    #[test]
    fn test_popup_lifecycle() {
        let popup = HeadlessPopup::new();
        let mut suggestion = words();
        suggestion.popup = Box::new(popup.clone());

        suggestion.start(range(1), "", None);
        assert!(popup.state().is_open);
        assert_eq!(popup.state().entries.len(), 3);

        suggestion.update(range(3), "ta", None);
        assert_eq!(popup.state().entries.len(), 1);

        suggestion.exit();
        let state = popup.state();
        assert!(!state.is_open);
        assert!(state.entries.is_empty());
        assert_eq!((state.open_count, state.close_count), (1, 1));
    }

    #[test]
    fn test_drop_closes_open_popup() {
        let popup = HeadlessPopup::new();
        {
            let mut suggestion = words();
            suggestion.popup = Box::new(popup.clone());
            suggestion.start(range(1), "", None);
        }
        assert!(!popup.state().is_open);
        assert_eq!(popup.state().close_count, 1);
    }

    #[test]
    fn test_keys() {
        let mut suggestion = words();
        assert_eq!(suggestion.key_down(&Key::Enter), KeyOutcome::Ignored);

        suggestion.start(range(1), "", None);
        assert_eq!(suggestion.key_down(&Key::ArrowUp), KeyOutcome::Handled);
        assert_eq!(suggestion.selected_index(), 2);
        assert_eq!(
            suggestion.key_down(&Key::Enter),
            KeyOutcome::Commit(Inline::text("gamma"))
        );
        assert!(!suggestion.is_active());

        suggestion.start(range(1), "", None);
        assert_eq!(suggestion.key_down(&Key::Escape), KeyOutcome::Exit);
        assert!(!suggestion.is_active());
    }

    #[test]
    fn test_new_query_resets_selection() {
        let mut suggestion = words();
        suggestion.start(range(1), "", None);
        suggestion.key_down(&Key::ArrowDown);
        assert_eq!(suggestion.selected_index(), 1);
        suggestion.update(range(2), "a", None);
        assert_eq!(suggestion.selected_index(), 0);
    }

    #[test]
    fn test_choose_by_index() {
        let mut suggestion = words();
        suggestion.start(range(1), "", None);
        assert_eq!(suggestion.choose(1), Some(Inline::text("beta")));
        assert_eq!(suggestion.choose(0), None);
    }
}

//! Keyboard-navigable candidate list

use super::Key;

/// What the list did with a key
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ListAction<T> {
    /// Selection moved
    Moved,
    /// Enter on a candidate
    Chosen(T),
    /// Not a list key, or nothing to choose
    Ignored,
}

/// Candidates with a selected index that wraps at both ends
#[derive(Debug, Clone)]
pub struct SuggestionList<T> {
    items: Vec<T>,
    selected: usize,
}

impl<T> Default for SuggestionList<T> {
    fn default() -> Self {
        Self {
            items: Vec::new(),
            selected: 0,
        }
    }
}

impl<T: Clone> SuggestionList<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the candidates; selection goes back to the first
    pub fn set_items(&mut self, items: Vec<T>) {
        self.items = items;
        self.selected = 0;
    }

    pub fn items(&self) -> &[T] {
        &self.items
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn selected_index(&self) -> usize {
        self.selected
    }

    pub fn selected(&self) -> Option<&T> {
        self.items.get(self.selected)
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        self.items.get(index)
    }

    pub fn move_up(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + self.items.len() - 1) % self.items.len();
        }
    }

    pub fn move_down(&mut self) {
        if !self.items.is_empty() {
            self.selected = (self.selected + 1) % self.items.len();
        }
    }

    pub fn on_key_down(&mut self, key: &Key) -> ListAction<T> {
        match key {
            Key::ArrowUp if !self.items.is_empty() => {
                self.move_up();
                ListAction::Moved
            }
            Key::ArrowDown if !self.items.is_empty() => {
                self.move_down();
                ListAction::Moved
            }
            Key::Enter => match self.selected() {
                Some(item) => ListAction::Chosen(item.clone()),
                None => ListAction::Ignored,
            },
            _ => ListAction::Ignored,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list() -> SuggestionList<&'static str> {
        let mut list = SuggestionList::new();
        list.set_items(vec!["a", "b", "c"]);
        list
    }

    #[test]
    fn test_arrows_wrap() {
        let mut list = list();
        assert_eq!(list.on_key_down(&Key::ArrowUp), ListAction::Moved);
        assert_eq!(list.selected(), Some(&"c"));
        assert_eq!(list.on_key_down(&Key::ArrowDown), ListAction::Moved);
        assert_eq!(list.selected(), Some(&"a"));
    }

    #[test]
    fn test_enter_chooses_selected() {
        let mut list = list();
        list.move_down();
        assert_eq!(list.on_key_down(&Key::Enter), ListAction::Chosen("b"));
    }

    #[test]
    fn test_new_items_reset_selection() {
        let mut list = list();
        list.move_down();
        list.set_items(vec!["x", "y"]);
        assert_eq!(list.selected_index(), 0);
    }

    #[test]
    fn test_empty_list_ignores_keys() {
        let mut list: SuggestionList<&str> = SuggestionList::new();
        assert_eq!(list.on_key_down(&Key::ArrowDown), ListAction::Ignored);
        assert_eq!(list.on_key_down(&Key::Enter), ListAction::Ignored);
    }
}

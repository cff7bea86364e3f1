//! Editor error types
//!
//! Parsing and rendering never fail: unrecognized input falls back to plain
//! text. Errors only arise when a caller addresses the document with a
//! position or candidate that does not exist.

use thiserror::Error;

/// Editor error type
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EditorError {
    /// Position outside the document
    #[error("Invalid position: block {block}, offset {offset}")]
    InvalidPosition {
        /// Top-level block index
        block: usize,
        /// Offset inside the block
        offset: usize,
    },

    /// The block holds no inline content (video embed, list, code block)
    #[error("Block {0} is not a text block")]
    NotATextBlock(usize),

    /// Selection endpoints are in different blocks
    #[error("Selection spans more than one block")]
    CrossBlockSelection,

    /// Mutation attempted on a read-only editor
    #[error("Editor is read-only")]
    ReadOnly,

    /// No suggestion popup is open
    #[error("No active suggestion session")]
    NoActiveSuggestion,

    /// Candidate index out of range
    #[error("No suggestion candidate at index {0}")]
    NoSuchCandidate(usize),
}

/// Specialized Result type for editor operations
pub type EditorResult<T> = Result<T, EditorError>;

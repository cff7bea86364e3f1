//! # Utopia Markdown Configuration
//!
//! Settings consumed by the `utopia-markdown` crate: suggestion limits,
//! default colors for tags and mentions, editor placeholder text and the
//! preview truncation limit.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use utopia_config::{ConfigLoader, MarkdownConfig};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config: MarkdownConfig = ConfigLoader::load_from_file("markdown.toml")?;
//!     println!("{}", config.editor.placeholder);
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

mod config;
mod error;
mod loader;

pub use config::*;
pub use error::*;
pub use loader::*;

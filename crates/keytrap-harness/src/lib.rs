#![forbid(unsafe_code)]

//! Test harness for keytrap.
//!
//! Provides [`MemoryDocument`], an in-memory element tree implementing
//! [`keytrap::DocumentView`], together with the CSS selector subset the
//! focus traps rely on and a small HTML fixture reader.
//!
//! # Supported selectors
//!
//! | Form | Example |
//! |------|---------|
//! | type / universal | `button`, `*` |
//! | id / class | `#dialog`, `.modal.open` |
//! | attribute presence / equality | `[href]`, `[tabindex="-1"]` |
//! | negation of a compound | `:not([disabled])` |
//! | descendant / child | `.modal input`, `ul > li` |
//! | list | `a[href], button` |
//!
//! Attribute names match case-insensitively; values match exactly.
//!
//! # Example
//!
//! ```ignore
//! use keytrap_harness::MemoryDocument;
//!
//! let mut doc = MemoryDocument::from_html(r#"
//!     <button id="open">Open</button>
//!     <div class="modal"><input id="a"><input id="b"></div>
//! "#)?;
//! doc.focus(&doc.get("#b"));
//! doc.press_tab();
//! ```

pub mod document;
pub mod html;
pub mod selector;

pub use document::{MemoryDocument, NodeId};
pub use html::FixtureError;
pub use selector::{ElementTree, SelectorList};

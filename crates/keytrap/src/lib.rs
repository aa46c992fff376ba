#![forbid(unsafe_code)]

//! Keyboard focus traps for modal UI.
//!
//! A *trap* keeps keyboard users inside a region of the document (a dialog,
//! a menu) until it is released. While a trap is active:
//!
//! - **Exclusion**: every focusable element outside the trap's [`Area`]s is
//!   taken out of tab order (`tabindex="-1"`), with its previous value saved
//!   in a restore marker attribute.
//! - **Looping**: a document-level keydown listener wraps Tab on the last
//!   trapped element to the first, and Shift+Tab on the first to the last.
//! - **Autofocus**: an optional selector receives focus on activation.
//! - **Restore**: [`TrapRegistry::release`] puts back focus, attributes and
//!   listeners exactly as they were.
//!
//! The document is reached only through the [`DocumentView`] trait, so the
//! same registry runs against a browser DOM or an in-memory test document.
//!
//! # Example
//!
//! ```
//! use keytrap::{Area, DocumentView, TrapConfig, TrapRegistry};
//! use keytrap_harness::MemoryDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = MemoryDocument::from_html(
//!     r#"<button id="open">Open</button>
//!        <div class="modal"><input id="name"><button id="ok">OK</button></div>"#,
//! )?;
//! let open = doc.get("#open");
//! doc.focus(&open);
//!
//! let mut traps = TrapRegistry::new();
//! traps.set_trap(
//!     TrapConfig::new("modal")
//!         .area(Area::container(".modal"))
//!         .auto_focus(".modal"),
//! );
//!
//! traps.trap_within(&mut doc, "modal")?;
//! assert!(traps.is_trapped());
//! assert_eq!(doc.attribute(&open, "tabindex").as_deref(), Some("-1"));
//!
//! traps.release(&mut doc);
//! assert!(!traps.is_trapped());
//! assert_eq!(doc.attribute(&open, "tabindex"), None);
//! assert_eq!(doc.active_element(), Some(open));
//! # Ok(())
//! # }
//! ```

pub mod classify;
pub mod config;
pub mod document;
pub mod error;
pub mod intercept;
pub mod registry;
pub mod store;

pub use classify::Classification;
pub use config::{Area, DEFAULT_FOCUSABLE_SELECTORS, TrapConfig, TrapOptions};
pub use document::{
    DocumentView, ElementHandle, KeyCode, KeyDisposition, KeyEvent, KeyListener, ListenerId,
    Modifiers,
};
#[cfg(feature = "config-files")]
pub use error::ConfigError;
pub use error::{SelectorError, TrapError};
pub use intercept::LoopHandler;
pub use registry::{ActivationReport, ReleaseReport, TrapRegistry};
pub use store::{TrapRuntimeState, TrapStore};

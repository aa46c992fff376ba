#![forbid(unsafe_code)]

//! Host document capability interface.
//!
//! The trap registry never touches a real DOM directly. Everything it needs
//! from the host goes through [`DocumentView`]: selector queries, attribute
//! reads and writes, focus, and document-level keydown subscription.
//!
//! A browser backend implements this over `web_sys::Document`; tests use the
//! in-memory document from `keytrap-harness`.
//!
//! # Invariants
//!
//! 1. `query_selector_all` returns matches in document order.
//! 2. `add_key_listener` returns a fresh [`ListenerId`] per call; removing an
//!    id twice is harmless and returns `false` the second time.
//! 3. Listeners receive the document itself, so they may query and move
//!    focus during dispatch.

use std::fmt;
use std::rc::Rc;

use bitflags::bitflags;

use crate::error::SelectorError;

/// Capability interface over the host document.
///
/// Method names follow their DOM counterparts (`querySelectorAll`,
/// `matches`, `closest`, `getAttribute`, ...). The trait is object safe so
/// key listeners can receive `&mut dyn DocumentView`.
pub trait DocumentView {
    /// Handle to a single element.
    type Element: ElementHandle;

    /// All elements matching `selector`, in document order.
    fn query_selector_all(&self, selector: &str) -> Result<Vec<Self::Element>, SelectorError>;

    /// First element matching `selector`, if any.
    fn query_selector(&self, selector: &str) -> Result<Option<Self::Element>, SelectorError> {
        Ok(self.query_selector_all(selector)?.into_iter().next())
    }

    /// Whether `element` itself matches `selector`.
    fn matches(&self, element: &Self::Element, selector: &str) -> Result<bool, SelectorError>;

    /// Nearest inclusive ancestor of `element` matching `selector`.
    fn closest(
        &self,
        element: &Self::Element,
        selector: &str,
    ) -> Result<Option<Self::Element>, SelectorError>;

    /// Attribute value, or `None` when the attribute is absent.
    fn attribute(&self, element: &Self::Element, name: &str) -> Option<String>;

    /// Set (or overwrite) an attribute.
    fn set_attribute(&mut self, element: &Self::Element, name: &str, value: &str);

    /// Remove an attribute. Removing an absent attribute is a no-op.
    fn remove_attribute(&mut self, element: &Self::Element, name: &str);

    /// Element currently holding focus.
    fn active_element(&self) -> Option<Self::Element>;

    /// Move focus to `element`.
    fn focus(&mut self, element: &Self::Element);

    /// Whether `element` is still attached to the document.
    fn is_connected(&self, element: &Self::Element) -> bool;

    /// Install a document-level keydown listener.
    fn add_key_listener(&mut self, listener: Rc<dyn KeyListener<Self::Element>>) -> ListenerId;

    /// Remove a previously installed listener. Returns whether it was installed.
    fn remove_key_listener(&mut self, id: ListenerId) -> bool;
}

/// Bounds every element handle satisfies. Equality must be identity.
pub trait ElementHandle: Clone + PartialEq + fmt::Debug + 'static {}

impl<T: Clone + PartialEq + fmt::Debug + 'static> ElementHandle for T {}

/// Subscription handle for an installed keydown listener.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ListenerId(u64);

impl ListenerId {
    /// Wrap a raw id. Hosts allocate these; the registry only stores them.
    #[inline]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Get the raw id value.
    #[inline]
    pub const fn id(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ListenerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "listener#{}", self.0)
    }
}

/// Document-level keydown handler.
pub trait KeyListener<E: ElementHandle> {
    /// Called synchronously for every keydown while installed.
    fn on_key_down(&self, doc: &mut dyn DocumentView<Element = E>, event: &mut KeyEvent<E>);
}

bitflags! {
    /// Modifier keys held during a key event.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct Modifiers: u8 {
        const SHIFT = 0b0001;
        const CTRL  = 0b0010;
        const ALT   = 0b0100;
        const SUPER = 0b1000;
    }
}

/// Logical key identifier, mapped from the DOM `KeyboardEvent.key` value.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum KeyCode {
    Tab,
    Enter,
    Escape,
    Backspace,
    Up,
    Down,
    Left,
    Right,
    /// A printable character.
    Char(char),
    /// Any other named key, kept verbatim.
    Other(String),
}

impl KeyCode {
    /// Map a DOM `key` string (`"Tab"`, `"Escape"`, `"a"`, ...) to a key code.
    #[must_use]
    pub fn from_key(key: &str) -> Self {
        match key {
            "Tab" => Self::Tab,
            "Enter" => Self::Enter,
            "Escape" | "Esc" => Self::Escape,
            "Backspace" => Self::Backspace,
            "ArrowUp" | "Up" => Self::Up,
            "ArrowDown" | "Down" => Self::Down,
            "ArrowLeft" | "Left" => Self::Left,
            "ArrowRight" | "Right" => Self::Right,
            _ => {
                let mut chars = key.chars();
                match (chars.next(), chars.next()) {
                    (Some(ch), None) => Self::Char(ch),
                    _ => Self::Other(key.to_owned()),
                }
            }
        }
    }
}

/// A keydown event as delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyEvent<E> {
    /// Element the event was dispatched to (the focused element).
    pub target: Option<E>,
    pub code: KeyCode,
    pub modifiers: Modifiers,
    default_prevented: bool,
}

impl<E> KeyEvent<E> {
    /// Create an event with no target.
    pub fn new(code: KeyCode, modifiers: Modifiers) -> Self {
        Self {
            target: None,
            code,
            modifiers,
            default_prevented: false,
        }
    }

    /// Plain Tab.
    pub fn tab() -> Self {
        Self::new(KeyCode::Tab, Modifiers::empty())
    }

    /// Shift+Tab.
    pub fn shift_tab() -> Self {
        Self::new(KeyCode::Tab, Modifiers::SHIFT)
    }

    /// Set the event target.
    #[must_use]
    pub fn with_target(mut self, target: E) -> Self {
        self.target = Some(target);
        self
    }

    /// Suppress the host's default action (sequential navigation for Tab).
    pub fn prevent_default(&mut self) {
        self.default_prevented = true;
    }

    #[inline]
    pub fn is_default_prevented(&self) -> bool {
        self.default_prevented
    }

    /// Tab pressed with Shift held.
    #[inline]
    pub fn is_backward_tab(&self) -> bool {
        self.code == KeyCode::Tab && self.modifiers.contains(Modifiers::SHIFT)
    }

    /// Tab pressed without Shift.
    #[inline]
    pub fn is_forward_tab(&self) -> bool {
        self.code == KeyCode::Tab && !self.modifiers.contains(Modifiers::SHIFT)
    }
}

/// What a key listener did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyDisposition {
    /// Not intercepted; the host's default navigation proceeds.
    PassThrough,
    /// Tab on the last looped element; focus moved to the first.
    WrappedToFirst,
    /// Shift+Tab on the first looped element; focus moved to the last.
    WrappedToLast,
}

impl KeyDisposition {
    #[inline]
    pub fn intercepted(self) -> bool {
        !matches!(self, Self::PassThrough)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_code_from_dom_key() {
        assert_eq!(KeyCode::from_key("Tab"), KeyCode::Tab);
        assert_eq!(KeyCode::from_key("Esc"), KeyCode::Escape);
        assert_eq!(KeyCode::from_key("ArrowLeft"), KeyCode::Left);
        assert_eq!(KeyCode::from_key("q"), KeyCode::Char('q'));
        assert_eq!(KeyCode::from_key("ä"), KeyCode::Char('ä'));
        assert_eq!(KeyCode::from_key("F5"), KeyCode::Other("F5".into()));
    }

    #[test]
    fn tab_direction() {
        let fwd: KeyEvent<u32> = KeyEvent::tab();
        assert!(fwd.is_forward_tab());
        assert!(!fwd.is_backward_tab());

        let back: KeyEvent<u32> = KeyEvent::shift_tab();
        assert!(back.is_backward_tab());
        assert!(!back.is_forward_tab());

        let ctrl_tab: KeyEvent<u32> = KeyEvent::new(KeyCode::Tab, Modifiers::CTRL);
        assert!(ctrl_tab.is_forward_tab());

        let shift_a: KeyEvent<u32> = KeyEvent::new(KeyCode::Char('A'), Modifiers::SHIFT);
        assert!(!shift_a.is_backward_tab());
        assert!(!shift_a.is_forward_tab());
    }

    #[test]
    fn prevent_default_sticks() {
        let mut ev = KeyEvent::tab().with_target(7_u32);
        assert_eq!(ev.target, Some(7));
        assert!(!ev.is_default_prevented());
        ev.prevent_default();
        assert!(ev.is_default_prevented());
    }

    #[test]
    fn listener_id_display() {
        assert_eq!(ListenerId::new(3).to_string(), "listener#3");
        assert_eq!(ListenerId::new(3).id(), 3);
    }

    #[test]
    fn disposition_intercepted() {
        assert!(!KeyDisposition::PassThrough.intercepted());
        assert!(KeyDisposition::WrappedToFirst.intercepted());
        assert!(KeyDisposition::WrappedToLast.intercepted());
    }
}

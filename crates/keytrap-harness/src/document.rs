#![forbid(unsafe_code)]

//! In-memory document implementing [`DocumentView`].
//!
//! Models just enough of a browser document to exercise focus traps:
//! an element tree with attributes, a focused element, document-level
//! keydown listeners, and a default Tab action that walks the tab order.
//!
//! # Differences from a browser
//!
//! - Any connected element can take focus; there is no focusability check.
//! - Default Tab navigation uses document order only. Positive `tabindex`
//!   values are treated like `0`, and navigation wraps at the ends instead of
//!   leaving for browser chrome.
//! - Removing the focused element (or an ancestor) clears focus.

use std::fmt;
use std::rc::Rc;

use keytrap::{
    DocumentView, KeyCode, KeyEvent, KeyListener, ListenerId, Modifiers, SelectorError,
    TrapOptions,
};
use tracing::trace;

use crate::selector::{self, ElementTree};

/// Element handle into a [`MemoryDocument`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    #[inline]
    pub const fn index(self) -> usize {
        self.0
    }
}

#[derive(Debug, Clone)]
struct Node {
    tag: String,
    attrs: Vec<(String, String)>,
    parent: Option<NodeId>,
    children: Vec<NodeId>,
}

/// Element tree plus focus and keydown listeners.
pub struct MemoryDocument {
    nodes: Vec<Node>,
    root: NodeId,
    body: NodeId,
    focused: Option<NodeId>,
    listeners: Vec<(ListenerId, Rc<dyn KeyListener<NodeId>>)>,
    next_listener: u64,
}

impl fmt::Debug for MemoryDocument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryDocument")
            .field("nodes", &self.nodes.len())
            .field("focused", &self.focused)
            .field("listeners", &self.listeners.len())
            .finish()
    }
}

impl Default for MemoryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryDocument {
    /// An empty `<html><body></body></html>` document.
    pub fn new() -> Self {
        let mut doc = Self {
            nodes: Vec::new(),
            root: NodeId(0),
            body: NodeId(0),
            focused: None,
            listeners: Vec::new(),
            next_listener: 1,
        };
        doc.root = doc.create_element("html");
        doc.body = doc.create_element("body");
        doc.append_child(doc.root, doc.body);
        doc
    }

    #[inline]
    pub fn root(&self) -> NodeId {
        self.root
    }

    #[inline]
    pub fn body(&self) -> NodeId {
        self.body
    }

    // --- Tree building ---

    /// Create a detached element.
    pub fn create_element(&mut self, tag: &str) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(Node {
            tag: tag.to_ascii_lowercase(),
            attrs: Vec::new(),
            parent: None,
            children: Vec::new(),
        });
        id
    }

    /// Append `child` as the last child of `parent`, detaching it first.
    pub fn append_child(&mut self, parent: NodeId, child: NodeId) {
        self.detach(child);
        self.nodes[child.0].parent = Some(parent);
        self.nodes[parent.0].children.push(child);
    }

    /// Create an element with attributes and append it to `parent`.
    pub fn element(&mut self, parent: NodeId, tag: &str, attrs: &[(&str, &str)]) -> NodeId {
        let id = self.create_element(tag);
        for (name, value) in attrs {
            self.set_attr(id, name, value);
        }
        self.append_child(parent, id);
        id
    }

    /// Detach `node` (and its subtree) from the document.
    pub fn remove(&mut self, node: NodeId) {
        self.detach(node);
        if let Some(focused) = self.focused
            && !self.is_connected(&focused)
        {
            trace!(?focused, "focused element removed, focus cleared");
            self.focused = None;
        }
    }

    fn detach(&mut self, node: NodeId) {
        if let Some(parent) = self.nodes[node.0].parent.take() {
            self.nodes[parent.0].children.retain(|&c| c != node);
        }
    }

    // --- Inspection ---

    pub fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    pub fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }

    pub fn children(&self, node: NodeId) -> &[NodeId] {
        &self.nodes[node.0].children
    }

    /// Attributes in insertion order.
    pub fn attributes(&self, node: NodeId) -> impl Iterator<Item = (&str, &str)> {
        self.nodes[node.0]
            .attrs
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Connected elements in document (pre-)order, starting at the root.
    pub fn document_order(&self) -> Vec<NodeId> {
        let mut out = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![self.root];
        while let Some(node) = stack.pop() {
            out.push(node);
            stack.extend(self.nodes[node.0].children.iter().rev());
        }
        out
    }

    /// First element matching `selector`.
    ///
    /// # Panics
    ///
    /// Panics if the selector is invalid or matches nothing. Test helper.
    #[track_caller]
    pub fn get(&self, selector: &str) -> NodeId {
        match self.query_selector(selector) {
            Ok(Some(node)) => node,
            Ok(None) => panic!("no element matches `{selector}`"),
            Err(err) => panic!("{err}"),
        }
    }

    /// Number of installed keydown listeners.
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Elements reachable by sequential Tab navigation, in document order.
    pub fn tab_order(&self) -> Vec<NodeId> {
        self.query_selector_all(&TrapOptions::default().focusable_selector())
            .unwrap_or_default()
    }

    // --- Events ---

    /// Deliver a keydown to every installed listener.
    ///
    /// Listeners removed during dispatch are not invoked; listeners added
    /// during dispatch wait for the next event.
    pub fn dispatch_key(&mut self, mut event: KeyEvent<NodeId>) -> KeyEvent<NodeId> {
        let snapshot: Vec<_> = self
            .listeners
            .iter()
            .map(|(id, l)| (*id, Rc::clone(l)))
            .collect();
        for (id, listener) in snapshot {
            if !self.listeners.iter().any(|(installed, _)| *installed == id) {
                continue;
            }
            listener.on_key_down(self, &mut event);
        }
        event
    }

    /// Press a key on the focused element: dispatch, then run the default
    /// action unless a listener prevented it.
    pub fn press(&mut self, code: KeyCode, modifiers: Modifiers) -> KeyEvent<NodeId> {
        let mut event = KeyEvent::new(code, modifiers);
        event.target = self.focused;
        let event = self.dispatch_key(event);
        if !event.is_default_prevented() && event.code == KeyCode::Tab {
            self.sequential_focus(event.modifiers.contains(Modifiers::SHIFT));
        }
        event
    }

    pub fn press_tab(&mut self) -> KeyEvent<NodeId> {
        self.press(KeyCode::Tab, Modifiers::empty())
    }

    pub fn press_shift_tab(&mut self) -> KeyEvent<NodeId> {
        self.press(KeyCode::Tab, Modifiers::SHIFT)
    }

    fn sequential_focus(&mut self, backward: bool) {
        let order = self.document_order();
        let position = |n: NodeId| order.iter().position(|&o| o == n);
        let current = self.focused.and_then(position);
        let tabbable = self.tab_order();

        let next = if backward {
            tabbable
                .iter()
                .rev()
                .find(|&&n| current.is_none_or(|cur| position(n) < Some(cur)))
                .or(tabbable.last())
        } else {
            tabbable
                .iter()
                .find(|&&n| current.is_none_or(|cur| position(n) > Some(cur)))
                .or(tabbable.first())
        };
        if let Some(&next) = next {
            trace!(from = ?self.focused, to = ?next, backward, "default tab navigation");
            self.focused = Some(next);
        }
    }

    fn set_attr(&mut self, node: NodeId, name: &str, value: &str) {
        let name = name.to_ascii_lowercase();
        let attrs = &mut self.nodes[node.0].attrs;
        match attrs.iter_mut().find(|(k, _)| *k == name) {
            Some((_, v)) => *v = value.to_owned(),
            None => attrs.push((name, value.to_owned())),
        }
    }
}

impl ElementTree for MemoryDocument {
    type Node = NodeId;

    fn tag(&self, node: NodeId) -> &str {
        &self.nodes[node.0].tag
    }

    fn attr(&self, node: NodeId, name: &str) -> Option<&str> {
        self.nodes[node.0]
            .attrs
            .iter()
            .find(|(k, _)| k == name)
            .map(|(_, v)| v.as_str())
    }

    fn parent(&self, node: NodeId) -> Option<NodeId> {
        self.nodes[node.0].parent
    }
}

impl DocumentView for MemoryDocument {
    type Element = NodeId;

    fn query_selector_all(&self, selector: &str) -> Result<Vec<NodeId>, SelectorError> {
        let list = selector::parse(selector)?;
        Ok(self
            .document_order()
            .into_iter()
            .filter(|&n| list.matches(self, n))
            .collect())
    }

    fn matches(&self, element: &NodeId, selector: &str) -> Result<bool, SelectorError> {
        Ok(selector::parse(selector)?.matches(self, *element))
    }

    fn closest(&self, element: &NodeId, selector: &str) -> Result<Option<NodeId>, SelectorError> {
        let list = selector::parse(selector)?;
        let mut cursor = Some(*element);
        while let Some(node) = cursor {
            if list.matches(self, node) {
                return Ok(Some(node));
            }
            cursor = self.nodes[node.0].parent;
        }
        Ok(None)
    }

    fn attribute(&self, element: &NodeId, name: &str) -> Option<String> {
        ElementTree::attr(self, *element, &name.to_ascii_lowercase()).map(str::to_owned)
    }

    fn set_attribute(&mut self, element: &NodeId, name: &str, value: &str) {
        self.set_attr(*element, name, value);
    }

    fn remove_attribute(&mut self, element: &NodeId, name: &str) {
        let name = name.to_ascii_lowercase();
        self.nodes[element.0].attrs.retain(|(k, _)| *k != name);
    }

    fn active_element(&self) -> Option<NodeId> {
        self.focused
    }

    fn focus(&mut self, element: &NodeId) {
        if self.is_connected(element) {
            self.focused = Some(*element);
        }
    }

    fn is_connected(&self, element: &NodeId) -> bool {
        let mut cursor = Some(*element);
        while let Some(node) = cursor {
            if node == self.root {
                return true;
            }
            cursor = self.nodes[node.0].parent;
        }
        false
    }

    fn add_key_listener(&mut self, listener: Rc<dyn KeyListener<NodeId>>) -> ListenerId {
        let id = ListenerId::new(self.next_listener);
        self.next_listener += 1;
        self.listeners.push((id, listener));
        id
    }

    fn remove_key_listener(&mut self, id: ListenerId) -> bool {
        let before = self.listeners.len();
        self.listeners.retain(|(installed, _)| *installed != id);
        self.listeners.len() != before
    }
}

#![forbid(unsafe_code)]

//! Trap registry and activation controller.
//!
//! The registry owns every registered trap and drives the state machine:
//!
//! ```text
//!            trap_within(a)                 trap_within(b)
//! NoActiveTrap ─────────────▶ OneActiveTrap(a) ─────────────▶ OneActiveTrap(b)
//!      ▲                            │           (release(a), then activate b)
//!      └────────── release() ───────┘
//! ```
//!
//! # Invariants
//!
//! 1. **At most one active trap.** Activating a trap first releases the
//!    current one; traps never stack.
//! 2. **One listener per activation.** A keydown listener is installed iff a
//!    trap is active, and `release` removes every listener the store knows.
//! 3. **No lasting side effects.** Every element whose navigation attribute
//!    was overridden carries a restore marker until release; after release
//!    neither the override nor the marker remains.
//!
//! # Failure Modes
//!
//! | Failure | Behavior |
//! |---------|----------|
//! | Unknown trap name | `Err(NotFound)`, nothing changed |
//! | Invalid selector | `Err(Selector)`, nothing changed |
//! | Autofocus selector matches nothing | Focus not moved, logged |
//! | Trigger element detached at release | Focus not restored, logged |
//! | `release` with no active trap | No-op |
//!
//! # Reentrancy
//!
//! The registry never holds a borrow of the document across calls, and
//! `trap_within`/`release` run to completion synchronously. A key listener
//! holding `Rc<RefCell<TrapRegistry<_>>>` may therefore activate another
//! trap from inside `on_key_down`, using the document it was handed.
//!
//! # Example
//!
//! ```
//! use keytrap::{Area, DocumentView, TrapConfig, TrapRegistry};
//! use keytrap_harness::MemoryDocument;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut doc = MemoryDocument::from_html(
//!     r#"<div class="modal"><input id="first"><input id="last"></div>"#,
//! )?;
//! let (first, last) = (doc.get("#first"), doc.get("#last"));
//!
//! let mut traps = TrapRegistry::new();
//! traps.set_trap(
//!     TrapConfig::new("modal")
//!         .area(Area::container(".modal"))
//!         .auto_focus(".modal"),
//! );
//!
//! traps.trap_within(&mut doc, "modal")?;
//! // Tab now cycles inside .modal.
//! doc.focus(&last);
//! doc.press_tab();
//! assert_eq!(doc.active_element(), Some(first));
//!
//! traps.release(&mut doc);
//! # Ok(())
//! # }
//! ```

use std::rc::Rc;

use tracing::{debug, debug_span, trace, warn};

use crate::classify::{self, Classification};
use crate::config::{Area, TrapConfig, TrapOptions};
use crate::document::{DocumentView, ElementHandle, KeyDisposition, KeyEvent};
use crate::error::TrapError;
use crate::intercept::{LoopHandler, intercept};
use crate::store::{TrapRuntimeState, TrapStore};

/// What an activation did to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActivationReport {
    /// A previously active trap was released first.
    pub released_previous: bool,
    /// Elements removed from tab order.
    pub excluded: usize,
    /// Elements focus may cycle through at activation time.
    pub looped: usize,
    /// The autofocus target was found and focused.
    pub auto_focused: bool,
}

/// What a release did to the document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReleaseReport {
    /// A trap was active and has been deactivated.
    pub released: bool,
    /// Focus went back to the trigger element.
    pub focus_restored: bool,
    /// Elements whose navigation attribute was restored.
    pub restored: usize,
    /// Keydown listeners removed from the document.
    pub listeners_removed: usize,
}

/// Registry of focus traps with at most one active at a time.
///
/// `E` is the host's element handle type. Document access is passed into
/// each call rather than owned, so one registry can serve whatever document
/// reference the caller holds (including `&mut dyn DocumentView` inside a
/// key listener).
#[derive(Debug)]
pub struct TrapRegistry<E> {
    store: TrapStore<E>,
    options: Rc<TrapOptions>,
}

impl<E: ElementHandle> Default for TrapRegistry<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E: ElementHandle> TrapRegistry<E> {
    /// Create an empty registry with default attribute names.
    pub fn new() -> Self {
        Self::with_options(TrapOptions::default())
    }

    /// Create an empty registry with custom attribute names and focusable
    /// element criteria.
    pub fn with_options(options: TrapOptions) -> Self {
        Self {
            store: TrapStore::new(),
            options: Rc::new(options),
        }
    }

    #[inline]
    pub fn options(&self) -> &TrapOptions {
        &self.options
    }

    // --- Store ---

    /// Register a trap, or replace the config of an existing one.
    ///
    /// Selectors are not validated here; a bad selector surfaces when the
    /// trap is activated. Replacing the active trap's config does not change
    /// the running activation.
    pub fn set_trap(&mut self, config: TrapConfig) {
        trace!(trap = %config.name, areas = config.areas.len(), "set trap");
        self.store.set(config);
    }

    /// Register several traps.
    pub fn set_traps(&mut self, configs: impl IntoIterator<Item = TrapConfig>) {
        for config in configs {
            self.set_trap(config);
        }
    }

    /// Runtime state of a trap.
    ///
    /// # Errors
    ///
    /// [`TrapError::NotFound`] if no trap has this name.
    pub fn get_trap(&self, name: &str) -> Result<&TrapRuntimeState<E>, TrapError> {
        self.store.get(name)
    }

    /// All registered traps, in no particular order.
    pub fn list(&self) -> impl Iterator<Item = &TrapRuntimeState<E>> {
        self.store.iter()
    }

    /// The currently active trap.
    pub fn active_trap(&self) -> Option<&TrapRuntimeState<E>> {
        self.store.active()
    }

    /// Name of the currently active trap.
    pub fn active_name(&self) -> Option<&str> {
        self.store.active().map(TrapRuntimeState::name)
    }

    /// Whether any trap is active.
    #[inline]
    pub fn is_trapped(&self) -> bool {
        self.store.active().is_some()
    }

    // --- Classification ---

    /// Partition of the focusable set by the active trap's areas. Without
    /// an active trap nothing is hidden.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn classification<D>(&self, doc: &D) -> Result<Classification<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        match self.active_areas() {
            Some(areas) => Ok(classify::classify(doc, &self.options, areas)?),
            None => Ok(Classification {
                hide: Vec::new(),
                looped: classify::all_focusable(doc, &self.options)?,
            }),
        }
    }

    /// Focusable elements the active trap excludes.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn elements_to_hide<D>(&self, doc: &D) -> Result<Vec<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        Ok(classify::elements_to_hide(doc, &self.options, self.active_areas())?)
    }

    /// Focusable elements the active trap lets focus reach, in document order.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn elements_to_loop<D>(&self, doc: &D) -> Result<Vec<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        Ok(classify::elements_to_loop(doc, &self.options, self.active_areas())?)
    }

    /// First element of the loop set.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn first_trapped_element<D>(&self, doc: &D) -> Result<Option<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        Ok(self.elements_to_loop(doc)?.into_iter().next())
    }

    /// Last element of the loop set.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn last_trapped_element<D>(&self, doc: &D) -> Result<Option<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        Ok(self.elements_to_loop(doc)?.pop())
    }

    /// Elements currently carrying the restore marker.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn hidden_elements<D>(&self, doc: &D) -> Result<Vec<E>, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        Ok(doc.query_selector_all(&self.options.restore_marker_selector())?)
    }

    // --- Activation ---

    /// Activate the named trap, releasing any other active trap first.
    ///
    /// Excludes every focusable element outside the trap's areas from tab
    /// order, installs the looping keydown listener, and moves focus to the
    /// autofocus target if one is configured and present.
    ///
    /// # Errors
    ///
    /// - [`TrapError::NotFound`] for an unregistered name.
    /// - [`TrapError::Selector`] if the host rejects one of the trap's
    ///   selectors.
    ///
    /// On error the registry and the document are left unchanged.
    pub fn trap_within<D>(
        &mut self,
        doc: &mut D,
        name: &str,
    ) -> Result<ActivationReport, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let _span = debug_span!("trap_within", trap = name).entered();

        let config = self.store.get(name)?.config().clone();
        self.validate(&*doc, &config)?;

        let mut report = ActivationReport::default();
        if self.is_trapped() {
            report.released_previous = self.release(doc).released;
        }

        let trigger = doc.active_element();
        let areas: Rc<[Area]> = config.areas.clone().into();
        {
            let state = self.store.get_mut(name)?;
            state.is_active = true;
            state.trigger_element = trigger;
            state.active_areas = Some(Rc::clone(&areas));
        }

        let classification = match classify::classify(&*doc, &self.options, &config.areas) {
            Ok(c) => c,
            Err(err) => {
                self.release(doc);
                return Err(err.into());
            }
        };
        report.excluded = self.exclude(doc, &classification.hide);
        report.looped = classification.looped.len();

        let handler = LoopHandler::new(name, areas, Rc::clone(&self.options));
        let id = doc.add_key_listener(Rc::new(handler));
        self.store.get_mut(name)?.key_handler = Some(id);
        debug!(%id, "installed loop listener");

        if let Some(selector) = &config.auto_focus {
            match self.auto_focus(doc, selector) {
                Ok(focused) => report.auto_focused = focused,
                Err(err) => {
                    self.release(doc);
                    return Err(err);
                }
            }
        }

        debug!(
            excluded = report.excluded,
            looped = report.looped,
            auto_focused = report.auto_focused,
            "trap active"
        );
        Ok(report)
    }

    /// Deactivate the active trap and undo its document changes.
    ///
    /// Restores focus to the trigger element (if still attached), restores
    /// every marked element's navigation attribute, and removes every
    /// installed loop listener. Cleanup is best-effort: a failing step is
    /// logged and the remaining steps still run.
    ///
    /// A no-op when no trap is active.
    pub fn release<D>(&mut self, doc: &mut D) -> ReleaseReport
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let Some(active) = self.store.active_mut() else {
            return ReleaseReport::default();
        };
        let _span = debug_span!("release", trap = active.name()).entered();

        let mut report = ReleaseReport {
            released: true,
            ..ReleaseReport::default()
        };

        active.is_active = false;
        active.active_areas = None;
        match active.trigger_element.take() {
            Some(trigger) if doc.is_connected(&trigger) => {
                doc.focus(&trigger);
                report.focus_restored = true;
            }
            Some(trigger) => debug!(?trigger, "trigger element detached, focus not restored"),
            None => trace!("no trigger element recorded"),
        }

        report.restored = self.restore(doc);
        self.clear_auto_focus(doc);

        for trap in self.store.iter_mut() {
            if let Some(id) = trap.key_handler.take() {
                if doc.remove_key_listener(id) {
                    report.listeners_removed += 1;
                }
                trace!(trap = trap.name(), %id, "removed loop listener");
            }
        }

        debug!(
            focus_restored = report.focus_restored,
            restored = report.restored,
            listeners_removed = report.listeners_removed,
            "trap released"
        );
        report
    }

    /// Run the active trap's interception logic on an event directly.
    ///
    /// For hosts that route keydown events themselves instead of through
    /// [`DocumentView::add_key_listener`]. Passes through when no trap is
    /// active.
    ///
    /// # Errors
    ///
    /// Propagates a selector error from the host.
    pub fn handle_key<D>(
        &self,
        doc: &mut D,
        event: &mut KeyEvent<E>,
    ) -> Result<KeyDisposition, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        match self.active_areas() {
            Some(areas) => Ok(intercept(doc, &self.options, areas, event)?),
            None => Ok(KeyDisposition::PassThrough),
        }
    }

    // --- Internals ---

    /// Areas of the running activation, if any.
    fn active_areas(&self) -> Option<&[Area]> {
        self.store.active().and_then(TrapRuntimeState::active_areas)
    }

    /// Query every selector the activation will use, before touching
    /// anything.
    fn validate<D>(&self, doc: &D, config: &TrapConfig) -> Result<(), TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        classify::all_focusable(doc, &self.options)?;
        for area in &config.areas {
            if doc.query_selector(&area.selector)?.is_none() {
                debug!(selector = %area.selector, "area selector matches nothing");
            }
        }
        if let Some(selector) = &config.auto_focus {
            doc.query_selector(selector)?;
        }
        Ok(())
    }

    fn exclude<D>(&self, doc: &mut D, elements: &[E]) -> usize
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let nav = self.options.navigation_attribute.as_str();
        for element in elements {
            let previous = self.options.record(doc.attribute(element, nav).as_deref());
            doc.set_attribute(element, &self.options.restore_marker, &previous);
            doc.set_attribute(element, nav, TrapOptions::EXCLUDED);
            trace!(?element, %previous, "excluded from tab order");
        }
        elements.len()
    }

    fn restore<D>(&self, doc: &mut D) -> usize
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let marked = match doc.query_selector_all(&self.options.restore_marker_selector()) {
            Ok(marked) => marked,
            Err(err) => {
                warn!(%err, "cannot query restore markers");
                return 0;
            }
        };

        let nav = self.options.navigation_attribute.as_str();
        for element in &marked {
            let marker = doc.attribute(element, &self.options.restore_marker);
            match marker.as_deref().and_then(|m| self.options.recorded(m)) {
                Some(previous) => doc.set_attribute(element, nav, previous),
                None => doc.remove_attribute(element, nav),
            }
            doc.remove_attribute(element, &self.options.restore_marker);
        }
        marked.len()
    }

    fn auto_focus<D>(&self, doc: &mut D, selector: &str) -> Result<bool, TrapError>
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let Some(target) = doc.query_selector(selector)? else {
            debug!(%selector, "autofocus selector matches nothing");
            return Ok(false);
        };
        let nav = self.options.navigation_attribute.as_str();
        let focusable = doc.matches(&target, &self.options.focusable_selector())?;
        if !focusable && doc.attribute(&target, nav).is_none() {
            // Programmatically focusable only; tagged so release can undo it.
            trace!(?target, "made autofocus target focusable");
            doc.set_attribute(&target, nav, TrapOptions::EXCLUDED);
            doc.set_attribute(&target, &self.options.autofocus_marker, "");
        }
        doc.focus(&target);
        Ok(true)
    }

    fn clear_auto_focus<D>(&self, doc: &mut D)
    where
        D: DocumentView<Element = E> + ?Sized,
    {
        let tagged = match doc.query_selector_all(&self.options.autofocus_marker_selector()) {
            Ok(tagged) => tagged,
            Err(err) => {
                warn!(%err, "cannot query autofocus markers");
                return;
            }
        };
        let nav = self.options.navigation_attribute.as_str();
        for element in &tagged {
            doc.remove_attribute(element, nav);
            doc.remove_attribute(element, &self.options.autofocus_marker);
        }
    }
}

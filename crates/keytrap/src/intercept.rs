#![forbid(unsafe_code)]

//! Key interception: turns Tab navigation into a ring over the loop set.
//!
//! | Focus on | Key | Action |
//! |----------|-----|--------|
//! | first looped element | Shift+Tab | prevent default, focus last |
//! | last looped element | Tab | prevent default, focus first |
//! | anything else | any | pass through |
//!
//! The loop set is recomputed on every event. An empty loop set never
//! intercepts.

use std::rc::Rc;

use tracing::{trace, warn};

use crate::classify::classify;
use crate::config::{Area, TrapOptions};
use crate::document::{DocumentView, ElementHandle, KeyDisposition, KeyEvent, KeyListener};
use crate::error::SelectorError;

/// Apply the focus ring to one keydown.
///
/// # Errors
///
/// Propagates a [`SelectorError`] if the loop set cannot be computed; the
/// event is left untouched in that case.
pub fn intercept<D>(
    doc: &mut D,
    options: &TrapOptions,
    areas: &[Area],
    event: &mut KeyEvent<D::Element>,
) -> Result<KeyDisposition, SelectorError>
where
    D: DocumentView + ?Sized,
{
    let backward = event.is_backward_tab();
    let forward = event.is_forward_tab();
    if !backward && !forward {
        return Ok(KeyDisposition::PassThrough);
    }
    let Some(target) = event.target.clone() else {
        return Ok(KeyDisposition::PassThrough);
    };

    let looped = classify(&*doc, options, areas)?.looped;
    let (Some(first), Some(last)) = (looped.first(), looped.last()) else {
        trace!("loop set empty, not intercepting");
        return Ok(KeyDisposition::PassThrough);
    };

    if backward && target == *first {
        event.prevent_default();
        doc.focus(last);
        return Ok(KeyDisposition::WrappedToLast);
    }
    if forward && target == *last {
        event.prevent_default();
        doc.focus(first);
        return Ok(KeyDisposition::WrappedToFirst);
    }
    Ok(KeyDisposition::PassThrough)
}

/// Keydown listener installed for the duration of one activation.
///
/// Holds a snapshot of the trap's areas taken at activation time.
#[derive(Debug, Clone)]
pub struct LoopHandler {
    trap: String,
    areas: Rc<[Area]>,
    options: Rc<TrapOptions>,
}

impl LoopHandler {
    pub fn new(trap: impl Into<String>, areas: Rc<[Area]>, options: Rc<TrapOptions>) -> Self {
        Self {
            trap: trap.into(),
            areas,
            options,
        }
    }

    /// Name of the trap this handler loops for.
    #[inline]
    pub fn trap(&self) -> &str {
        &self.trap
    }
}

impl<E: ElementHandle> KeyListener<E> for LoopHandler {
    fn on_key_down(&self, doc: &mut dyn DocumentView<Element = E>, event: &mut KeyEvent<E>) {
        match intercept(doc, &self.options, &self.areas, event) {
            Ok(KeyDisposition::PassThrough) => {}
            Ok(disposition) => trace!(trap = %self.trap, ?disposition, "wrapped focus"),
            Err(err) => warn!(trap = %self.trap, %err, "cannot compute loop set"),
        }
    }
}

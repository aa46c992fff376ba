#![forbid(unsafe_code)]

//! Element classifier.
//!
//! Splits the document's keyboard-reachable elements into the ones a trap
//! excludes ("hide") and the ones focus may cycle through ("loop").
//!
//! Everything is recomputed from live document state on every call. Nothing
//! is cached, so buttons added inside a trapped area after activation join
//! the loop on the next keypress.
//!
//! # Invariants
//!
//! 1. `hide ∪ looped` equals the full focusable set and the two are disjoint.
//! 2. Both sequences preserve document order.
//! 3. Elements whose navigation attribute is already `-1` are in neither.

use tracing::trace;

use crate::config::{Area, TrapOptions};
use crate::document::DocumentView;
use crate::error::SelectorError;

/// Result of classifying the focusable set against a trap's areas.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification<E> {
    /// Focusable elements outside every area, in document order.
    pub hide: Vec<E>,
    /// Focusable elements inside some area, in document order.
    pub looped: Vec<E>,
}

impl<E> Default for Classification<E> {
    fn default() -> Self {
        Self {
            hide: Vec::new(),
            looped: Vec::new(),
        }
    }
}

impl<E> Classification<E> {
    /// First element of the loop set.
    #[inline]
    pub fn first(&self) -> Option<&E> {
        self.looped.first()
    }

    /// Last element of the loop set.
    #[inline]
    pub fn last(&self) -> Option<&E> {
        self.looped.last()
    }
}

/// Every element currently reachable by sequential keyboard navigation.
///
/// # Errors
///
/// Propagates a [`SelectorError`] if the host rejects the focusable selector.
pub fn all_focusable<D>(doc: &D, options: &TrapOptions) -> Result<Vec<D::Element>, SelectorError>
where
    D: DocumentView + ?Sized,
{
    doc.query_selector_all(&options.focusable_selector())
}

/// Whether `element` falls inside `area`.
///
/// Container areas match the element or any ancestor; exact areas match the
/// element only.
///
/// # Errors
///
/// Propagates a [`SelectorError`] for an invalid area selector.
pub fn matches_area<D>(doc: &D, element: &D::Element, area: &Area) -> Result<bool, SelectorError>
where
    D: DocumentView + ?Sized,
{
    if area.is_container && doc.closest(element, &area.selector)?.is_some() {
        return Ok(true);
    }
    doc.matches(element, &area.selector)
}

/// Whether `element` falls inside any of `areas`.
///
/// # Errors
///
/// Propagates a [`SelectorError`] for an invalid area selector.
pub fn matches_any<D>(doc: &D, element: &D::Element, areas: &[Area]) -> Result<bool, SelectorError>
where
    D: DocumentView + ?Sized,
{
    for area in areas {
        if matches_area(doc, element, area)? {
            return Ok(true);
        }
    }
    Ok(false)
}

/// Partition the focusable set by `areas`.
///
/// # Errors
///
/// Propagates a [`SelectorError`] for an invalid focusable or area selector.
pub fn classify<D>(
    doc: &D,
    options: &TrapOptions,
    areas: &[Area],
) -> Result<Classification<D::Element>, SelectorError>
where
    D: DocumentView + ?Sized,
{
    let mut out = Classification::default();
    for element in all_focusable(doc, options)? {
        if matches_any(doc, &element, areas)? {
            out.looped.push(element);
        } else {
            out.hide.push(element);
        }
    }
    trace!(
        hide = out.hide.len(),
        looped = out.looped.len(),
        "classified focusable elements"
    );
    Ok(out)
}

/// Focusable elements the trap must exclude. Empty when `areas` is `None`
/// (no active trap).
///
/// # Errors
///
/// Propagates a [`SelectorError`] for an invalid focusable or area selector.
pub fn elements_to_hide<D>(
    doc: &D,
    options: &TrapOptions,
    areas: Option<&[Area]>,
) -> Result<Vec<D::Element>, SelectorError>
where
    D: DocumentView + ?Sized,
{
    match areas {
        Some(areas) => Ok(classify(doc, options, areas)?.hide),
        None => Ok(Vec::new()),
    }
}

/// Focusable elements the trap lets focus cycle through. Without an active
/// trap this is the whole focusable set.
///
/// # Errors
///
/// Propagates a [`SelectorError`] for an invalid focusable or area selector.
pub fn elements_to_loop<D>(
    doc: &D,
    options: &TrapOptions,
    areas: Option<&[Area]>,
) -> Result<Vec<D::Element>, SelectorError>
where
    D: DocumentView + ?Sized,
{
    match areas {
        Some(areas) => Ok(classify(doc, options, areas)?.looped),
        None => all_focusable(doc, options),
    }
}

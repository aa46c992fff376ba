#![forbid(unsafe_code)]

//! Trap store: registered configs plus their runtime state.
//!
//! The store is a plain keyed map. It never touches the document; state
//! transitions (`is_active`, trigger element, listener handle) are made by
//! the registry during activation and release only.
//!
//! # Invariants
//!
//! 1. At most one entry has `is_active == true`.
//! 2. `key_handler` and `active_areas` are `Some` iff `is_active`
//!    (maintained by the registry).
//! 3. Entries are never removed; re-registering replaces the config only.

use std::rc::Rc;

use ahash::AHashMap;

use crate::config::{Area, TrapConfig};
use crate::document::ListenerId;
use crate::error::TrapError;

/// Registered trap plus its mutable runtime state.
#[derive(Debug, Clone)]
pub struct TrapRuntimeState<E> {
    config: TrapConfig,
    pub(crate) is_active: bool,
    pub(crate) trigger_element: Option<E>,
    pub(crate) key_handler: Option<ListenerId>,
    pub(crate) active_areas: Option<Rc<[Area]>>,
}

impl<E> TrapRuntimeState<E> {
    fn new(config: TrapConfig) -> Self {
        Self {
            config,
            is_active: false,
            trigger_element: None,
            key_handler: None,
            active_areas: None,
        }
    }

    #[inline]
    pub fn config(&self) -> &TrapConfig {
        &self.config
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.config.name
    }

    #[inline]
    pub fn is_active(&self) -> bool {
        self.is_active
    }

    /// Element focused when this trap was activated.
    #[inline]
    pub fn trigger_element(&self) -> Option<&E> {
        self.trigger_element.as_ref()
    }

    /// Installed keydown listener, present only while active.
    #[inline]
    pub fn key_handler(&self) -> Option<ListenerId> {
        self.key_handler
    }

    /// Areas in force for the current activation.
    ///
    /// Captured when the trap is activated, so re-registering an active
    /// trap does not change its loop set until the next activation.
    #[inline]
    pub fn active_areas(&self) -> Option<&[Area]> {
        self.active_areas.as_deref()
    }
}

/// Map from trap name to runtime state.
#[derive(Debug, Clone)]
pub struct TrapStore<E> {
    traps: AHashMap<String, TrapRuntimeState<E>>,
}

impl<E> Default for TrapStore<E> {
    fn default() -> Self {
        Self::new()
    }
}

impl<E> TrapStore<E> {
    pub fn new() -> Self {
        Self {
            traps: AHashMap::new(),
        }
    }

    /// Insert a trap, or replace the config of an existing one.
    ///
    /// Runtime state survives replacement, so re-registering the active trap
    /// neither deactivates it nor orphans its listener. The new config takes
    /// effect on the next activation.
    ///
    /// Returns the previous config, if any.
    pub fn set(&mut self, config: TrapConfig) -> Option<TrapConfig> {
        match self.traps.get_mut(&config.name) {
            Some(state) => Some(std::mem::replace(&mut state.config, config)),
            None => {
                self.traps
                    .insert(config.name.clone(), TrapRuntimeState::new(config));
                None
            }
        }
    }

    /// Look up a trap by name.
    ///
    /// # Errors
    ///
    /// [`TrapError::NotFound`] if no trap has this name.
    pub fn get(&self, name: &str) -> Result<&TrapRuntimeState<E>, TrapError> {
        self.traps.get(name).ok_or_else(|| TrapError::not_found(name))
    }

    pub(crate) fn get_mut(&mut self, name: &str) -> Result<&mut TrapRuntimeState<E>, TrapError> {
        self.traps
            .get_mut(name)
            .ok_or_else(|| TrapError::not_found(name))
    }

    /// The single active trap, if any.
    pub fn active(&self) -> Option<&TrapRuntimeState<E>> {
        self.traps.values().find(|t| t.is_active)
    }

    pub(crate) fn active_mut(&mut self) -> Option<&mut TrapRuntimeState<E>> {
        self.traps.values_mut().find(|t| t.is_active)
    }

    /// All registered traps, in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &TrapRuntimeState<E>> {
        self.traps.values()
    }

    pub(crate) fn iter_mut(&mut self) -> impl Iterator<Item = &mut TrapRuntimeState<E>> {
        self.traps.values_mut()
    }

    #[inline]
    pub fn contains(&self, name: &str) -> bool {
        self.traps.contains_key(name)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.traps.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.traps.is_empty()
    }
}

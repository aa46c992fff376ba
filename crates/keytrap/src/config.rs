#![forbid(unsafe_code)]

//! Trap configuration.
//!
//! A [`TrapConfig`] names a trap and lists the [`Area`]s that stay reachable
//! by keyboard while it is active. [`TrapOptions`] holds the registry-wide
//! knobs: which attribute controls tab order, which attributes carry
//! restoration state, and which elements count as focusable.
//!
//! # Example
//!
//! ```
//! use keytrap::{Area, TrapConfig};
//!
//! let cfg = TrapConfig::new("modal")
//!     .area(Area::container(".modal"))
//!     .area(Area::exact("#help-button"))
//!     .auto_focus(".modal");
//!
//! assert_eq!(cfg.name, "modal");
//! assert_eq!(cfg.areas.len(), 2);
//! assert!(cfg.areas[0].is_container);
//! ```
//!
//! # Serialized form
//!
//! With the `serde` feature, configs use camelCase keys and `areas` may be
//! omitted:
//!
//! ```json
//! { "name": "modal", "areas": [{ "selector": ".modal", "isContainer": true }], "autoFocus": ".modal" }
//! ```

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Selectors for elements reachable by sequential keyboard navigation.
pub const DEFAULT_FOCUSABLE_SELECTORS: [&str; 9] = [
    "a[href]",
    "area[href]",
    "input:not([disabled])",
    "select:not([disabled])",
    "textarea:not([disabled])",
    "button:not([disabled])",
    "iframe",
    "[tabindex]",
    "[contenteditable=true]",
];

/// A selector-delimited region exempt from exclusion.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct Area {
    pub selector: String,
    /// Exempt every descendant of a match, not only exact matches.
    #[cfg_attr(feature = "serde", serde(default))]
    pub is_container: bool,
}

impl Area {
    /// Area covering matching elements and all their descendants.
    pub fn container(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            is_container: true,
        }
    }

    /// Area covering only elements that match the selector themselves.
    pub fn exact(selector: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            is_container: false,
        }
    }
}

/// Caller-supplied trap definition. Immutable once registered.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "camelCase"))]
pub struct TrapConfig {
    /// Unique registry key.
    pub name: String,
    #[cfg_attr(feature = "serde", serde(default))]
    pub areas: Vec<Area>,
    /// Element to focus on activation.
    #[cfg_attr(
        feature = "serde",
        serde(default, skip_serializing_if = "Option::is_none")
    )]
    pub auto_focus: Option<String>,
}

impl TrapConfig {
    /// A trap with no areas and no autofocus.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            areas: Vec::new(),
            auto_focus: None,
        }
    }

    /// Append an area.
    #[must_use]
    pub fn area(mut self, area: Area) -> Self {
        self.areas.push(area);
        self
    }

    /// Replace all areas.
    #[must_use]
    pub fn areas(mut self, areas: impl IntoIterator<Item = Area>) -> Self {
        self.areas = areas.into_iter().collect();
        self
    }

    /// Focus the first match of `selector` on activation.
    #[must_use]
    pub fn auto_focus(mut self, selector: impl Into<String>) -> Self {
        self.auto_focus = Some(selector.into());
        self
    }
}

/// Registry-wide attribute names and focusable element criteria.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default, rename_all = "camelCase"))]
pub struct TrapOptions {
    /// Attribute controlling tab order (`tabindex`).
    pub navigation_attribute: String,
    /// Attribute recording an excluded element's prior tab order.
    pub restore_marker: String,
    /// Attribute tagging an autofocus target that was given a tab order.
    pub autofocus_marker: String,
    /// Restore-marker value meaning "attribute was absent".
    ///
    /// Recorded values carry [`TrapOptions::RECORDED_PREFIX`], so the
    /// sentinel never collides with a real value as long as it does not
    /// start with that prefix.
    pub absent_sentinel: String,
    /// Base selectors for keyboard-reachable elements.
    pub focusable_selectors: Vec<String>,
}

impl Default for TrapOptions {
    fn default() -> Self {
        Self {
            navigation_attribute: "tabindex".into(),
            restore_marker: "data-keytrap-tabindex".into(),
            autofocus_marker: "data-keytrap-autofocus".into(),
            absent_sentinel: "?".into(),
            focusable_selectors: DEFAULT_FOCUSABLE_SELECTORS
                .iter()
                .map(|s| (*s).to_owned())
                .collect(),
        }
    }
}

impl TrapOptions {
    /// Value written to the navigation attribute to exclude an element.
    pub const EXCLUDED: &'static str = "-1";

    /// Prefix on a restore-marker value recording a present attribute.
    pub const RECORDED_PREFIX: &'static str = "=";

    /// Restore-marker value for an element whose navigation attribute was
    /// `previous` (`None` when absent).
    #[must_use]
    pub fn record(&self, previous: Option<&str>) -> String {
        match previous {
            Some(value) => format!("{}{value}", Self::RECORDED_PREFIX),
            None => self.absent_sentinel.clone(),
        }
    }

    /// Inverse of [`TrapOptions::record`]: the attribute value to restore,
    /// or `None` to remove the attribute.
    #[must_use]
    pub fn recorded<'a>(&self, marker: &'a str) -> Option<&'a str> {
        if marker == self.absent_sentinel {
            return None;
        }
        marker.strip_prefix(Self::RECORDED_PREFIX)
    }

    /// One selector list matching every focusable element not already
    /// excluded from tab order.
    #[must_use]
    pub fn focusable_selector(&self) -> String {
        let not_excluded = format!(
            ":not([{}=\"{}\"])",
            self.navigation_attribute,
            Self::EXCLUDED
        );
        self.focusable_selectors
            .iter()
            .map(|s| format!("{s}{not_excluded}"))
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Selector for elements carrying the restore marker.
    #[must_use]
    pub fn restore_marker_selector(&self) -> String {
        format!("[{}]", self.restore_marker)
    }

    /// Selector for autofocus targets tagged by the registry.
    #[must_use]
    pub fn autofocus_marker_selector(&self) -> String {
        format!("[{}]", self.autofocus_marker)
    }
}

#[cfg(feature = "config-files")]
#[derive(Deserialize)]
struct TomlTraps {
    #[serde(default)]
    trap: Vec<TrapConfig>,
}

/// Parse a JSON array of trap configs.
///
/// # Errors
///
/// Returns [`ConfigError`](crate::error::ConfigError) on malformed JSON or
/// duplicate names.
#[cfg(feature = "config-files")]
pub fn load_json(src: &str) -> Result<Vec<TrapConfig>, crate::error::ConfigError> {
    let traps: Vec<TrapConfig> = serde_json::from_str(src)?;
    check_unique(traps)
}

/// Parse `[[trap]]` tables from a TOML document.
///
/// ```toml
/// [[trap]]
/// name = "modal"
/// autoFocus = ".modal"
/// areas = [{ selector = ".modal", isContainer = true }]
/// ```
///
/// # Errors
///
/// Returns [`ConfigError`](crate::error::ConfigError) on malformed TOML or
/// duplicate names.
#[cfg(feature = "config-files")]
pub fn load_toml(src: &str) -> Result<Vec<TrapConfig>, crate::error::ConfigError> {
    let doc: TomlTraps = toml::from_str(src)?;
    check_unique(doc.trap)
}

#[cfg(feature = "config-files")]
fn check_unique(traps: Vec<TrapConfig>) -> Result<Vec<TrapConfig>, crate::error::ConfigError> {
    let mut seen = ahash::AHashSet::with_capacity(traps.len());
    for trap in &traps {
        if !seen.insert(trap.name.as_str()) {
            return Err(crate::error::ConfigError::DuplicateName(trap.name.clone()));
        }
    }
    Ok(traps)
}

#![forbid(unsafe_code)]

//! Error types for trap registration and activation.
//!
//! # Failure Modes
//!
//! | Failure | Cause | Behavior |
//! |---------|-------|----------|
//! | Unknown trap | `trap_within` with an unregistered name | `TrapError::NotFound`, no DOM mutation |
//! | Bad selector | Host rejects an area/autofocus selector | `TrapError::Selector`, no DOM mutation |
//! | Selector matches nothing | Content not rendered yet | Step skipped, logged at `debug` |
//! | Detached trigger element | Trigger removed before release | Focus restore skipped, logged at `debug` |

use thiserror::Error;

/// A selector the host document could not parse.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid selector `{selector}`: {reason}")]
pub struct SelectorError {
    pub selector: String,
    pub reason: String,
}

impl SelectorError {
    pub fn new(selector: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            selector: selector.into(),
            reason: reason.into(),
        }
    }
}

/// Errors surfaced by [`TrapRegistry`](crate::TrapRegistry).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrapError {
    /// No trap registered under this name.
    #[error("no trap registered under `{name}`")]
    NotFound { name: String },

    /// An area, autofocus, or focusable selector was rejected by the host.
    #[error(transparent)]
    Selector(#[from] SelectorError),
}

impl TrapError {
    pub(crate) fn not_found(name: &str) -> Self {
        Self::NotFound {
            name: name.to_owned(),
        }
    }
}

/// Errors from parsing trap configuration documents.
#[cfg(feature = "config-files")]
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid JSON trap config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid TOML trap config: {0}")]
    Toml(#[from] toml::de::Error),

    /// Two traps in the same document share a name.
    #[error("duplicate trap name `{0}`")]
    DuplicateName(String),
}

//! Error types for the dissection core

use crate::ber::header::TagClass;
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, DissectError>;

/// Decode failure of a single element.
///
/// Structure decoders contain these per element: a failed child becomes a
/// flagged node in the tree and its siblings keep decoding. Only
/// [`DissectError::RecursionBudgetExceeded`] aborts the whole message.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DissectError {
    #[error("Truncated at offset {offset}: need {needed} bytes, {available} available")]
    Truncated {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("Malformed at offset {offset}: {reason}")]
    Malformed { offset: usize, reason: String },

    #[error("Missing mandatory field {field} in {structure}")]
    MissingMandatoryField {
        structure: &'static str,
        field: &'static str,
    },

    #[error("Empty {0}: at least one element required")]
    EmptySequence(&'static str),

    #[error("No alternative of {choice} matches {class:?} tag {tag}")]
    UnknownChoice {
        choice: &'static str,
        class: TagClass,
        tag: u32,
    },

    #[error("Unexpected {class:?} tag {tag} for {field}")]
    UnknownTag {
        field: &'static str,
        class: TagClass,
        tag: u32,
    },

    #[error("No handler registered for OID {0}")]
    UnresolvedOid(String),

    #[error("Recursion budget of {limit} levels exceeded")]
    RecursionBudgetExceeded { limit: usize },

    #[error("Invalid object identifier: {0}")]
    InvalidOid(String),
}

impl DissectError {
    pub fn malformed(offset: usize, reason: impl Into<String>) -> Self {
        Self::Malformed {
            offset,
            reason: reason.into(),
        }
    }

    /// Errors that must not be contained by an enclosing structure.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RecursionBudgetExceeded { .. })
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Configuration error: {0}")]
    Load(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

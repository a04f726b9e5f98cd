// Author: Dustin Pilgrim
// License: MIT

use thiserror::Error;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, CairnError>;

fn hint_suffix(hint: &Option<String>) -> String {
    hint.as_ref().map_or(String::new(), |h| format!(" Hint: {}", h))
}

/// The main error type for building, merging, resolving and reading configuration trees.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CairnError {
    /// An internal invariant was violated. Never expected in correct use.
    #[error("[CAIRN] Bug or broken invariant: {message}")]
    BugOrBroken { message: String },

    /// A value was queried before the tree containing it was resolved.
    #[error("[CAIRN] {path} has not been resolved: {message}{}", hint_suffix(.hint))]
    NotResolved {
        path: String,
        message: String,
        hint: Option<String>,
    },

    /// A required substitution pointed at a path that does not exist.
    #[error("[CAIRN] Could not resolve substitution to a value: ${{{path}}} ({origin}){}", hint_suffix(.hint))]
    MissingValue {
        path: String,
        origin: String,
        hint: Option<String>,
    },

    /// A substitution was part of a cycle with no escape.
    #[error("[CAIRN] Could not resolve ${{{path}}} ({origin}): part of a cycle of substitutions involving {trace}")]
    CycleDetected {
        path: String,
        origin: String,
        trace: String,
    },

    /// Unexpected failure while converting or loading source data.
    #[error("[CAIRN] {message}{}", hint_suffix(.hint))]
    Generic {
        message: String,
        hint: Option<String>,
    },

    /// A path expression could not be parsed.
    #[error("[CAIRN] Invalid path '{path}': {message}")]
    BadPath { path: String, message: String },

    /// A typed getter was called on a path with no value.
    #[error("[CAIRN] Path '{path}' not found in configuration{}", hint_suffix(.hint))]
    NotFound { path: String, hint: Option<String> },

    /// A typed getter found a value of another type, or a number out of range.
    #[error("[CAIRN] Type Error at '{path}' ({origin}): expected {expected}, got {actual}")]
    WrongType {
        path: String,
        origin: String,
        expected: String,
        actual: String,
    },

    /// A typed getter found an explicit null.
    #[error("[CAIRN] Path '{path}' is set to null, expected {expected}")]
    Null { path: String, expected: String },

    /// A validation helper rejected a value.
    #[error("[CAIRN] Invalid value for '{path}': {message}{}", hint_suffix(.hint))]
    Validation {
        path: String,
        message: String,
        hint: Option<String>,
    },
}

impl CairnError {
    /// Stable numeric code for each error kind.
    pub fn code(&self) -> u32 {
        match self {
            CairnError::BugOrBroken { .. } => 100,
            CairnError::NotResolved { .. } => 101,
            CairnError::MissingValue { .. } => 102,
            CairnError::CycleDetected { .. } => 103,
            CairnError::Generic { .. } => 104,
            CairnError::BadPath { .. } => 105,
            CairnError::NotFound { .. } => 106,
            CairnError::WrongType { .. } => 107,
            CairnError::Null { .. } => 108,
            CairnError::Validation { .. } => 109,
        }
    }

    pub(crate) fn bug(message: impl Into<String>) -> Self {
        CairnError::BugOrBroken {
            message: message.into(),
        }
    }

    pub(crate) fn generic(message: impl Into<String>) -> Self {
        CairnError::Generic {
            message: message.into(),
            hint: None,
        }
    }

    pub(crate) fn not_resolved(path: impl Into<String>) -> Self {
        CairnError::NotResolved {
            path: path.into(),
            message: "the tree still contains substitutions or pending merges".into(),
            hint: Some("Call resolve() on the configuration before reading values".into()),
        }
    }

    /// Replaces the path of a `NotResolved` with a more useful one from further up the call chain.
    pub(crate) fn improve_not_resolved(self, what: &str) -> Self {
        match self {
            CairnError::NotResolved { message, hint, .. } => CairnError::NotResolved {
                path: what.to_string(),
                message,
                hint,
            },
            other => other,
        }
    }

    /// True for the two kinds a substitution failure can surface as.
    pub fn is_unresolved_substitution(&self) -> bool {
        matches!(
            self,
            CairnError::MissingValue { .. } | CairnError::CycleDetected { .. }
        )
    }
}

impl From<serde_json::Error> for CairnError {
    fn from(e: serde_json::Error) -> Self {
        CairnError::Generic {
            message: format!("JSON error: {}", e),
            hint: Some("Check that the source text is valid JSON".into()),
        }
    }
}

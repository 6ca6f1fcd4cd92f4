//! Stage-advance validation errors and shared text normalization.
//!
//! Every intake artifact (documents, persona, task) reports problems through
//! [`ValidationError`]. Each variant names the field or count that is missing
//! so the caller can surface it next to the refused transition.

use lazy_static::lazy_static;
use regex::Regex;
use thiserror::Error;

lazy_static! {
    /// Runs of any whitespace, collapsed to a single space on input.
    static ref WHITESPACE_RUN: Regex = Regex::new(r"\s+").unwrap();
}

/// Errors raised when an intake artifact does not satisfy its preconditions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("At least {required} documents are required, found {actual}")]
    TooFewDocuments { required: usize, actual: usize },

    #[error("Duplicate document id: {0}")]
    DuplicateDocumentId(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("{0} must contain at least one entry")]
    EmptyTagSet(&'static str),

    #[error("{field} entries must not be empty")]
    EmptyTag { field: &'static str },

    #[error("Duplicate {field} entry: {tag}")]
    DuplicateTag { field: &'static str, tag: String },

    #[error("Unknown priority: {0} (expected low, medium, high or urgent)")]
    UnknownPriority(String),

    #[error(
        "Unknown timeline: {0} (expected within-hour, within-day, within-week, within-month or flexible)"
    )]
    UnknownTimeline(String),
}

/// Trim and collapse internal whitespace.
///
/// `"  Machine \t Learning "` becomes `"Machine Learning"`.
pub fn normalize_text(raw: &str) -> String {
    WHITESPACE_RUN.replace_all(raw.trim(), " ").into_owned()
}

/// Require that a free-text field is non-empty after trimming.
pub(crate) fn require_text(value: &str, field: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::MissingField(field))
    } else {
        Ok(())
    }
}

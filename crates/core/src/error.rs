//! Error types for the beads data model.
//!
//! Each crate in the workspace defines its own error enum scoped to the
//! failures it can produce; higher layers wrap lower ones with `#[from]`
//! rather than re-declaring variants (`beads_storage::Error` wraps this
//! one, `beads_engine::Error` wraps both).

use thiserror::Error;

/// Result alias for `beads-core` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Names the specific invariant broken by a `ValidationError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// `title` was empty.
    TitleEmpty,
    /// `title` exceeded 500 characters.
    TitleTooLong,
    /// `priority.value` was outside `[0, 4]`.
    InvalidPriority,
    /// `status` string did not parse into a known or custom status.
    InvalidStatus,
    /// A dependency referenced the issue itself.
    SelfDependency,
    /// A hierarchical id exceeded the maximum nesting depth of 3.
    MaxHierarchyDepthExceeded,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            ValidationKind::TitleEmpty => "title must not be empty",
            ValidationKind::TitleTooLong => "title exceeds 500 characters",
            ValidationKind::InvalidPriority => "priority must be in 0..=4",
            ValidationKind::InvalidStatus => "status is not a recognised value",
            ValidationKind::SelfDependency => "an issue cannot depend on itself",
            ValidationKind::MaxHierarchyDepthExceeded => "hierarchical id exceeds maximum depth of 3",
        };
        f.write_str(s)
    }
}

/// Errors produced by the data model (validation, parsing, identity).
#[derive(Debug, Error)]
pub enum Error {
    /// A structural invariant on an [`Issue`](crate::Issue) was violated.
    #[error("validation error: {0}")]
    Validation(ValidationKind),

    /// An id string did not match the `{prefix}-{hash}[.{n}]*` grammar.
    #[error("invalid id: {0:?}")]
    InvalidId(String),

    /// A timestamp string could not be parsed as RFC3339 (optionally with
    /// a `±HH:MM` offset).
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// The identity generator exhausted its retry budget for the current
    /// adaptive length without finding a free id.
    #[error("id generation exhausted {attempts} retries at length {length}")]
    IdGenerationExhausted {
        /// Number of retries attempted before giving up.
        attempts: u8,
        /// Adaptive id length in effect when retries were exhausted.
        length: usize,
    },
}

impl Error {
    /// Shorthand for constructing a [`Error::Validation`] value.
    pub fn validation(kind: ValidationKind) -> Self {
        Error::Validation(kind)
    }
}

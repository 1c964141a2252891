//! Error types for the in-memory store, dependency graph, and command
//! context.

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for `beads-engine` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Names the specific invariant broken by a `ValidationError`, mirroring
/// [`beads_core::ValidationKind`] plus the engine-level invariants that
/// only make sense once issues are indexed against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationKind {
    /// Wraps a [`beads_core::ValidationKind`] surfaced while validating
    /// an issue's own fields.
    Core(beads_core::ValidationKind),
    /// A dependency referenced an issue id not present in the store.
    DanglingReference,
}

impl std::fmt::Display for ValidationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ValidationKind::Core(k) => write!(f, "{k}"),
            ValidationKind::DanglingReference => {
                write!(f, "dependency references an issue not present in the store")
            }
        }
    }
}

/// Errors produced by the in-memory store, dependency graph, and command
/// context.
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps a data-model error.
    #[error(transparent)]
    Core(#[from] beads_core::Error),

    /// Wraps a storage-layer error (WAL, snapshot, lock, compaction).
    #[error(transparent)]
    Storage(#[from] beads_storage::Error),

    /// No issue with the given id exists. Carries the nearest-by-edit-
    /// distance suggestion among existing ids, if any.
    #[error("issue not found: {id:?}{}", suggestion.as_deref().map(|s| format!(" (did you mean {s:?}?)")).unwrap_or_default())]
    NotFound {
        /// The id that was looked up.
        id: String,
        /// Nearest existing id by Levenshtein distance, if the store is
        /// non-empty.
        suggestion: Option<String>,
    },

    /// `insert` was called with an id already present in the store.
    #[error("duplicate issue id: {0:?}")]
    DuplicateId(String),

    /// A structural or referential invariant was violated.
    #[error("validation error: {0}")]
    Validation(ValidationKind),

    /// `add_dependency` would introduce a cycle in the `blocks`/
    /// `parent_child` subgraph.
    #[error("adding a {dep_type:?} dependency from {from:?} to {to:?} would create a cycle")]
    CycleDetected {
        /// The dependent issue.
        from: String,
        /// The issue that would be depended upon.
        to: String,
        /// The dependency type requested.
        dep_type: beads_core::DependencyType,
    },

    /// Import input contained unresolved merge-conflict markers.
    #[error("merge conflict markers found in import input at {path}")]
    MergeConflictDetected {
        /// Source path of the offending import input.
        path: PathBuf,
    },

    /// Import would replace a non-empty snapshot with empty input, and
    /// the caller did not pass the force flag.
    #[error("refusing to overwrite {existing_count} existing issues with an empty import; pass force to proceed")]
    WouldOverwriteData {
        /// Number of issues currently in the store.
        existing_count: usize,
    },
}

impl Error {
    /// Shorthand for constructing an [`Error::Validation`] from a core
    /// [`beads_core::ValidationKind`].
    pub fn core_validation(kind: beads_core::ValidationKind) -> Self {
        Error::Validation(ValidationKind::Core(kind))
    }
}

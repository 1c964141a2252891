//! Facade error type: a thin wrapper over [`beads_engine::Error`].

use thiserror::Error;

/// Result alias for `beads` facade operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the [`crate::Repository`] facade.
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps every error the store, dependency graph, import, and
    /// command context can produce.
    #[error(transparent)]
    Engine(#[from] beads_engine::Error),
}

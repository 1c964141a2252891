//! Error types for the beads storage layer (WAL, snapshot, lock, compactor).

use std::path::PathBuf;
use thiserror::Error;

/// Result alias for `beads-storage` operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors produced by the storage layer.
#[derive(Debug, Error)]
pub enum Error {
    /// Wraps a data-model error surfaced while decoding a snapshot line or
    /// WAL payload.
    #[error(transparent)]
    Core(#[from] beads_core::Error),

    /// A snapshot line or WAL payload failed to parse as JSON.
    #[error("malformed record at {path}:{line_no}: {source}")]
    MalformedRecord {
        /// File containing the bad record.
        path: PathBuf,
        /// 1-based line number.
        line_no: usize,
        /// Underlying parse error.
        #[source]
        source: serde_json::Error,
    },

    /// A WAL frame's magic bytes, length, or CRC did not validate. Carries
    /// enough context for the caller to decide whether to treat it as a
    /// torn tail (last frame) or a hard corruption (interior frame).
    #[error("corrupt WAL frame in {path} at byte offset {offset}: {reason}")]
    CorruptFrame {
        /// WAL file containing the bad frame.
        path: PathBuf,
        /// Byte offset of the frame header.
        offset: u64,
        /// What check failed.
        reason: &'static str,
    },

    /// The snapshot file exists but could not be read as valid UTF-8 /
    /// line-delimited JSON at all (as opposed to a single malformed line).
    #[error("corrupt snapshot at {path}: {reason}")]
    CorruptSnapshot {
        /// Snapshot path.
        path: PathBuf,
        /// What check failed.
        reason: String,
    },

    /// The generation file changed between the start and end of a replay;
    /// the caller must restart the load.
    #[error("generation changed from {expected} to {observed} during replay")]
    GenerationMismatch {
        /// Generation read at the start of the load.
        expected: u64,
        /// Generation observed at the post-replay check.
        observed: u64,
    },

    /// The lock is held by another process or thread.
    #[error("lock busy: {path}")]
    LockBusy {
        /// Lock file path.
        path: PathBuf,
    },

    /// `acquire_timeout` elapsed before the lock became available.
    #[error("timed out after {waited_ms}ms acquiring lock {path}")]
    LockTimeout {
        /// Lock file path.
        path: PathBuf,
        /// How long was actually waited.
        waited_ms: u64,
    },

    /// The atomic write-fsync-rename sequence failed before the rename
    /// completed; the original file, if any, is untouched.
    #[error("atomic rename of {temp} to {dest} failed: {source}")]
    AtomicRenameFailed {
        /// Temporary file path.
        temp: PathBuf,
        /// Final destination path.
        dest: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },

    /// Any other I/O failure (open, read, write, create_dir_all, ...).
    #[error("I/O error at {path}: {source}")]
    Io {
        /// Path the failing operation targeted.
        path: PathBuf,
        /// Underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl Error {
    /// Attach a path to a raw [`std::io::Error`].
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

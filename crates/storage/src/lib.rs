//! Write-ahead log, snapshot codec, exclusive file lock, and compactor
//! backing a beads repository's on-disk state.
//!
//! Layering: [`lock`] mediates concurrent writers; [`wal`] and
//! [`snapshot`] are the two on-disk formats; [`paths`] resolves where
//! they live; [`compactor`] merges them under lock and rotates
//! generations; [`retention`] decides which backups survive a
//! compaction; [`generation`] is the small counter file tying a WAL
//! file to the snapshot it extends.

#![warn(missing_docs)]

pub mod compactor;
pub mod error;
pub mod fsutil;
pub mod generation;
pub mod lock;
pub mod paths;
pub mod retention;
pub mod snapshot;
pub mod testing;
pub mod wal;

pub use compactor::{compact, CompactionReport};
pub use error::{Error, Result};
pub use lock::{ExclusiveLock, LockGuard, TryAcquireOutcome, TryAcquireOutcomeGuard};
pub use paths::RepositoryPaths;
pub use retention::RetentionPolicy;
pub use wal::{WalOp, WalReplay, WalRecord, WalWriter, WAL_MAGIC};

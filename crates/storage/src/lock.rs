//! Cross-platform exclusive advisory file lock.
//!
//! One capability behind a small trait-free struct rather than a
//! `cfg(unix)`/`cfg(windows)` split; `fs2` supplies the underlying
//! `flock`/`LockFileEx` primitive.

use crate::error::{Error, Result};
use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Polling interval used by [`ExclusiveLock::acquire_timeout`].
const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Outcome of a non-blocking lock attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TryAcquireOutcome {
    /// The lock was acquired.
    Held,
    /// The lock is held elsewhere.
    Busy,
}

/// A single exclusive lock file mediating all writers and the compactor.
#[derive(Debug)]
pub struct ExclusiveLock {
    path: PathBuf,
    file: File,
}

impl ExclusiveLock {
    /// Open (creating if necessary) the lock file at `path` without
    /// acquiring it.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&path)
            .map_err(|e| Error::io(path.clone(), e))?;
        Ok(ExclusiveLock { path, file })
    }

    /// Block until the exclusive lock is held, then return a guard that
    /// releases it on drop.
    pub fn acquire(&self) -> Result<LockGuard<'_>> {
        self.file
            .lock_exclusive()
            .map_err(|e| Error::io(self.path.clone(), e))?;
        Ok(LockGuard { lock: self })
    }

    /// Attempt to acquire without blocking.
    pub fn try_acquire(&self) -> Result<TryAcquireOutcomeGuard<'_>> {
        match self.file.try_lock_exclusive() {
            Ok(()) => Ok(TryAcquireOutcomeGuard::Held(LockGuard { lock: self })),
            Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                Ok(TryAcquireOutcomeGuard::Busy)
            }
            Err(e) => Err(Error::io(self.path.clone(), e)),
        }
    }

    /// Poll at [`POLL_INTERVAL`] until the lock is acquired or `timeout`
    /// elapses.
    pub fn acquire_timeout(&self, timeout: Duration) -> Result<LockGuard<'_>> {
        let start = Instant::now();
        loop {
            match self.try_acquire()? {
                TryAcquireOutcomeGuard::Held(guard) => return Ok(guard),
                TryAcquireOutcomeGuard::Busy => {
                    if start.elapsed() >= timeout {
                        return Err(Error::LockTimeout {
                            path: self.path.clone(),
                            waited_ms: start.elapsed().as_millis() as u64,
                        });
                    }
                    std::thread::sleep(POLL_INTERVAL.min(timeout));
                }
            }
        }
    }

    /// The lock file's path.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Result of [`ExclusiveLock::try_acquire`]: either a held guard or a
/// busy signal, never an error for the expected-contention case.
pub enum TryAcquireOutcomeGuard<'a> {
    /// Lock acquired.
    Held(LockGuard<'a>),
    /// Lock held elsewhere.
    Busy,
}

impl TryAcquireOutcomeGuard<'_> {
    /// Collapse to the simple two-state outcome, discarding the guard.
    pub fn outcome(&self) -> TryAcquireOutcome {
        match self {
            TryAcquireOutcomeGuard::Held(_) => TryAcquireOutcome::Held,
            TryAcquireOutcomeGuard::Busy => TryAcquireOutcome::Busy,
        }
    }
}

/// RAII guard releasing the exclusive lock on drop, including on panic
/// unwind — the only supported way to hold this lock.
#[derive(Debug)]
pub struct LockGuard<'a> {
    lock: &'a ExclusiveLock,
}

impl Drop for LockGuard<'_> {
    fn drop(&mut self) {
        let _ = fs2::FileExt::unlock(&self.lock.file);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn acquire_and_release_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let lock = ExclusiveLock::open(dir.path().join("beads.lock")).unwrap();
        {
            let _guard = lock.acquire().unwrap();
        }
        // Released on drop; a second acquire must succeed immediately.
        let _guard2 = lock.acquire().unwrap();
    }

    #[test]
    fn try_acquire_reports_busy_from_second_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.lock");
        let lock_a = ExclusiveLock::open(&path).unwrap();
        let lock_b = ExclusiveLock::open(&path).unwrap();

        let _guard = lock_a.acquire().unwrap();
        let outcome = lock_b.try_acquire().unwrap();
        assert_eq!(outcome.outcome(), TryAcquireOutcome::Busy);
    }

    #[test]
    fn acquire_timeout_reports_timeout_when_busy() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.lock");
        let lock_a = ExclusiveLock::open(&path).unwrap();
        let lock_b = ExclusiveLock::open(&path).unwrap();

        let _guard = lock_a.acquire().unwrap();
        let err = lock_b
            .acquire_timeout(Duration::from_millis(30))
            .unwrap_err();
        assert!(matches!(err, Error::LockTimeout { .. }));
    }
}

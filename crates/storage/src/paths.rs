//! Data-directory layout and idempotent bootstrap.
//!
//! A thin value type over a root directory, computing the fixed set of
//! file names the rest of the crate reads and writes. A beads repository
//! has no single "database file" — snapshot, WAL, generation counter,
//! and lock each live at a fixed name directly under the data directory.

use crate::error::{Error, Result};
use std::path::{Path, PathBuf};

const SNAPSHOT_FILE: &str = "beads.jsonl";
const LOCK_FILE: &str = "beads.lock";
const GENERATION_FILE: &str = "generation";
const BACKUPS_DIR: &str = "backups";

/// Resolved paths to every file beads reads or writes in a data directory.
///
/// Construction never creates the snapshot or WAL files themselves — only
/// the directory tree. Snapshot and WAL files are created lazily by the
/// first write; reading an absent one yields an empty sequence.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepositoryPaths {
    root: PathBuf,
}

impl RepositoryPaths {
    /// Idempotently create the data directory (and `backups/` beneath it)
    /// if missing, and return the resolved path set.
    pub fn open_or_create(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let root = data_dir.into();
        std::fs::create_dir_all(&root).map_err(|e| Error::io(root.clone(), e))?;
        let backups = root.join(BACKUPS_DIR);
        std::fs::create_dir_all(&backups).map_err(|e| Error::io(backups, e))?;
        Ok(RepositoryPaths { root })
    }

    /// The data directory root.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path to the current snapshot file (may not exist yet).
    pub fn snapshot(&self) -> PathBuf {
        self.root.join(SNAPSHOT_FILE)
    }

    /// Path to the WAL file for a given generation.
    pub fn wal(&self, generation: u64) -> PathBuf {
        self.root.join(format!("beads.wal.{generation}"))
    }

    /// Path to the generation counter file.
    pub fn generation_file(&self) -> PathBuf {
        self.root.join(GENERATION_FILE)
    }

    /// Path to the exclusive lock file.
    pub fn lock_file(&self) -> PathBuf {
        self.root.join(LOCK_FILE)
    }

    /// Directory holding timestamped backups of prior snapshots/WALs.
    pub fn backups_dir(&self) -> PathBuf {
        self.root.join(BACKUPS_DIR)
    }

    /// A fresh timestamped backup directory for the given wall-clock
    /// millisecond timestamp.
    pub fn backup_dir(&self, wall_millis: u128) -> PathBuf {
        self.backups_dir().join(wall_millis.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn creates_directory_tree_idempotently() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("repo");
        let paths = RepositoryPaths::open_or_create(&root).unwrap();
        assert!(paths.root().is_dir());
        assert!(paths.backups_dir().is_dir());
        assert!(!paths.snapshot().exists());

        // Second call must not fail or wipe anything.
        std::fs::write(paths.snapshot(), "data").unwrap();
        RepositoryPaths::open_or_create(&root).unwrap();
        assert!(paths.snapshot().exists());
    }

    #[test]
    fn wal_path_includes_generation() {
        let dir = tempfile::tempdir().unwrap();
        let paths = RepositoryPaths::open_or_create(dir.path()).unwrap();
        assert_eq!(
            paths.wal(3).file_name().unwrap().to_str().unwrap(),
            "beads.wal.3"
        );
    }
}

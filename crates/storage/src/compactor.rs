//! Merges the current snapshot and WAL generation under the exclusive
//! lock, then atomically rotates to a fresh generation.
//!
//! Compaction itself never replays WAL records into issue state — that
//! merge semantics belongs to the in-memory store above this crate. The
//! compactor's job is purely the file-level choreography: back up the
//! outgoing snapshot and WAL, write the new snapshot, bump the
//! generation file, and start a new empty WAL, all under lock so no
//! reader observes a half-rotated state.

use crate::error::{Error, Result};
use crate::fsutil::wall_millis;
use crate::generation;
use crate::lock::ExclusiveLock;
use crate::paths::RepositoryPaths;
use crate::retention::RetentionPolicy;
use crate::{snapshot, wal};
use beads_core::Issue;
use std::path::PathBuf;

/// Outcome of a successful compaction.
#[derive(Debug, Clone)]
pub struct CompactionReport {
    /// The generation now current after rotation.
    pub new_generation: u64,
    /// Number of issues written to the new snapshot.
    pub issue_count: usize,
    /// Backup directory holding the retired snapshot/WAL, if anything
    /// existed to back up.
    pub backup_dir: Option<PathBuf>,
    /// Backup directories removed by the retention policy this round.
    pub pruned_backups: Vec<PathBuf>,
}

/// Compact `merged_issues` (the caller's already-replayed view of
/// snapshot + current-generation WAL) into a new snapshot, rotating the
/// WAL generation atomically. Acquires `lock` for the duration of the
/// rotation.
pub fn compact(
    paths: &RepositoryPaths,
    lock: &ExclusiveLock,
    merged_issues: &[Issue],
    retention: &RetentionPolicy,
) -> Result<CompactionReport> {
    let _guard = lock.acquire()?;

    let current_generation = generation::read(&paths.generation_file())?;
    let new_generation = current_generation + 1;

    let snapshot_path = paths.snapshot();
    let old_wal_path = paths.wal(current_generation);
    let backup_dir = if snapshot_path.exists() || old_wal_path.exists() {
        let dir = paths.backup_dir(wall_millis());
        std::fs::create_dir_all(&dir).map_err(|e| Error::io(dir.clone(), e))?;
        if snapshot_path.exists() {
            std::fs::copy(&snapshot_path, dir.join("beads.jsonl"))
                .map_err(|e| Error::io(dir.clone(), e))?;
        }
        if old_wal_path.exists() {
            std::fs::copy(&old_wal_path, dir.join(format!("beads.wal.{current_generation}")))
                .map_err(|e| Error::io(dir.clone(), e))?;
        }
        Some(dir)
    } else {
        None
    };

    snapshot::write_all(&snapshot_path, merged_issues)?;
    generation::write(&paths.generation_file(), new_generation)?;

    // Bring the new generation's WAL into existence (empty) so replay
    // callers never have to special-case "no WAL file at all" for the
    // generation they were just told is current.
    wal::WalWriter::open(paths.wal(new_generation))?;

    if old_wal_path.exists() {
        std::fs::remove_file(&old_wal_path)
            .map_err(|e| Error::io(old_wal_path.clone(), e))?;
    }

    let pruned_backups = prune_backups(paths, retention)?;

    Ok(CompactionReport {
        new_generation,
        issue_count: merged_issues.len(),
        backup_dir,
        pruned_backups,
    })
}

fn prune_backups(paths: &RepositoryPaths, retention: &RetentionPolicy) -> Result<Vec<PathBuf>> {
    let backups_dir = paths.backups_dir();
    let mut timestamps = Vec::new();
    if backups_dir.is_dir() {
        for entry in
            std::fs::read_dir(&backups_dir).map_err(|e| Error::io(backups_dir.clone(), e))?
        {
            let entry = entry.map_err(|e| Error::io(backups_dir.clone(), e))?;
            if let Some(ts) = entry
                .file_name()
                .to_str()
                .and_then(|s| s.parse::<u128>().ok())
            {
                timestamps.push(ts);
            }
        }
    }

    let to_remove = retention.prune(timestamps, wall_millis());
    let mut removed_dirs = Vec::new();
    for ts in to_remove {
        let dir = backups_dir.join(ts.to_string());
        if dir.is_dir() {
            std::fs::remove_dir_all(&dir).map_err(|e| Error::io(dir.clone(), e))?;
            removed_dirs.push(dir);
        }
    }
    Ok(removed_dirs)
}

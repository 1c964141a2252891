//! Small filesystem helpers shared by the WAL, snapshot, and generation
//! writers: parent-directory fsync and temp-file naming for the
//! write-fsync-rename pattern.

use crate::error::{Error, Result};
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

/// fsync the parent directory of `path` so a preceding rename survives a
/// crash. A no-op for relative paths with no parent component.
pub fn fsync_parent_dir(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if parent.as_os_str().is_empty() {
            return Ok(());
        }
        let dir = File::open(parent).map_err(|e| Error::io(parent.to_path_buf(), e))?;
        dir.sync_all().map_err(|e| Error::io(parent.to_path_buf(), e))?;
    }
    Ok(())
}

/// Current wall-clock time in milliseconds since the epoch, used as the
/// timestamp component of a temp-file name.
pub fn wall_millis() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system clock is before the epoch")
        .as_millis()
}

/// Build the temp-file path used while atomically replacing `path`:
/// `{path}.tmp.{wall_millis}.{pid}`. The pid suffix prevents same-
/// millisecond collisions between concurrent writers.
pub fn temp_path_for(path: &Path) -> PathBuf {
    let file_name = path.file_name().expect("path has a file name");
    let mut name = file_name.to_os_string();
    name.push(format!(".tmp.{}.{}", wall_millis(), std::process::id()));
    path.with_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn temp_path_includes_pid_and_base_name() {
        let path = Path::new("/data/beads.jsonl");
        let temp = temp_path_for(path);
        let name = temp.file_name().unwrap().to_str().unwrap();
        assert!(name.starts_with("beads.jsonl.tmp."));
        assert!(name.ends_with(&format!(".{}", std::process::id())));
    }
}

//! The generation counter: a single small text file recording which WAL
//! file is current. Read before every WAL open; written atomically by
//! the compactor at the end of each rotation.

use crate::error::{Error, Result};
use crate::fsutil::{fsync_parent_dir, temp_path_for};
use std::io::Write;
use std::path::Path;

/// Read the current generation number. A repository that has never been
/// compacted has no generation file yet; that is generation `1`, the
/// first WAL a fresh repository writes to.
pub fn read(path: &Path) -> Result<u64> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(1),
        Err(e) => return Err(Error::io(path.to_path_buf(), e)),
    };
    content.trim().parse::<u64>().map_err(|_| Error::CorruptSnapshot {
        path: path.to_path_buf(),
        reason: format!("generation file does not contain a valid integer: {content:?}"),
    })
}

/// Atomically write `generation` to `path` via write-fsync-rename,
/// fsyncing the parent directory afterwards.
pub fn write(path: &Path, generation: u64) -> Result<()> {
    let temp_path = temp_path_for(path);
    let write_result = (|| -> Result<()> {
        let mut file =
            std::fs::File::create(&temp_path).map_err(|e| Error::io(temp_path.clone(), e))?;
        file.write_all(generation.to_string().as_bytes())
            .map_err(|e| Error::io(temp_path.clone(), e))?;
        file.sync_all().map_err(|e| Error::io(temp_path.clone(), e))
    })();

    if let Err(err) = write_result {
        let _ = std::fs::remove_file(&temp_path);
        return Err(err);
    }

    std::fs::rename(&temp_path, path).map_err(|source| {
        let _ = std::fs::remove_file(&temp_path);
        Error::AtomicRenameFailed {
            temp: temp_path.clone(),
            dest: path.to_path_buf(),
            source,
        }
    })?;

    fsync_parent_dir(path)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_reads_as_generation_one() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generation");
        assert_eq!(read(&path).unwrap(), 1);
    }

    #[test]
    fn write_then_read_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generation");
        write(&path, 7).unwrap();
        assert_eq!(read(&path).unwrap(), 7);
    }

    #[test]
    fn garbage_contents_reported_as_corrupt() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("generation");
        std::fs::write(&path, "not-a-number").unwrap();
        assert!(matches!(read(&path), Err(Error::CorruptSnapshot { .. })));
    }
}

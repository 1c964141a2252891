//! Line-delimited JSON snapshot codec with atomic replacement.

use crate::error::{Error, Result};
use crate::fsutil::{fsync_parent_dir, temp_path_for};
use beads_core::Issue;
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// Read every issue from `path`, one JSON object per line. Returns an
/// empty vector if the file does not exist yet — a fresh repository has
/// no snapshot. Malformed lines are logged and skipped rather than
/// aborting the read.
pub fn read_all(path: &Path) -> Result<Vec<Issue>> {
    let content = match std::fs::read_to_string(path) {
        Ok(c) => c,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(Error::io(path.to_path_buf(), e)),
    };

    let mut issues = Vec::new();
    for (idx, line) in content.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<Issue>(line) {
            Ok(issue) => issues.push(issue),
            Err(source) => {
                tracing::warn!(
                    path = %path.display(),
                    line_no = idx + 1,
                    %source,
                    "skipping malformed snapshot line",
                );
            }
        }
    }
    Ok(issues)
}

/// Atomically replace `path` with `issues`, sorted by id ascending.
///
/// Writes to a sibling temp file, fsyncs it, renames over `path`, then
/// fsyncs the parent directory. On any failure before the rename, the
/// temp file is removed and `path` is left untouched.
pub fn write_all(path: &Path, issues: &[Issue]) -> Result<()> {
    let temp_path = temp_path_for(path);

    let mut sorted: Vec<&Issue> = issues.iter().collect();
    sorted.sort_by(|a, b| a.id.cmp(&b.id));

    let result = (|| -> Result<()> {
        let mut file = File::create(&temp_path).map_err(|e| Error::io(temp_path.clone(), e))?;
        for (i, issue) in sorted.iter().enumerate() {
            if i > 0 {
                file.write_all(b"\n").map_err(|e| Error::io(temp_path.clone(), e))?;
            }
            let line = serde_json::to_string(issue).expect("Issue always serialises");
            file.write_all(line.as_bytes())
                .map_err(|e| Error::io(temp_path.clone(), e))?;
        }
        file.sync_all().map_err(|e| Error::io(temp_path.clone(), e))?;
        Ok(())
    })();

    if let Err(err) = result {
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

/// Append a single issue as a new line to an existing snapshot file
/// without the atomic replace. Not used by normal writes — only by
/// tests that need to construct a snapshot incrementally.
#[cfg(test)]
pub(crate) fn append(path: &Path, issue: &Issue) -> Result<()> {
    use std::io::Write as _;
    let mut file = std::fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|e| Error::io(path.to_path_buf(), e))?;
    if std::fs::metadata(path).map(|m| m.len()).unwrap_or(0) > 0 {
        file.write_all(b"\n").map_err(|e| Error::io(path.to_path_buf(), e))?;
    }
    let line = serde_json::to_string(issue).expect("Issue always serialises");
    file.write_all(line.as_bytes())
        .map_err(|e| Error::io(path.to_path_buf(), e))
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::{IssueType, Priority, Status};

    fn sample(id: &str) -> Issue {
        Issue {
            id: id.to_owned(),
            title: "Title".into(),
            description: None,
            design: None,
            acceptance_criteria: None,
            notes: None,
            issue_type: IssueType::Task,
            status: Status::Open,
            priority: Priority::default(),
            assignee: None,
            owner: None,
            created_by: None,
            labels: vec![],
            dependencies: vec![],
            comments: vec![],
            created_at: 1,
            updated_at: 1,
            closed_at: None,
            close_reason: None,
            due_at: None,
            defer_until: None,
            estimated_minutes: None,
            pinned: false,
            is_template: false,
            external_ref: None,
            source_system: None,
            content_hash: None,
            deleted: false,
            extra: serde_json::Map::new(),
        }
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.jsonl");
        assert!(read_all(&path).unwrap().is_empty());
    }

    #[test]
    fn write_then_read_round_trips_sorted_by_id() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.jsonl");
        write_all(&path, &[sample("bd-002"), sample("bd-001")]).unwrap();

        let content = std::fs::read_to_string(&path).unwrap();
        assert!(!content.ends_with('\n'));

        let issues = read_all(&path).unwrap();
        assert_eq!(issues.len(), 2);
        assert_eq!(issues[0].id, "bd-001");
        assert_eq!(issues[1].id, "bd-002");
    }

    #[test]
    fn write_leaves_no_temp_file_behind() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.jsonl");
        write_all(&path, &[sample("bd-001")]).unwrap();

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name().to_string_lossy().contains(".tmp."))
            .collect();
        assert!(leftovers.is_empty());
    }

    #[test]
    fn malformed_line_is_skipped_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.jsonl");
        std::fs::write(&path, "not json\n{\"id\":\"bd-001\",\"title\":\"Title\",\"issue_type\":\"task\",\"status\":\"open\",\"priority\":2,\"created_at\":1,\"updated_at\":1}").unwrap();

        let issues = read_all(&path).unwrap();
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].id, "bd-001");
    }

    #[test]
    fn append_helper_grows_file_incrementally() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("beads.jsonl");
        append(&path, &sample("bd-001")).unwrap();
        append(&path, &sample("bd-002")).unwrap();

        let issues = read_all(&path).unwrap();
        assert_eq!(issues.len(), 2);
    }
}

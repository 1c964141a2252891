//! Four-phase collision detection for importing an externally produced
//! issue set into a loaded [`CommandContext`].
//!
//! Each candidate is matched against the current store in order —
//! `external_ref`+`source_system`, then `content_hash`, then a literal
//! `id` collision — and the first match wins; no match means the
//! candidate is a new issue. A matched pair is merged last-writer-wins
//! by `updated_at`: the newer side's fields replace the older, under
//! the existing issue's id.

use crate::context::CommandContext;
use crate::error::{Error, Result};
use crate::store::IssueStore;
use beads_core::Issue;
use std::path::Path;

const CONFLICT_MARKERS: [&str; 3] = ["<<<<<<<", "=======", ">>>>>>>"];

/// Counts of what an [`import`] call did, for caller reporting.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ImportOutcome {
    /// Candidates with no match, inserted as new issues.
    pub inserted: usize,
    /// Candidates matched to an existing issue and newer, replacing it.
    pub merged: usize,
    /// Candidates matched to an existing issue but not newer, left as is.
    pub unchanged: usize,
}

/// Parse `raw_input` (one JSON [`Issue`] object per line, the same
/// format as the snapshot file) and merge it into `ctx`.
///
/// Fails without modifying `ctx` if `raw_input` contains unresolved
/// merge-conflict markers, or if it is empty while the store is
/// non-empty and `force` was not passed.
pub fn import(
    ctx: &mut CommandContext,
    raw_input: &str,
    source_path: &Path,
    force: bool,
    now: i64,
) -> Result<ImportOutcome> {
    if raw_input.lines().any(|line| CONFLICT_MARKERS.iter().any(|m| line.starts_with(m))) {
        return Err(Error::MergeConflictDetected {
            path: source_path.to_path_buf(),
        });
    }

    let candidates = parse_candidates(raw_input, source_path)?;
    if candidates.is_empty() && ctx.issues().count() > 0 && !force {
        return Err(Error::WouldOverwriteData {
            existing_count: ctx.issues().count(),
        });
    }

    let mut outcome = ImportOutcome::default();
    for mut candidate in candidates {
        match find_match(ctx.issues(), &candidate) {
            Some(existing_id) => {
                let existing = ctx.issues().get(&existing_id)?.clone();
                if candidate.updated_at > existing.updated_at {
                    candidate.id = existing.id;
                    ctx.apply_import_issue(candidate, now)?;
                    outcome.merged += 1;
                } else {
                    outcome.unchanged += 1;
                }
            }
            None => {
                ctx.apply_import_issue(candidate, now)?;
                outcome.inserted += 1;
            }
        }
    }
    Ok(outcome)
}

fn parse_candidates(raw_input: &str, source_path: &Path) -> Result<Vec<Issue>> {
    let mut candidates = Vec::new();
    for (idx, line) in raw_input.lines().enumerate() {
        if line.trim().is_empty() {
            continue;
        }
        let issue: Issue = serde_json::from_str(line).map_err(|source| {
            Error::Storage(beads_storage::Error::MalformedRecord {
                path: source_path.to_path_buf(),
                line_no: idx + 1,
                source,
            })
        })?;
        candidates.push(issue);
    }
    Ok(candidates)
}

/// Resolve `candidate` against `store`'s current contents, in
/// external_ref+source_system / content_hash / id priority order.
fn find_match(store: &IssueStore, candidate: &Issue) -> Option<String> {
    if let (Some(ext_ref), Some(source_system)) =
        (candidate.external_ref.as_deref(), candidate.source_system.as_deref())
    {
        if let Some(existing) = store.all().iter().find(|i| {
            i.external_ref.as_deref() == Some(ext_ref) && i.source_system.as_deref() == Some(source_system)
        }) {
            return Some(existing.id.clone());
        }
    }

    if let Some(hash) = candidate.content_hash.as_deref() {
        if let Some(existing) = store.all().iter().find(|i| i.content_hash.as_deref() == Some(hash)) {
            return Some(existing.id.clone());
        }
    }

    if store.exists(&candidate.id) {
        return Some(candidate.id.clone());
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::NewIssue;

    #[test]
    fn empty_input_against_non_empty_store_requires_force() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        ctx.create_issue(NewIssue { title: "A".into(), ..Default::default() }, 1).unwrap();

        let err = import(&mut ctx, "", Path::new("import.jsonl"), false, 2).unwrap_err();
        assert!(matches!(err, Error::WouldOverwriteData { existing_count: 1 }));

        let outcome = import(&mut ctx, "", Path::new("import.jsonl"), true, 2).unwrap();
        assert_eq!(outcome, ImportOutcome::default());
    }

    #[test]
    fn conflict_markers_abort_without_modifying_store() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        let before = ctx.issues().count();

        let input = "<<<<<<< ours\nsomething\n=======\nsomething else\n>>>>>>> theirs\n";
        let err = import(&mut ctx, input, Path::new("import.jsonl"), true, 1).unwrap_err();
        assert!(matches!(err, Error::MergeConflictDetected { .. }));
        assert_eq!(ctx.issues().count(), before);
    }

    #[test]
    fn new_candidate_with_no_match_is_inserted() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

        let line = serde_json::to_string(&sample("ext-1", 10)).unwrap();
        let outcome = import(&mut ctx, &line, Path::new("import.jsonl"), false, 20).unwrap();

        assert_eq!(outcome.inserted, 1);
        assert_eq!(ctx.issues().count(), 1);
    }

    #[test]
    fn matching_external_ref_merges_last_writer_wins() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        let created = ctx
            .create_issue(
                NewIssue {
                    title: "Original".into(),
                    external_ref: Some("ext-1".into()),
                    source_system: Some("jira".into()),
                    ..Default::default()
                },
                1,
            )
            .unwrap();

        let mut newer = sample("ext-1", 99);
        newer.id = "irrelevant".into();
        newer.title = "Updated from Jira".into();
        let line = serde_json::to_string(&newer).unwrap();

        let outcome = import(&mut ctx, &line, Path::new("import.jsonl"), false, 100).unwrap();
        assert_eq!(outcome.merged, 1);
        assert_eq!(ctx.issues().get(&created.id).unwrap().title, "Updated from Jira");
    }

    fn sample(ext_ref: &str, updated_at: i64) -> Issue {
        use beads_core::{IssueType, Priority, Status};
        Issue {
            id: "bd-xxx".into(),
            title: "Imported".into(),
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
            updated_at,
            closed_at: None,
            close_reason: None,
            due_at: None,
            defer_until: None,
            estimated_minutes: None,
            pinned: false,
            is_template: false,
            external_ref: Some(ext_ref.to_owned()),
            source_system: Some("jira".into()),
            content_hash: None,
            deleted: false,
            extra: serde_json::Map::new(),
        }
    }
}

//! End-to-end scenarios exercising [`CommandContext`] against real WAL
//! and snapshot files on disk, rather than just in-memory assertions.

use beads_engine::{CommandContext, NewIssue};
use beads_storage::wal;
use beads_storage::RepositoryPaths;

fn issue(ctx: &mut CommandContext, title: &str, now: i64) -> String {
    ctx.create_issue(NewIssue { title: title.into(), ..Default::default() }, now)
        .unwrap()
        .id
}

#[test]
fn new_issue_has_no_snapshot_and_one_wal_frame() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let id = issue(&mut ctx, "Hello", 1_700_000_000);

    let paths = RepositoryPaths::open_or_create(dir.path()).unwrap();
    assert!(!paths.snapshot().exists());

    let replay = wal::read_all(&paths.wal(ctx.generation())).unwrap();
    assert!(!replay.torn_tail);
    assert_eq!(replay.records.len(), 1);
    assert_eq!(replay.records[0].seq, 1);

    assert_eq!(ctx.issues().ready_issues(1_700_000_000).iter().map(|i| &i.id).collect::<Vec<_>>(), vec![&id]);
}

#[test]
fn blocking_dependency_moves_the_dependent_off_ready() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let a = issue(&mut ctx, "A", 1);
    let b = issue(&mut ctx, "B", 1);
    ctx.add_dependency(&a, &b, beads_core::DependencyType::Blocks, None, 2).unwrap();

    let ready: Vec<&str> = ctx.issues().ready_issues(2).iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ready, vec![b.as_str()]);

    let blocked: Vec<&str> = ctx.issues().blocked_issues().iter().map(|i| i.id.as_str()).collect();
    assert_eq!(blocked, vec![a.as_str()]);
}

#[test]
fn closing_the_blocker_frees_the_dependent_without_touching_it() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let a = issue(&mut ctx, "A", 1);
    let b = issue(&mut ctx, "B", 1);
    ctx.add_dependency(&a, &b, beads_core::DependencyType::Blocks, None, 2).unwrap();

    ctx.close_issue(&b, 100).unwrap();

    let ready: Vec<&str> = ctx.issues().ready_issues(100).iter().map(|i| i.id.as_str()).collect();
    assert_eq!(ready, vec![a.as_str()]);
    assert_eq!(ctx.issues().get(&a).unwrap().updated_at, 2);
}

#[test]
fn compaction_rotates_generation_and_reload_reproduces_prior_state() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let a = issue(&mut ctx, "A", 1);
    let b = issue(&mut ctx, "B", 1);
    ctx.add_dependency(&a, &b, beads_core::DependencyType::Blocks, None, 2).unwrap();
    ctx.close_issue(&b, 100).unwrap();

    let before_ready: Vec<String> = ctx.issues().ready_issues(100).iter().map(|i| i.id.clone()).collect();

    ctx.compact(101).unwrap();
    assert_eq!(ctx.generation(), 2);

    let paths = RepositoryPaths::open_or_create(dir.path()).unwrap();
    let fresh_wal = wal::read_all(&paths.wal(2)).unwrap();
    assert!(fresh_wal.records.is_empty());
    assert!(paths.snapshot().exists());

    drop(ctx);
    let reloaded = CommandContext::open(dir.path(), "bd").unwrap();
    let after_ready: Vec<String> = reloaded.issues().ready_issues(100).iter().map(|i| i.id.clone()).collect();
    assert_eq!(before_ready, after_ready);
    assert_eq!(reloaded.issues().count(), 2);
}

#[test]
fn adding_a_reverse_edge_would_create_a_cycle_and_leaves_the_graph_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let a = issue(&mut ctx, "A", 1);
    let b = issue(&mut ctx, "B", 1);
    ctx.add_dependency(&a, &b, beads_core::DependencyType::Blocks, None, 2).unwrap();

    let err = ctx.add_dependency(&b, &a, beads_core::DependencyType::Blocks, None, 3).unwrap_err();
    assert!(matches!(err, beads_engine::Error::CycleDetected { .. }));
    assert_eq!(ctx.issues().dependencies_of(&b).unwrap().len(), 0);
}

#[test]
fn importing_input_with_merge_conflict_markers_mutates_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
    issue(&mut ctx, "Existing", 1);
    let before = ctx.issues().count();

    let raw = "<<<<<<< ours\n{}\n=======\n{}\n>>>>>>> theirs\n";
    let err = beads_engine::import(&mut ctx, raw, std::path::Path::new("conflicted.jsonl"), true, 2).unwrap_err();

    assert!(matches!(err, beads_engine::Error::MergeConflictDetected { .. }));
    assert_eq!(ctx.issues().count(), before);
}

#[test]
fn defer_until_in_the_past_is_ready_in_the_future_is_not() {
    let dir = tempfile::tempdir().unwrap();
    let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();

    let now = 1_700_000_000;
    let overdue = ctx
        .create_issue(NewIssue { title: "Overdue".into(), defer_until: Some(now - 1), ..Default::default() }, now)
        .unwrap();
    let future = ctx
        .create_issue(NewIssue { title: "Later".into(), defer_until: Some(now + 3600), ..Default::default() }, now)
        .unwrap();

    let ready: Vec<&str> = ctx.issues().ready_issues(now).iter().map(|i| i.id.as_str()).collect();
    assert!(ready.contains(&overdue.id.as_str()));
    assert!(!ready.contains(&future.id.as_str()));
}

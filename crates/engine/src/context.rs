//! Command context: owns a repository's lock and write path, mediating
//! load (snapshot + WAL replay) and every durable mutation.
//!
//! Reads (`issues()`, `ready_issues()`, ...) go straight to the
//! in-memory [`IssueStore`] and never touch the lock — only a write
//! needs mutual exclusion against another process.

use crate::audit::{diff_for_replay, events_from_changes, AuditLog};
use crate::error::{Error, Result};
use crate::store::IssueStore;
use beads_core::{
    Comment, Dependency, DependencyType, Event, IdentityGenerator, Issue, IssuePatch, IssueType,
    Priority, Status,
};
use beads_storage::{generation, snapshot, wal, ExclusiveLock, RepositoryPaths, RetentionPolicy};
use beads_storage::{CompactionReport, WalOp, WalRecord, WalWriter};
use std::path::PathBuf;

/// Fields accepted when creating a new issue. Everything but `title` has
/// a sensible default, mirroring [`IssuePatch`]'s sparse-update shape on
/// the creation side.
#[derive(Debug, Clone)]
pub struct NewIssue {
    /// Short summary. Required, non-empty.
    pub title: String,
    /// Long-form description.
    pub description: Option<String>,
    /// Design notes.
    pub design: Option<String>,
    /// Acceptance criteria.
    pub acceptance_criteria: Option<String>,
    /// Free-form notes.
    pub notes: Option<String>,
    /// Classification. Defaults to [`IssueType::Task`].
    pub issue_type: IssueType,
    /// Urgency. Defaults to [`Priority::default`].
    pub priority: Priority,
    /// Who is currently working the issue.
    pub assignee: Option<String>,
    /// Who owns the issue long-term.
    pub owner: Option<String>,
    /// Who created the issue.
    pub created_by: Option<String>,
    /// Labels attached at creation.
    pub labels: Vec<String>,
    /// Target completion time.
    pub due_at: Option<i64>,
    /// Becomes ready again at this time if created already deferred.
    pub defer_until: Option<i64>,
    /// Rough size estimate, in minutes.
    pub estimated_minutes: Option<u32>,
    /// Kept visible even after reaching a terminal status.
    pub pinned: bool,
    /// Marks the issue as a reusable template.
    pub is_template: bool,
    /// Identifier in an external system, for import deduplication.
    pub external_ref: Option<String>,
    /// Name of the external system `external_ref` belongs to.
    pub source_system: Option<String>,
}

impl Default for NewIssue {
    fn default() -> Self {
        NewIssue {
            title: String::new(),
            description: None,
            design: None,
            acceptance_criteria: None,
            notes: None,
            issue_type: IssueType::Task,
            priority: Priority::default(),
            assignee: None,
            owner: None,
            created_by: None,
            labels: Vec::new(),
            due_at: None,
            defer_until: None,
            estimated_minutes: None,
            pinned: false,
            is_template: false,
            external_ref: None,
            source_system: None,
        }
    }
}

/// Owns the exclusive lock, the loaded generation, the in-memory issue
/// store, and the derived audit log for one repository.
pub struct CommandContext {
    paths: RepositoryPaths,
    lock: ExclusiveLock,
    generation: u64,
    store: IssueStore,
    audit: AuditLog,
    identity: IdentityGenerator,
    id_prefix: String,
    retention: RetentionPolicy,
    wal_writer: Option<WalWriter>,
}

impl CommandContext {
    /// Open (creating if necessary) the repository at `data_dir`, replay
    /// its snapshot and current-generation WAL into memory, and return a
    /// ready context. `id_prefix` seeds newly generated ids (e.g. `"bd"`).
    pub fn open(data_dir: impl Into<PathBuf>, id_prefix: impl Into<String>) -> Result<Self> {
        let paths = RepositoryPaths::open_or_create(data_dir)?;
        let lock = ExclusiveLock::open(paths.lock_file())?;
        let (generation, store, audit) = Self::load(&paths)?;
        let id_prefix = id_prefix.into();
        Ok(CommandContext {
            paths,
            lock,
            generation,
            store,
            audit,
            identity: IdentityGenerator::new(id_prefix.clone()),
            id_prefix,
            retention: RetentionPolicy::default(),
            wal_writer: None,
        })
    }

    /// Replace the retention policy applied at the next [`Self::compact`].
    pub fn set_retention(&mut self, retention: RetentionPolicy) {
        self.retention = retention;
    }

    /// Read-only access to the loaded issue set.
    pub fn issues(&self) -> &IssueStore {
        &self.store
    }

    /// Read-only access to the derived audit log.
    pub fn audit(&self) -> &AuditLog {
        &self.audit
    }

    /// The generation currently loaded.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Apply one resolved import candidate (already assigned its final
    /// id by the caller) under the repository lock: store, WAL-append,
    /// and audit, in that order, matching every other mutator.
    pub(crate) fn apply_import_issue(&mut self, mut issue: Issue, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        let before = self.store.get(&issue.id).ok().cloned();
        issue.refresh_content_hash();
        self.store.put(issue.clone());
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Update, issue.id.clone(), Some(serde_json::to_value(&issue).expect("Issue always serialises")), now)?;
        self.audit.record(diff_for_replay(before.as_ref(), &issue, now));
        Ok(())
    }

    fn load(paths: &RepositoryPaths) -> Result<(u64, IssueStore, AuditLog)> {
        loop {
            let generation_before = generation::read(&paths.generation_file())?;
            let snapshot_issues = snapshot::read_all(&paths.snapshot())?;
            let replay = wal::read_all(&paths.wal(generation_before))?;
            if replay.torn_tail {
                tracing::warn!(
                    generation = generation_before,
                    stopped_at = replay.stopped_at,
                    "WAL torn tail detected during load, replaying only the valid prefix",
                );
            }

            // A compaction could have rotated the generation while we
            // were reading the snapshot and WAL above; re-check and
            // restart the whole load rather than risk mixing a
            // pre-rotation snapshot with a post-rotation WAL.
            let generation_after = generation::read(&paths.generation_file())?;
            if generation_after != generation_before {
                tracing::info!(generation_before, generation_after, "generation moved during load, restarting");
                continue;
            }

            let mut store = IssueStore::from_issues(snapshot_issues);
            let mut audit = AuditLog::new();
            for record in &replay.records {
                Self::apply_record(&mut store, &mut audit, paths, generation_before, record)?;
            }
            store.clear_dirty();
            return Ok((generation_before, store, audit));
        }
    }

    fn apply_record(
        store: &mut IssueStore,
        audit: &mut AuditLog,
        paths: &RepositoryPaths,
        generation: u64,
        record: &WalRecord,
    ) -> Result<()> {
        let decode = |what: &'static str| -> Result<serde_json::Value> {
            record.data.clone().ok_or_else(|| {
                Error::Storage(beads_storage::Error::CorruptFrame {
                    path: paths.wal(generation),
                    offset: record.seq,
                    reason: what,
                })
            })
        };

        match record.op {
            WalOp::Add | WalOp::Update => {
                let value = decode("add/update record missing issue payload")?;
                let issue: Issue = serde_json::from_value(value).map_err(|source| {
                    Error::Storage(beads_storage::Error::MalformedRecord {
                        path: paths.wal(generation),
                        line_no: record.seq as usize,
                        source,
                    })
                })?;
                let before = store.get(&record.id).ok().cloned();
                audit.record(diff_for_replay(before.as_ref(), &issue, record.ts));
                store.put(issue);
            }
            WalOp::Close => {
                store.close(&record.id, record.ts)?;
                audit.record([close_event(&record.id, record.ts)]);
            }
            WalOp::Reopen => {
                let was_tombstone = store.get(&record.id).map(|i| i.status == Status::Tombstone).unwrap_or(false);
                if was_tombstone {
                    store.restore(&record.id, record.ts)?;
                    audit.record([restore_event(&record.id, record.ts)]);
                } else {
                    store.reopen(&record.id, record.ts)?;
                    audit.record([reopen_event(&record.id, record.ts)]);
                }
            }
            WalOp::Delete => {
                let reason = record
                    .data
                    .as_ref()
                    .and_then(|v| v.as_str())
                    .map(str::to_owned);
                store.delete(&record.id, reason, record.ts)?;
                audit.record([delete_event(&record.id, record.ts)]);
            }
            WalOp::SetBlocked => {
                let issue = store.get_mut(&record.id)?;
                let old = issue.status.clone();
                issue.status = Status::Blocked;
                issue.updated_at = record.ts;
                audit.record([status_change_event(&record.id, record.ts, &old, &Status::Blocked)]);
            }
            WalOp::UnsetBlocked => {
                let issue = store.get_mut(&record.id)?;
                let old = issue.status.clone();
                issue.status = Status::Open;
                issue.updated_at = record.ts;
                audit.record([status_change_event(&record.id, record.ts, &old, &Status::Open)]);
            }
            WalOp::LabelAdded => {
                let label = decode("label_added record missing label")?;
                let label = label.as_str().unwrap_or_default();
                store.add_label(&record.id, label, record.ts)?;
                audit.record([label_event(&record.id, record.ts, beads_core::EventType::LabelAdded, label)]);
            }
            WalOp::LabelRemoved => {
                let label = decode("label_removed record missing label")?;
                let label = label.as_str().unwrap_or_default();
                store.remove_label(&record.id, label, record.ts)?;
                audit.record([label_event(&record.id, record.ts, beads_core::EventType::LabelRemoved, label)]);
            }
            WalOp::DependencyAdded => {
                let value = decode("dependency_added record missing dependency")?;
                let dep: Dependency = serde_json::from_value(value).map_err(|source| {
                    Error::Storage(beads_storage::Error::MalformedRecord {
                        path: paths.wal(generation),
                        line_no: record.seq as usize,
                        source,
                    })
                })?;
                let ts = record.ts;
                store.add_dependency(dep.clone(), ts)?;
                audit.record([dependency_event(beads_core::EventType::DependencyAdded, &dep, ts)]);
            }
            WalOp::DependencyRemoved => {
                let value = decode("dependency_removed record missing dependency")?;
                let dep: Dependency = serde_json::from_value(value).map_err(|source| {
                    Error::Storage(beads_storage::Error::MalformedRecord {
                        path: paths.wal(generation),
                        line_no: record.seq as usize,
                        source,
                    })
                })?;
                let ts = record.ts;
                store.remove_dependency(&dep.issue_id, &dep.depends_on_id, Some(dep.dep_type.clone()), ts)?;
                audit.record([dependency_event(beads_core::EventType::DependencyRemoved, &dep, ts)]);
            }
            WalOp::CommentAdded => {
                let value = decode("comment_added record missing comment")?;
                let comment: Comment = serde_json::from_value(value).map_err(|source| {
                    Error::Storage(beads_storage::Error::MalformedRecord {
                        path: paths.wal(generation),
                        line_no: record.seq as usize,
                        source,
                    })
                })?;
                let issue = store.get_mut(&record.id)?;
                issue.comments.push(comment.clone());
                issue.updated_at = record.ts;
                audit.record([Event {
                    id: 0,
                    issue_id: record.id.clone(),
                    event_type: beads_core::EventType::Commented,
                    created_at: record.ts,
                    actor: comment.author,
                    field: None,
                    old_value: None,
                    new_value: None,
                }]);
            }
        }
        Ok(())
    }

    fn writer_for<'a>(
        wal_writer: &'a mut Option<WalWriter>,
        paths: &RepositoryPaths,
        generation: u64,
    ) -> Result<&'a mut WalWriter> {
        let expected = paths.wal(generation);
        let stale = match wal_writer {
            Some(w) => w.path() != expected,
            None => true,
        };
        if stale {
            *wal_writer = Some(WalWriter::open(expected)?);
        }
        Ok(wal_writer.as_mut().expect("just set"))
    }

    /// Create a new issue, assigning it a fresh content-addressed id.
    pub fn create_issue(&mut self, new: NewIssue, now: i64) -> Result<Issue> {
        if new.title.is_empty() {
            return Err(Error::core_validation(beads_core::ValidationKind::TitleEmpty));
        }
        let _guard = self.lock.acquire()?;

        let count = self.store.count();
        let nonce: [u8; 16] = rand::random();
        let now_nanos = (now as u128) * 1_000_000_000;
        let id = self
            .identity
            .generate(&new.title, new.description.as_deref(), new.created_by.as_deref(), now_nanos, nonce, count, |candidate| {
                self.store.exists(&format!("{}-{candidate}", self.id_prefix))
            })?;

        let mut issue = Issue {
            id: id.to_string(),
            title: new.title,
            description: new.description,
            design: new.design,
            acceptance_criteria: new.acceptance_criteria,
            notes: new.notes,
            issue_type: new.issue_type,
            status: Status::Open,
            priority: new.priority,
            assignee: new.assignee,
            owner: new.owner,
            created_by: new.created_by,
            labels: new.labels,
            dependencies: Vec::new(),
            comments: Vec::new(),
            created_at: now,
            updated_at: now,
            closed_at: None,
            close_reason: None,
            due_at: new.due_at,
            defer_until: new.defer_until,
            estimated_minutes: new.estimated_minutes,
            pinned: new.pinned,
            is_template: new.is_template,
            external_ref: new.external_ref,
            source_system: new.source_system,
            content_hash: None,
            deleted: false,
            extra: serde_json::Map::new(),
        };
        issue.refresh_content_hash();

        self.store.insert(issue.clone())?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Add, issue.id.clone(), Some(serde_json::to_value(&issue).expect("Issue always serialises")), now)?;
        self.audit.record(diff_for_replay(None, &issue, now));
        Ok(issue)
    }

    /// Apply a sparse patch to an existing issue.
    pub fn update_issue(&mut self, id: &str, patch: IssuePatch, actor: Option<&str>, now: i64) -> Result<Vec<Event>> {
        let _guard = self.lock.acquire()?;
        let changes = self.store.update(id, patch, now)?;
        if changes.is_empty() {
            return Ok(Vec::new());
        }
        let issue = self.store.get(id)?.clone();
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Update, id, Some(serde_json::to_value(&issue).expect("Issue always serialises")), now)?;
        let events = events_from_changes(id, &changes, now, actor);
        self.audit.record(events.clone());
        Ok(events)
    }

    /// Transition an issue to `closed`.
    pub fn close_issue(&mut self, id: &str, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        self.store.close(id, now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Close, id, None, now)?;
        self.audit.record([close_event(id, now)]);
        Ok(())
    }

    /// Transition a closed issue back to `open`.
    pub fn reopen_issue(&mut self, id: &str, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        self.store.reopen(id, now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Reopen, id, None, now)?;
        self.audit.record([reopen_event(id, now)]);
        Ok(())
    }

    /// Soft-delete (tombstone) an issue.
    pub fn delete_issue(&mut self, id: &str, reason: Option<String>, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        self.store.delete(id, reason.clone(), now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Delete, id, reason.map(|r| serde_json::Value::String(r)), now)?;
        self.audit.record([delete_event(id, now)]);
        Ok(())
    }

    /// Restore a tombstoned issue back to `open`.
    pub fn restore_issue(&mut self, id: &str, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        self.store.restore(id, now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::Reopen, id, None, now)?;
        self.audit.record([restore_event(id, now)]);
        Ok(())
    }

    /// Mark an issue `blocked`, overriding its current status.
    pub fn set_blocked_issue(&mut self, id: &str, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        let issue = self.store.get_mut(id)?;
        let old = issue.status.clone();
        issue.status = Status::Blocked;
        issue.updated_at = now;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::SetBlocked, id, None, now)?;
        self.audit.record([status_change_event(id, now, &old, &Status::Blocked)]);
        Ok(())
    }

    /// Clear a manually set `blocked` status back to `open`.
    pub fn unset_blocked_issue(&mut self, id: &str, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        let issue = self.store.get_mut(id)?;
        let old = issue.status.clone();
        issue.status = Status::Open;
        issue.updated_at = now;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::UnsetBlocked, id, None, now)?;
        self.audit.record([status_change_event(id, now, &old, &Status::Open)]);
        Ok(())
    }

    /// Attach a label. A no-op (no WAL append, no audit event) if the
    /// issue already carries it.
    pub fn add_label(&mut self, id: &str, label: &str, now: i64) -> Result<bool> {
        let _guard = self.lock.acquire()?;
        let added = self.store.add_label(id, label, now)?;
        if added {
            Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::LabelAdded, id, Some(serde_json::Value::String(label.to_owned())), now)?;
            self.audit.record([label_event(id, now, beads_core::EventType::LabelAdded, label)]);
        }
        Ok(added)
    }

    /// Remove a label. A no-op if the issue does not carry it.
    pub fn remove_label(&mut self, id: &str, label: &str, now: i64) -> Result<bool> {
        let _guard = self.lock.acquire()?;
        let removed = self.store.remove_label(id, label, now)?;
        if removed {
            Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::LabelRemoved, id, Some(serde_json::Value::String(label.to_owned())), now)?;
            self.audit.record([label_event(id, now, beads_core::EventType::LabelRemoved, label)]);
        }
        Ok(removed)
    }

    /// Append a comment.
    pub fn add_comment(&mut self, id: &str, author: Option<String>, body: String, now: i64) -> Result<Comment> {
        let _guard = self.lock.acquire()?;
        let comment = self.store.add_comment(id, author.clone(), body, now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::CommentAdded, id, Some(serde_json::to_value(&comment).expect("Comment always serialises")), now)?;
        self.audit.record([Event {
            id: 0,
            issue_id: id.to_owned(),
            event_type: beads_core::EventType::Commented,
            created_at: now,
            actor: author,
            field: None,
            old_value: None,
            new_value: None,
        }]);
        Ok(comment)
    }

    /// Add a dependency edge.
    pub fn add_dependency(&mut self, issue_id: &str, depends_on_id: &str, dep_type: DependencyType, created_by: Option<String>, now: i64) -> Result<()> {
        let _guard = self.lock.acquire()?;
        let dep = Dependency {
            issue_id: issue_id.to_owned(),
            depends_on_id: depends_on_id.to_owned(),
            dep_type,
            created_at: now,
            created_by,
            metadata: None,
            thread_id: None,
        };
        self.store.add_dependency(dep.clone(), now)?;
        Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::DependencyAdded, issue_id, Some(serde_json::to_value(&dep).expect("Dependency always serialises")), now)?;
        self.audit.record([dependency_event(beads_core::EventType::DependencyAdded, &dep, now)]);
        Ok(())
    }

    /// Remove dependency edges from `issue_id` to `depends_on_id`,
    /// narrowed to `dep_type` if given.
    pub fn remove_dependency(&mut self, issue_id: &str, depends_on_id: &str, dep_type: Option<DependencyType>, now: i64) -> Result<usize> {
        let _guard = self.lock.acquire()?;
        let removed = self.store.remove_dependency(issue_id, depends_on_id, dep_type.clone(), now)?;
        if removed > 0 {
            let dep = Dependency {
                issue_id: issue_id.to_owned(),
                depends_on_id: depends_on_id.to_owned(),
                dep_type: dep_type.unwrap_or(DependencyType::Blocks),
                created_at: now,
                created_by: None,
                metadata: None,
                thread_id: None,
            };
            Self::writer_for(&mut self.wal_writer, &self.paths, self.generation)?.append(WalOp::DependencyRemoved, issue_id, Some(serde_json::to_value(&dep).expect("Dependency always serialises")), now)?;
            self.audit.record([dependency_event(beads_core::EventType::DependencyRemoved, &dep, now)]);
        }
        Ok(removed)
    }

    /// Merge the current snapshot and WAL into a new snapshot and rotate
    /// to a fresh WAL generation, backing up the retired files and
    /// pruning old backups under the configured retention policy.
    pub fn compact(&mut self, now: i64) -> Result<CompactionReport> {
        let report = beads_storage::compact(&self.paths, &self.lock, self.store.all(), &self.retention)?;
        self.generation = report.new_generation;
        self.store.clear_dirty();
        self.wal_writer = None;
        self.audit.record([Event {
            id: 0,
            issue_id: String::new(),
            event_type: beads_core::EventType::Compacted,
            created_at: now,
            actor: None,
            field: None,
            old_value: serde_json::to_value(report.new_generation - 1).ok(),
            new_value: serde_json::to_value(report.new_generation).ok(),
        }]);
        Ok(report)
    }
}

fn close_event(id: &str, now: i64) -> Event {
    Event { id: 0, issue_id: id.to_owned(), event_type: beads_core::EventType::Closed, created_at: now, actor: None, field: None, old_value: None, new_value: None }
}

fn reopen_event(id: &str, now: i64) -> Event {
    Event { id: 0, issue_id: id.to_owned(), event_type: beads_core::EventType::Reopened, created_at: now, actor: None, field: None, old_value: None, new_value: None }
}

fn delete_event(id: &str, now: i64) -> Event {
    Event { id: 0, issue_id: id.to_owned(), event_type: beads_core::EventType::Deleted, created_at: now, actor: None, field: None, old_value: None, new_value: None }
}

fn restore_event(id: &str, now: i64) -> Event {
    Event { id: 0, issue_id: id.to_owned(), event_type: beads_core::EventType::Restored, created_at: now, actor: None, field: None, old_value: None, new_value: None }
}

fn label_event(id: &str, now: i64, event_type: beads_core::EventType, label: &str) -> Event {
    Event {
        id: 0,
        issue_id: id.to_owned(),
        event_type,
        created_at: now,
        actor: None,
        field: Some("labels".to_owned()),
        old_value: None,
        new_value: Some(serde_json::Value::String(label.to_owned())),
    }
}

fn status_change_event(id: &str, now: i64, old: &Status, new: &Status) -> Event {
    Event {
        id: 0,
        issue_id: id.to_owned(),
        event_type: beads_core::EventType::StatusChanged,
        created_at: now,
        actor: None,
        field: Some("status".to_owned()),
        old_value: serde_json::to_value(old).ok(),
        new_value: serde_json::to_value(new).ok(),
    }
}

fn dependency_event(event_type: beads_core::EventType, dep: &Dependency, now: i64) -> Event {
    Event {
        id: 0,
        issue_id: dep.issue_id.clone(),
        event_type,
        created_at: now,
        actor: dep.created_by.clone(),
        field: None,
        old_value: None,
        new_value: serde_json::to_value(dep).ok(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn create_then_reload_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
            let issue = ctx
                .create_issue(NewIssue { title: "Fix the thing".into(), ..Default::default() }, 1000)
                .unwrap();
            issue.id
        };

        let ctx = CommandContext::open(dir.path(), "bd").unwrap();
        assert_eq!(ctx.issues().get(&id).unwrap().title, "Fix the thing");
        assert_eq!(ctx.audit().for_issue(&id).count(), 1);
    }

    #[test]
    fn close_then_reopen_round_trips_through_reload() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
            let issue = ctx
                .create_issue(NewIssue { title: "A".into(), ..Default::default() }, 1)
                .unwrap();
            ctx.close_issue(&issue.id, 2).unwrap();
            issue.id
        };

        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        assert_eq!(ctx.issues().get(&id).unwrap().status, Status::Closed);
        ctx.reopen_issue(&id, 3).unwrap();
        assert_eq!(ctx.issues().get(&id).unwrap().status, Status::Open);
    }

    #[test]
    fn compact_then_reload_preserves_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        let issue = ctx.create_issue(NewIssue { title: "A".into(), ..Default::default() }, 1).unwrap();
        ctx.compact(2).unwrap();
        ctx.add_label(&issue.id, "urgent", 3).unwrap();
        drop(ctx);

        let ctx = CommandContext::open(dir.path(), "bd").unwrap();
        assert_eq!(ctx.issues().get(&issue.id).unwrap().labels, vec!["urgent".to_string()]);
    }

    #[test]
    fn set_blocked_then_unset_round_trips_through_reload() {
        let dir = tempfile::tempdir().unwrap();
        let id = {
            let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
            let issue = ctx.create_issue(NewIssue { title: "A".into(), ..Default::default() }, 1).unwrap();
            ctx.set_blocked_issue(&issue.id, 2).unwrap();
            issue.id
        };

        let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
        assert_eq!(ctx.issues().get(&id).unwrap().status, Status::Blocked);
        ctx.unset_blocked_issue(&id, 3).unwrap();
        assert_eq!(ctx.issues().get(&id).unwrap().status, Status::Open);
    }

    #[test]
    fn dependency_add_and_remove_round_trip_through_reload() {
        let dir = tempfile::tempdir().unwrap();
        let (a, b) = {
            let mut ctx = CommandContext::open(dir.path(), "bd").unwrap();
            let a = ctx.create_issue(NewIssue { title: "A".into(), ..Default::default() }, 1).unwrap();
            let b = ctx.create_issue(NewIssue { title: "B".into(), ..Default::default() }, 1).unwrap();
            ctx.add_dependency(&a.id, &b.id, DependencyType::Blocks, None, 2).unwrap();
            (a.id, b.id)
        };

        let ctx = CommandContext::open(dir.path(), "bd").unwrap();
        assert_eq!(ctx.issues().dependencies_of(&a).unwrap().len(), 1);
        assert_eq!(ctx.issues().dependencies_of(&a).unwrap()[0].depends_on_id, b);
    }
}

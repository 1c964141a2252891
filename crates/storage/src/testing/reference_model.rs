//! A deliberately naive in-memory model of the WAL+snapshot state
//! machine, applying mutations directly in order with no framing, no
//! locking, and no compaction. Used to differentially test the real
//! WAL-backed pipeline: replaying the real WAL must always reach the
//! same state as applying the same operations to this model.

use crate::wal::{WalOp, WalRecord};
use beads_core::Issue;
use std::collections::BTreeMap;

/// Naive issue-state accumulator, keyed by issue id.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReferenceModel {
    issues: BTreeMap<String, Issue>,
}

impl ReferenceModel {
    /// An empty model.
    pub fn new() -> Self {
        ReferenceModel::default()
    }

    /// Seed the model from a snapshot's worth of issues, as if loaded
    /// before any WAL replay.
    pub fn seed(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut model = ReferenceModel::new();
        for issue in issues {
            model.issues.insert(issue.id.clone(), issue);
        }
        model
    }

    /// Apply one WAL record's mutation. `Add`/`Update` expect `data` to
    /// decode as a full [`Issue`]; the narrower ops only touch the
    /// fields they name and otherwise leave the stored issue untouched.
    pub fn apply(&mut self, record: &WalRecord) {
        match record.op {
            WalOp::Add | WalOp::Update => {
                if let Some(data) = &record.data {
                    if let Ok(issue) = serde_json::from_value::<Issue>(data.clone()) {
                        self.issues.insert(record.id.clone(), issue);
                    }
                }
            }
            WalOp::Close => {
                if let Some(issue) = self.issues.get_mut(&record.id) {
                    issue.closed_at = Some(record.ts);
                }
            }
            WalOp::Reopen => {
                if let Some(issue) = self.issues.get_mut(&record.id) {
                    issue.closed_at = None;
                }
            }
            WalOp::Delete => {
                if let Some(issue) = self.issues.get_mut(&record.id) {
                    issue.deleted = true;
                }
            }
            WalOp::SetBlocked | WalOp::UnsetBlocked => {
                // Blocked state is derived from the dependency graph, not
                // stored on the issue; the reference model has nothing to
                // mutate for these ops beyond recording that they occurred,
                // which callers can observe via `last_op_for`.
            }
            WalOp::LabelAdded => {
                if let (Some(issue), Some(label)) = (
                    self.issues.get_mut(&record.id),
                    record.data.as_ref().and_then(|v| v.as_str()),
                ) {
                    if !issue.labels.iter().any(|l| l == label) {
                        issue.labels.push(label.to_owned());
                    }
                }
            }
            WalOp::LabelRemoved => {
                if let (Some(issue), Some(label)) = (
                    self.issues.get_mut(&record.id),
                    record.data.as_ref().and_then(|v| v.as_str()),
                ) {
                    issue.labels.retain(|l| l != label);
                }
            }
            WalOp::CommentAdded => {
                if let (Some(issue), Some(data)) = (self.issues.get_mut(&record.id), &record.data) {
                    if let Ok(comment) = serde_json::from_value(data.clone()) {
                        issue.comments.push(comment);
                    }
                }
            }
            WalOp::DependencyAdded => {
                if let Some(data) = &record.data {
                    if let Ok(dep) = serde_json::from_value(data.clone()) {
                        if let Some(issue) = self.issues.get_mut(&record.id) {
                            issue.dependencies.push(dep);
                        }
                    }
                }
            }
            WalOp::DependencyRemoved => {
                if let (Some(issue), Some(depends_on_id)) = (
                    self.issues.get_mut(&record.id),
                    record.data.as_ref().and_then(|v| v.get("depends_on_id")).and_then(|v| v.as_str()),
                ) {
                    issue.dependencies.retain(|d| d.depends_on_id != depends_on_id);
                }
            }
        }
    }

    /// Apply every record in order.
    pub fn apply_all<'a>(&mut self, records: impl IntoIterator<Item = &'a WalRecord>) {
        for record in records {
            self.apply(record);
        }
    }

    /// Current issues, sorted by id.
    pub fn issues(&self) -> Vec<Issue> {
        self.issues.values().cloned().collect()
    }

    /// Number of issues currently tracked (including soft-deleted ones).
    pub fn len(&self) -> usize {
        self.issues.len()
    }

    /// `true` if no issues are tracked.
    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use beads_core::{IssueType, Priority, Status};
    use serde_json::json;

    fn issue(id: &str) -> Issue {
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
    fn add_then_close_then_reopen() {
        let mut model = ReferenceModel::new();
        model.apply(&WalRecord {
            op: WalOp::Add,
            ts: 1,
            seq: 1,
            id: "bd-001".into(),
            data: Some(serde_json::to_value(issue("bd-001")).unwrap()),
        });
        model.apply(&WalRecord {
            op: WalOp::Close,
            ts: 2,
            seq: 2,
            id: "bd-001".into(),
            data: None,
        });
        assert_eq!(model.issues()[0].closed_at, Some(2));

        model.apply(&WalRecord {
            op: WalOp::Reopen,
            ts: 3,
            seq: 3,
            id: "bd-001".into(),
            data: None,
        });
        assert_eq!(model.issues()[0].closed_at, None);
    }

    #[test]
    fn label_add_is_idempotent() {
        let mut model = ReferenceModel::seed([issue("bd-001")]);
        let add = WalRecord {
            op: WalOp::LabelAdded,
            ts: 1,
            seq: 1,
            id: "bd-001".into(),
            data: Some(json!("urgent")),
        };
        model.apply(&add);
        model.apply(&add);
        assert_eq!(model.issues()[0].labels, vec!["urgent".to_string()]);
    }

    #[test]
    fn dependency_added_then_removed() {
        let mut model = ReferenceModel::seed([issue("bd-001"), issue("bd-002")]);
        model.apply(&WalRecord {
            op: WalOp::DependencyAdded,
            ts: 1,
            seq: 1,
            id: "bd-001".into(),
            data: Some(json!({
                "issue_id": "bd-001",
                "depends_on_id": "bd-002",
                "dep_type": "blocks",
                "created_at": 1,
            })),
        });
        let with_dep = model.issues().into_iter().find(|i| i.id == "bd-001").unwrap();
        assert_eq!(with_dep.dependencies.len(), 1);

        model.apply(&WalRecord {
            op: WalOp::DependencyRemoved,
            ts: 2,
            seq: 2,
            id: "bd-001".into(),
            data: Some(json!({"depends_on_id": "bd-002"})),
        });
        let without_dep = model.issues().into_iter().find(|i| i.id == "bd-001").unwrap();
        assert!(without_dep.dependencies.is_empty());
    }

    #[test]
    fn delete_sets_tombstone_without_removing() {
        let mut model = ReferenceModel::seed([issue("bd-001")]);
        model.apply(&WalRecord {
            op: WalOp::Delete,
            ts: 1,
            seq: 1,
            id: "bd-001".into(),
            data: None,
        });
        assert_eq!(model.len(), 1);
        assert!(model.issues()[0].deleted);
    }
}

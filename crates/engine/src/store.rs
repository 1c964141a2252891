//! In-memory issue store: an ordered issue collection, an id index for
//! constant-time lookup, and dirty-id tracking for incremental flush.

use crate::error::{Error, Result, ValidationKind};
use beads_core::{Comment, Issue, IssuePatch, Status};
use rustc_hash::{FxHashMap, FxHashSet};
use unicode_normalization::UnicodeNormalization;

/// One field's before/after value, for audit-event construction by the
/// caller. `old`/`new` are `None` only when the field itself is an
/// `Option` being cleared or set from empty.
#[derive(Debug, Clone)]
pub struct FieldChange {
    /// Name of the changed field, matching the wire name in [`Issue`].
    pub field: &'static str,
    /// Value before the patch, serialised for audit storage.
    pub old: Option<serde_json::Value>,
    /// Value after the patch, serialised for audit storage.
    pub new: Option<serde_json::Value>,
}

/// Composable read filter for [`IssueStore::list`].
///
/// Every populated field narrows the result; an empty filter matches
/// every non-tombstone issue.
#[derive(Debug, Clone, Default)]
pub struct IssueFilter {
    /// Match only this status.
    pub status: Option<Status>,
    /// Match only this priority.
    pub priority: Option<beads_core::Priority>,
    /// Match only this issue type.
    pub issue_type: Option<beads_core::IssueType>,
    /// Match only this assignee.
    pub assignee: Option<String>,
    /// Match if the issue carries any of these labels.
    pub labels_any: Vec<String>,
    /// Match only if the issue carries every one of these labels.
    pub labels_all: Vec<String>,
    /// Case-insensitive substring match over title and description.
    pub text_contains: Option<String>,
    /// Only issues created at or after this time.
    pub created_after: Option<i64>,
    /// Only issues created at or before this time.
    pub created_before: Option<i64>,
    /// Only issues updated at or after this time.
    pub updated_after: Option<i64>,
    /// Only issues updated at or before this time.
    pub updated_before: Option<i64>,
    /// Match only this pinned flag.
    pub pinned: Option<bool>,
    /// Match only this template flag.
    pub is_template: Option<bool>,
}

impl IssueFilter {
    fn matches(&self, issue: &Issue) -> bool {
        if let Some(status) = &self.status {
            if &issue.status != status {
                return false;
            }
        }
        if let Some(priority) = self.priority {
            if issue.priority != priority {
                return false;
            }
        }
        if let Some(issue_type) = &self.issue_type {
            if &issue.issue_type != issue_type {
                return false;
            }
        }
        if let Some(assignee) = &self.assignee {
            if issue.assignee.as_deref() != Some(assignee.as_str()) {
                return false;
            }
        }
        if !self.labels_any.is_empty() && !self.labels_any.iter().any(|l| issue.labels.contains(l)) {
            return false;
        }
        if !self.labels_all.is_empty() && !self.labels_all.iter().all(|l| issue.labels.contains(l)) {
            return false;
        }
        if let Some(text) = &self.text_contains {
            let needle = text.to_lowercase();
            let haystack = format!(
                "{} {}",
                issue.title.to_lowercase(),
                issue.description.as_deref().unwrap_or("").to_lowercase()
            );
            if !haystack.contains(&needle) {
                return false;
            }
        }
        if let Some(after) = self.created_after {
            if issue.created_at < after {
                return false;
            }
        }
        if let Some(before) = self.created_before {
            if issue.created_at > before {
                return false;
            }
        }
        if let Some(after) = self.updated_after {
            if issue.updated_at < after {
                return false;
            }
        }
        if let Some(before) = self.updated_before {
            if issue.updated_at > before {
                return false;
            }
        }
        if let Some(pinned) = self.pinned {
            if issue.pinned != pinned {
                return false;
            }
        }
        if let Some(is_template) = self.is_template {
            if issue.is_template != is_template {
                return false;
            }
        }
        true
    }
}

/// Owns every loaded issue, indexed by id.
///
/// A tombstoned issue is retained (it must survive to satisfy audit
/// queries) but is excluded from [`IssueStore::list`] and every
/// dependency-graph computation built on top of this store.
#[derive(Debug)]
pub struct IssueStore {
    issues: Vec<Issue>,
    index: FxHashMap<String, usize>,
    dirty: FxHashSet<String>,
    next_comment_seq: u64,
}

impl Default for IssueStore {
    fn default() -> Self {
        IssueStore {
            issues: Vec::new(),
            index: FxHashMap::default(),
            dirty: FxHashSet::default(),
            next_comment_seq: 1,
        }
    }
}

impl IssueStore {
    /// An empty store. Comment ids are assigned starting at `1`; `0` is
    /// reserved as the pending-assignment sentinel.
    pub fn new() -> Self {
        IssueStore::default()
    }

    /// Build a store from a fully merged (snapshot + WAL replay) issue
    /// set. Later entries win on a duplicate id, matching WAL `add`/
    /// `update` replace-in-place semantics.
    pub fn from_issues(issues: impl IntoIterator<Item = Issue>) -> Self {
        let mut store = IssueStore::new();
        for issue in issues {
            match store.index.get(&issue.id) {
                Some(&i) => store.issues[i] = issue,
                None => {
                    store.index.insert(issue.id.clone(), store.issues.len());
                    store.issues.push(issue);
                }
            }
        }
        store.next_comment_seq = store
            .issues
            .iter()
            .flat_map(|i| i.comments.iter())
            .filter_map(|c| c.id.parse::<u64>().ok())
            .max()
            .map_or(1, |n| n + 1);
        store
    }

    /// Insert a new issue. Fails with [`Error::DuplicateId`] if `id` is
    /// already present, or a validation error if the issue's own fields
    /// are invalid.
    pub fn insert(&mut self, issue: Issue) -> Result<()> {
        issue.validate()?;
        if self.index.contains_key(&issue.id) {
            return Err(Error::DuplicateId(issue.id));
        }
        self.dirty.insert(issue.id.clone());
        self.index.insert(issue.id.clone(), self.issues.len());
        self.issues.push(issue);
        Ok(())
    }

    /// Unconditionally insert or replace `issue`, bypassing duplicate-id
    /// and validation checks. Used to apply a WAL `add`/`update` record
    /// (which already carries a fully-formed post-image) and by import,
    /// where collision handling has already decided to overwrite.
    pub fn put(&mut self, issue: Issue) {
        self.dirty.insert(issue.id.clone());
        match self.index.get(&issue.id) {
            Some(&i) => self.issues[i] = issue,
            None => {
                self.index.insert(issue.id.clone(), self.issues.len());
                self.issues.push(issue);
            }
        }
    }

    /// Look up an issue by id.
    pub fn get(&self, id: &str) -> Result<&Issue> {
        self.index
            .get(id)
            .map(|&i| &self.issues[i])
            .ok_or_else(|| self.not_found(id))
    }

    /// Mutable lookup. Prefer [`IssueStore::update`] for any change that
    /// should be visible to audit/dirty tracking; this exists for the
    /// narrower ops (`close`, `add_label`, ...) that manage those
    /// themselves.
    pub fn get_mut(&mut self, id: &str) -> Result<&mut Issue> {
        match self.index.get(id) {
            Some(&i) => Ok(&mut self.issues[i]),
            None => Err(self.not_found(id)),
        }
    }

    /// `true` if an issue with `id` is present (including tombstoned).
    pub fn exists(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Total issue count, including tombstoned issues.
    pub fn count(&self) -> usize {
        self.issues.len()
    }

    /// Ids mutated since the store was built, for incremental WAL
    /// replay or flush bookkeeping.
    pub fn dirty_ids(&self) -> impl Iterator<Item = &str> {
        self.dirty.iter().map(|s| s.as_str())
    }

    /// Clear dirty tracking, e.g. after a successful compaction.
    pub fn clear_dirty(&mut self) {
        self.dirty.clear();
    }

    /// Every issue in insertion order, tombstones included. Used by the
    /// compactor to write a full snapshot.
    pub fn all(&self) -> &[Issue] {
        &self.issues
    }

    /// Issues matching `filter`, excluding tombstones — a tombstoned
    /// issue is never returned here regardless of filter fields.
    pub fn list(&self, filter: &IssueFilter) -> Vec<&Issue> {
        self.issues
            .iter()
            .filter(|i| i.status != Status::Tombstone)
            .filter(|i| filter.matches(i))
            .collect()
    }

    /// Apply a sparse field patch, refreshing `updated_at`. Returns the
    /// list of fields that actually changed, for the caller to turn into
    /// audit events; a no-op patch returns an empty list and does not
    /// bump `updated_at`.
    pub fn update(&mut self, id: &str, patch: IssuePatch, now: i64) -> Result<Vec<FieldChange>> {
        if patch.is_empty() {
            self.get(id)?;
            return Ok(Vec::new());
        }
        let issue = self.get_mut(id)?;
        let mut changes = Vec::new();

        macro_rules! apply_plain {
            ($field:ident, $wire:literal) => {
                if let Some(new) = patch.$field {
                    if issue.$field != new {
                        changes.push(FieldChange {
                            field: $wire,
                            old: serde_json::to_value(&issue.$field).ok(),
                            new: serde_json::to_value(&new).ok(),
                        });
                        issue.$field = new;
                    }
                }
            };
        }
        macro_rules! apply_nested_option {
            ($field:ident, $wire:literal) => {
                if let Some(new) = patch.$field {
                    if issue.$field != new {
                        changes.push(FieldChange {
                            field: $wire,
                            old: serde_json::to_value(&issue.$field).ok(),
                            new: serde_json::to_value(&new).ok(),
                        });
                        issue.$field = new;
                    }
                }
            };
        }

        apply_plain!(title, "title");
        apply_nested_option!(description, "description");
        apply_nested_option!(design, "design");
        apply_nested_option!(acceptance_criteria, "acceptance_criteria");
        apply_nested_option!(notes, "notes");
        apply_plain!(issue_type, "issue_type");
        apply_plain!(status, "status");
        apply_plain!(priority, "priority");
        apply_nested_option!(assignee, "assignee");
        apply_nested_option!(owner, "owner");
        apply_plain!(labels, "labels");
        apply_nested_option!(defer_until, "defer_until");
        apply_nested_option!(due_at, "due_at");
        apply_nested_option!(estimated_minutes, "estimated_minutes");
        apply_plain!(pinned, "pinned");

        if !changes.is_empty() {
            issue.updated_at = now;
            issue.refresh_content_hash();
            self.dirty.insert(id.to_owned());
        }
        Ok(changes)
    }

    /// Transition an issue to a terminal `closed` status.
    pub fn close(&mut self, id: &str, now: i64) -> Result<()> {
        let issue = self.get_mut(id)?;
        issue.status = Status::Closed;
        issue.closed_at = Some(now);
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(())
    }

    /// Transition a terminal issue back to `open`.
    pub fn reopen(&mut self, id: &str, now: i64) -> Result<()> {
        let issue = self.get_mut(id)?;
        issue.status = Status::Open;
        issue.closed_at = None;
        issue.close_reason = None;
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(())
    }

    /// Soft-delete: tombstone the issue and record why, without removing
    /// it from the store.
    pub fn delete(&mut self, id: &str, reason: Option<String>, now: i64) -> Result<()> {
        let issue = self.get_mut(id)?;
        issue.status = Status::Tombstone;
        issue.deleted = true;
        issue.close_reason = reason;
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(())
    }

    /// Restore a tombstoned issue back to `open`.
    pub fn restore(&mut self, id: &str, now: i64) -> Result<()> {
        let issue = self.get_mut(id)?;
        issue.status = Status::Open;
        issue.deleted = false;
        issue.close_reason = None;
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(())
    }

    /// Attach `label` if not already present. NFC-normalises and trims
    /// the label first. Idempotent: re-adding an existing label is a
    /// no-op (`false` return).
    pub fn add_label(&mut self, id: &str, label: &str, now: i64) -> Result<bool> {
        let label = normalize_label(label);
        let issue = self.get_mut(id)?;
        if issue.labels.iter().any(|l| l == &label) {
            return Ok(false);
        }
        issue.labels.push(label);
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(true)
    }

    /// Remove `label` if present. Idempotent: removing an absent label
    /// is a no-op (`false` return).
    pub fn remove_label(&mut self, id: &str, label: &str, now: i64) -> Result<bool> {
        let label = normalize_label(label);
        let issue = self.get_mut(id)?;
        let before = issue.labels.len();
        issue.labels.retain(|l| l != &label);
        if issue.labels.len() == before {
            return Ok(false);
        }
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(true)
    }

    /// Append a comment, assigning it the next monotonically increasing
    /// comment id (store-wide, decimal string).
    pub fn add_comment(
        &mut self,
        id: &str,
        author: Option<String>,
        body: String,
        now: i64,
    ) -> Result<Comment> {
        let comment_id = self.next_comment_seq;
        self.next_comment_seq += 1;
        let comment = Comment {
            id: comment_id.to_string(),
            author,
            body,
            created_at: now,
            thread_id: None,
        };
        let issue = self.get_mut(id)?;
        issue.comments.push(comment.clone());
        issue.updated_at = now;
        self.dirty.insert(id.to_owned());
        Ok(comment)
    }

    fn not_found(&self, id: &str) -> Error {
        let suggestion = nearest_id(id, self.issues.iter().map(|i| i.id.as_str()));
        Error::NotFound {
            id: id.to_owned(),
            suggestion,
        }
    }

    /// Mark `id` dirty. Used by the dependency-graph methods in
    /// [`crate::graph`], which mutate `Issue::dependencies` directly
    /// rather than through [`IssueStore::update`].
    pub(crate) fn touch_dirty(&mut self, id: &str) {
        self.dirty.insert(id.to_owned());
    }
}

fn normalize_label(label: &str) -> String {
    label.trim().nfc().collect::<String>()
}

/// The existing id closest to `id` by Levenshtein edit distance, for
/// `NotFound` suggestions. `None` if there are no candidates.
fn nearest_id<'a>(id: &str, candidates: impl Iterator<Item = &'a str>) -> Option<String> {
    candidates
        .map(|c| (c, levenshtein(id, c)))
        .min_by_key(|(_, d)| *d)
        .map(|(c, _)| c.to_owned())
}

fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let mut row: Vec<usize> = (0..=b.len()).collect();
    for (i, ca) in a.iter().enumerate() {
        let mut prev_diag = row[0];
        row[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let temp = row[j + 1];
            row[j + 1] = if ca == cb {
                prev_diag
            } else {
                1 + prev_diag.min(row[j]).min(row[j + 1])
            };
            prev_diag = temp;
        }
    }
    row[b.len()]
}

impl From<beads_core::ValidationKind> for ValidationKind {
    fn from(k: beads_core::ValidationKind) -> Self {
        ValidationKind::Core(k)
    }
}

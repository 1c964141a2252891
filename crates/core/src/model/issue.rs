use super::{Comment, Dependency, IssueType, Priority, Status};
use crate::error::{Error, Result, ValidationKind};
use crate::identity::{ContentHash, ContentHashFields};
use serde::{Deserialize, Serialize};

const MAX_TITLE_LEN: usize = 500;

/// The central entity: one tracked unit of work.
///
/// Unknown JSON fields encountered while decoding an older or
/// externally-produced record are preserved in `extra` rather than
/// dropped, so a round trip through this type never loses data it
/// doesn't understand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Issue {
    /// Content-addressed identifier (`{prefix}-{base}[.{path}]*`).
    pub id: String,
    /// Short summary. Must be non-empty and at most 500 characters.
    pub title: String,
    /// Long-form description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Design notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<String>,
    /// Acceptance criteria.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<String>,
    /// Free-form notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    /// Classification.
    pub issue_type: IssueType,
    /// Lifecycle status.
    pub status: Status,
    /// Urgency, `0` (most urgent) through `4`.
    pub priority: Priority,
    /// Who is currently working the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<String>,
    /// Who owns the issue long-term (may differ from `assignee`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<String>,
    /// Who created the issue.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Labels attached to the issue.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labels: Vec<String>,
    /// Outgoing dependency edges: `dependencies_of(self.id)`. Incoming
    /// edges (`dependents_of`) are derived by scanning every issue's
    /// outgoing set rather than stored redundantly.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub dependencies: Vec<Dependency>,
    /// Inline comment thread.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Comment>,
    /// Creation time (epoch seconds).
    pub created_at: i64,
    /// Last modification time (epoch seconds).
    pub updated_at: i64,
    /// Time the issue reached a terminal status, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub closed_at: Option<i64>,
    /// Reason recorded when the issue was closed or deleted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub close_reason: Option<String>,
    /// Target completion time, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<i64>,
    /// An issue in [`Status::Deferred`] becomes ready again at this time.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_until: Option<i64>,
    /// Rough size estimate, in minutes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<u32>,
    /// Kept visible even after reaching a terminal status.
    #[serde(default)]
    pub pinned: bool,
    /// Marks the issue as a reusable template rather than tracked work.
    #[serde(default)]
    pub is_template: bool,
    /// Identifier of this issue in an external system, for import
    /// deduplication.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub external_ref: Option<String>,
    /// Name of the external system `external_ref` belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_system: Option<String>,
    /// Content fingerprint computed at import time, for deduplication
    /// against issues without a matching `external_ref`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content_hash: Option<String>,
    /// Soft-deletion marker; set alongside `status = tombstone`.
    #[serde(default)]
    pub deleted: bool,
    /// Fields not recognised by this version of the model, preserved
    /// verbatim across load/store cycles.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl Issue {
    /// Validate the structural invariants: non-empty, bounded
    /// title.
    pub fn validate(&self) -> Result<()> {
        if self.title.is_empty() {
            return Err(Error::validation(ValidationKind::TitleEmpty));
        }
        if self.title.chars().count() > MAX_TITLE_LEN {
            return Err(Error::validation(ValidationKind::TitleTooLong));
        }
        Ok(())
    }

    /// Build the canonical content-hash input from this issue's current
    /// field values, for import deduplication.
    pub fn content_hash_fields(&self) -> ContentHashFields<'_> {
        ContentHashFields {
            title: &self.title,
            description: self.description.as_deref(),
            design: self.design.as_deref(),
            acceptance_criteria: self.acceptance_criteria.as_deref(),
            notes: self.notes.as_deref(),
            status: self.status.as_str(),
            priority: PRIORITY_STRINGS[self.priority.value() as usize],
            issue_type: self.issue_type.as_str(),
            assignee: self.assignee.as_deref(),
            owner: self.owner.as_deref(),
            created_by: self.created_by.as_deref(),
            external_ref: self.external_ref.as_deref(),
            source_system: self.source_system.as_deref(),
            pinned: if self.pinned { "true" } else { "false" },
            is_template: if self.is_template { "true" } else { "false" },
        }
    }

    /// Recompute and store `content_hash` from the issue's current
    /// fields.
    pub fn refresh_content_hash(&mut self) {
        let hash = ContentHash::compute(self.content_hash_fields());
        self.content_hash = Some(hash.as_str().to_owned());
    }
}

const PRIORITY_STRINGS: [&str; 5] = ["0", "1", "2", "3", "4"];

/// A sparse set of field updates applied to an existing [`Issue`] by
/// `store.update()`.
///
/// Every field is optional; `None` means "leave unchanged". Fields
/// whose domain includes a meaningful absent state (`description`,
/// `assignee`, ...) use a double `Option` so a patch can distinguish
/// "leave unchanged" from "clear this field".
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IssuePatch {
    /// New title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// New description, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<Option<String>>,
    /// New design notes, or `Some(None)` to clear them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub design: Option<Option<String>>,
    /// New acceptance criteria, or `Some(None)` to clear them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub acceptance_criteria: Option<Option<String>>,
    /// New notes, or `Some(None)` to clear them.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<Option<String>>,
    /// New classification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub issue_type: Option<IssueType>,
    /// New status.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<Status>,
    /// New priority.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<Priority>,
    /// New assignee, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assignee: Option<Option<String>>,
    /// New owner, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub owner: Option<Option<String>>,
    /// Replacement label set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<Vec<String>>,
    /// New defer time, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub defer_until: Option<Option<i64>>,
    /// New due time, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub due_at: Option<Option<i64>>,
    /// New size estimate, or `Some(None)` to clear it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_minutes: Option<Option<u32>>,
    /// New pinned flag.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pinned: Option<bool>,
}

impl IssuePatch {
    /// `true` if every field is unset, i.e. applying this patch would be
    /// a no-op.
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.design.is_none()
            && self.acceptance_criteria.is_none()
            && self.notes.is_none()
            && self.issue_type.is_none()
            && self.status.is_none()
            && self.priority.is_none()
            && self.assignee.is_none()
            && self.owner.is_none()
            && self.labels.is_none()
            && self.defer_until.is_none()
            && self.due_at.is_none()
            && self.estimated_minutes.is_none()
            && self.pinned.is_none()
    }
}

use serde::{Deserialize, Serialize};

/// The kind of change an [`Event`] records.
///
/// Unlike [`super::Status`] and friends this is a closed set: audit
/// entries are produced exclusively by the engine, never round-tripped
/// from user-supplied strings, so there is no `Custom` arm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    /// Issue created.
    Created,
    /// A field other than status/priority/assignee changed.
    Updated,
    /// Status transitioned.
    StatusChanged,
    /// Priority transitioned.
    PriorityChanged,
    /// Assignee transitioned.
    AssigneeChanged,
    /// A comment was appended.
    Commented,
    /// Issue was closed.
    Closed,
    /// Issue was reopened from a terminal state.
    Reopened,
    /// A dependency edge was added.
    DependencyAdded,
    /// A dependency edge was removed.
    DependencyRemoved,
    /// A label was attached.
    LabelAdded,
    /// A label was removed.
    LabelRemoved,
    /// A compaction rotated the WAL generation.
    Compacted,
    /// Issue was soft-deleted.
    Deleted,
    /// Issue was restored from tombstone.
    Restored,
}

/// A single append-only audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Event {
    /// Monotonically increasing id, assigned in the order the event log
    /// records it.
    pub id: u64,
    /// Issue the event is about.
    pub issue_id: String,
    /// What kind of change occurred.
    pub event_type: EventType,
    /// When it occurred (epoch seconds).
    pub created_at: i64,
    /// Who caused it, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub actor: Option<String>,
    /// Field name for `updated`/`status_changed`/`priority_changed`/
    /// `assignee_changed` events.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    /// Previous value, serialized as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub old_value: Option<serde_json::Value>,
    /// New value, serialized as JSON.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_value: Option<serde_json::Value>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn event_type_serializes_snake_case() {
        assert_eq!(
            serde_json::to_string(&EventType::DependencyAdded).unwrap(),
            "\"dependency_added\""
        );
        let back: EventType = serde_json::from_str("\"status_changed\"").unwrap();
        assert_eq!(back, EventType::StatusChanged);
    }

    #[test]
    fn full_event_type_set_round_trips() {
        for (variant, wire) in [
            (EventType::Created, "created"),
            (EventType::Updated, "updated"),
            (EventType::StatusChanged, "status_changed"),
            (EventType::PriorityChanged, "priority_changed"),
            (EventType::AssigneeChanged, "assignee_changed"),
            (EventType::Commented, "commented"),
            (EventType::Closed, "closed"),
            (EventType::Reopened, "reopened"),
            (EventType::DependencyAdded, "dependency_added"),
            (EventType::DependencyRemoved, "dependency_removed"),
            (EventType::LabelAdded, "label_added"),
            (EventType::LabelRemoved, "label_removed"),
            (EventType::Compacted, "compacted"),
            (EventType::Deleted, "deleted"),
            (EventType::Restored, "restored"),
        ] {
            assert_eq!(serde_json::to_string(&variant).unwrap(), format!("\"{wire}\""));
        }
    }
}

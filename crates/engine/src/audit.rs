//! Append-only audit log: every mutation recorded by
//! [`crate::context::CommandContext`] produces one or more [`Event`]
//! records here, queryable by issue id, actor, time window, or event
//! type.

use crate::store::FieldChange;
use beads_core::{Event, EventType, Issue};

/// In-memory, append-only, immutable-once-written event log.
///
/// Rebuilt from scratch on every [`crate::context::CommandContext::open`]
/// by replaying the WAL — there is no separate on-disk event store, so
/// history survives exactly as long as the WAL records it survive
/// compaction (see [`beads_storage::RetentionPolicy`]).
#[derive(Debug)]
pub struct AuditLog {
    events: Vec<Event>,
    next_id: u64,
}

impl Default for AuditLog {
    fn default() -> Self {
        AuditLog { events: Vec::new(), next_id: 1 }
    }
}

impl AuditLog {
    /// An empty log.
    pub fn new() -> Self {
        AuditLog::default()
    }

    /// Append events in order, assigning each the next monotonically
    /// increasing id. Never reorders or deduplicates: two
    /// otherwise-identical events from two separate mutations both
    /// survive. Callers pass `id: 0` in the literal they build; it is
    /// overwritten here.
    pub fn record(&mut self, events: impl IntoIterator<Item = Event>) {
        for mut event in events {
            event.id = self.next_id;
            self.next_id += 1;
            self.events.push(event);
        }
    }

    /// Every event, in the order recorded.
    pub fn all(&self) -> &[Event] {
        &self.events
    }

    /// Events about a specific issue, oldest first.
    pub fn for_issue<'a>(&'a self, issue_id: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events.iter().filter(move |e| e.issue_id == issue_id)
    }

    /// Events attributed to a specific actor.
    pub fn by_actor<'a>(&'a self, actor: &'a str) -> impl Iterator<Item = &'a Event> {
        self.events.iter().filter(move |e| e.actor.as_deref() == Some(actor))
    }

    /// Events of a specific type.
    pub fn of_type(&self, event_type: EventType) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| e.event_type == event_type)
    }

    /// Events with `created_at` inside `[after, before]`; either bound
    /// may be omitted.
    pub fn in_range(&self, after: Option<i64>, before: Option<i64>) -> impl Iterator<Item = &Event> {
        self.events.iter().filter(move |e| {
            after.map_or(true, |a| e.created_at >= a) && before.map_or(true, |b| e.created_at <= b)
        })
    }
}

/// Turn the field-level diff from [`crate::store::IssueStore::update`]
/// into one [`Event`] per changed field, picking the dedicated event
/// type for `status`/`priority`/`assignee` and falling back to
/// [`EventType::Updated`] for everything else.
pub fn events_from_changes(
    issue_id: &str,
    changes: &[FieldChange],
    now: i64,
    actor: Option<&str>,
) -> Vec<Event> {
    changes
        .iter()
        .map(|change| Event {
            id: 0,
            issue_id: issue_id.to_owned(),
            event_type: match change.field {
                "status" => EventType::StatusChanged,
                "priority" => EventType::PriorityChanged,
                "assignee" => EventType::AssigneeChanged,
                _ => EventType::Updated,
            },
            created_at: now,
            actor: actor.map(str::to_owned),
            field: Some(change.field.to_owned()),
            old_value: change.old.clone(),
            new_value: change.new.clone(),
        })
        .collect()
}

/// Reconstruct the events a WAL `add`/`update` record would have
/// produced at command time, given the issue's state immediately before
/// the record was applied (`None` for a brand new issue).
///
/// Unlike [`events_from_changes`] this works from two full [`Issue`]
/// snapshots rather than a patch, since that is all a replayed `add`/
/// `update` record carries. `status`/`priority`/`assignee` changes get
/// their dedicated event type; any other difference (detected via
/// `content_hash`) collapses into a single generic [`EventType::Updated`].
pub fn diff_for_replay(old: Option<&Issue>, new: &Issue, now: i64) -> Vec<Event> {
    let Some(old) = old else {
        return vec![Event {
            id: 0,
            issue_id: new.id.clone(),
            event_type: EventType::Created,
            created_at: now,
            actor: new.created_by.clone(),
            field: None,
            old_value: None,
            new_value: None,
        }];
    };

    let mut events = Vec::new();
    let actor = new.assignee.clone().or_else(|| new.created_by.clone());

    if old.status != new.status {
        events.push(Event {
            id: 0,
            issue_id: new.id.clone(),
            event_type: EventType::StatusChanged,
            created_at: now,
            actor: actor.clone(),
            field: Some("status".to_owned()),
            old_value: serde_json::to_value(&old.status).ok(),
            new_value: serde_json::to_value(&new.status).ok(),
        });
    }
    if old.priority != new.priority {
        events.push(Event {
            id: 0,
            issue_id: new.id.clone(),
            event_type: EventType::PriorityChanged,
            created_at: now,
            actor: actor.clone(),
            field: Some("priority".to_owned()),
            old_value: serde_json::to_value(old.priority).ok(),
            new_value: serde_json::to_value(new.priority).ok(),
        });
    }
    if old.assignee != new.assignee {
        events.push(Event {
            id: 0,
            issue_id: new.id.clone(),
            event_type: EventType::AssigneeChanged,
            created_at: now,
            actor: actor.clone(),
            field: Some("assignee".to_owned()),
            old_value: serde_json::to_value(&old.assignee).ok(),
            new_value: serde_json::to_value(&new.assignee).ok(),
        });
    }
    if old.content_hash != new.content_hash && old.status == new.status {
        events.push(Event {
            id: 0,
            issue_id: new.id.clone(),
            event_type: EventType::Updated,
            created_at: now,
            actor,
            field: None,
            old_value: None,
            new_value: None,
        });
    }
    events
}

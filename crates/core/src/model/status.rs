use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue lifecycle status.
///
/// Serialises as a plain JSON string: the tag name for known variants, or
/// the embedded string for [`Status::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Status {
    /// Newly created, not yet started.
    Open,
    /// Actively being worked.
    InProgress,
    /// Waiting on an outstanding dependency.
    Blocked,
    /// Deliberately postponed until `defer_until`.
    Deferred,
    /// Finished; `closed_at` is set.
    Closed,
    /// Soft-deleted; excluded from all queries except audit/history.
    Tombstone,
    /// Closed but kept visible (e.g. a template or reference issue).
    Pinned,
    /// Project-defined status outside the built-in set.
    Custom(String),
}

impl Status {
    /// The wire representation: the tag name, or the embedded string for
    /// `Custom`.
    pub fn as_str(&self) -> &str {
        match self {
            Status::Open => "open",
            Status::InProgress => "in_progress",
            Status::Blocked => "blocked",
            Status::Deferred => "deferred",
            Status::Closed => "closed",
            Status::Tombstone => "tombstone",
            Status::Pinned => "pinned",
            Status::Custom(s) => s,
        }
    }

    /// Parse the wire representation produced by [`Status::as_str`].
    pub fn parse(s: &str) -> Status {
        match s {
            "open" => Status::Open,
            "in_progress" => Status::InProgress,
            "blocked" => Status::Blocked,
            "deferred" => Status::Deferred,
            "closed" => Status::Closed,
            "tombstone" => Status::Tombstone,
            "pinned" => Status::Pinned,
            other => Status::Custom(other.to_owned()),
        }
    }

    /// `true` for [`Status::Open`] or [`Status::InProgress`] — the two
    /// statuses eligible for readiness/blocked computation.
    pub fn is_open(&self) -> bool {
        matches!(self, Status::Open | Status::InProgress)
    }

    /// `true` for [`Status::Closed`] or [`Status::Tombstone`] — the two
    /// statuses that satisfy an outstanding blocking dependency.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Closed | Status::Tombstone)
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Status {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Status {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(Status::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_known_and_custom() {
        for s in ["open", "in_progress", "blocked", "deferred", "closed", "tombstone", "pinned", "triaging"] {
            assert_eq!(Status::parse(s).as_str(), s);
        }
    }

    #[test]
    fn open_and_terminal_classification() {
        assert!(Status::Open.is_open());
        assert!(Status::InProgress.is_open());
        assert!(!Status::Blocked.is_open());
        assert!(Status::Closed.is_terminal());
        assert!(Status::Tombstone.is_terminal());
        assert!(!Status::Open.is_terminal());
    }
}

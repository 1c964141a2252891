use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of relationship a [`Dependency`] edge represents.
///
/// Serialises as a plain JSON string: the tag name, or the embedded
/// string for [`DependencyType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum DependencyType {
    /// The target must reach a terminal state before the source is ready.
    Blocks,
    /// The target is the parent of the source in a hierarchy.
    ParentChild,
    /// The target must reach a terminal state under some condition.
    ConditionalBlocks,
    /// The source waits on the target without a hard ordering guarantee.
    WaitsFor,
    /// Generic non-blocking relation.
    Related,
    /// The source was discovered while working the target.
    DiscoveredFrom,
    /// The source is a reply/comment thread on the target.
    RepliesTo,
    /// Loose cross-reference, non-blocking.
    RelatesTo,
    /// The source duplicates the target.
    Duplicates,
    /// The source supersedes the target.
    Supersedes,
    /// The source was caused by the target.
    CausedBy,
    /// Project-defined relation outside the built-in set.
    Custom(String),
}

impl DependencyType {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            DependencyType::Blocks => "blocks",
            DependencyType::ParentChild => "parent_child",
            DependencyType::ConditionalBlocks => "conditional_blocks",
            DependencyType::WaitsFor => "waits_for",
            DependencyType::Related => "related",
            DependencyType::DiscoveredFrom => "discovered_from",
            DependencyType::RepliesTo => "replies_to",
            DependencyType::RelatesTo => "relates_to",
            DependencyType::Duplicates => "duplicates",
            DependencyType::Supersedes => "supersedes",
            DependencyType::CausedBy => "caused_by",
            DependencyType::Custom(s) => s,
        }
    }

    /// Parse the wire representation.
    pub fn parse(s: &str) -> DependencyType {
        match s {
            "blocks" => DependencyType::Blocks,
            "parent_child" => DependencyType::ParentChild,
            "conditional_blocks" => DependencyType::ConditionalBlocks,
            "waits_for" => DependencyType::WaitsFor,
            "related" => DependencyType::Related,
            "discovered_from" => DependencyType::DiscoveredFrom,
            "replies_to" => DependencyType::RepliesTo,
            "relates_to" => DependencyType::RelatesTo,
            "duplicates" => DependencyType::Duplicates,
            "supersedes" => DependencyType::Supersedes,
            "caused_by" => DependencyType::CausedBy,
            other => DependencyType::Custom(other.to_owned()),
        }
    }

    /// `true` for the two types whose subgraph must stay acyclic
    /// (acyclicity is enforced only across this subset).
    pub fn participates_in_cycle_check(&self) -> bool {
        matches!(self, DependencyType::Blocks | DependencyType::ParentChild)
    }

    /// `true` for the four types that count as "outstanding" when their
    /// target has not reached a terminal state (resolved
    /// `waits_for` question).
    pub fn is_blocking(&self) -> bool {
        matches!(
            self,
            DependencyType::Blocks
                | DependencyType::ParentChild
                | DependencyType::ConditionalBlocks
                | DependencyType::WaitsFor
        )
    }
}

impl fmt::Display for DependencyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for DependencyType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for DependencyType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(DependencyType::parse(&s))
    }
}

/// A directed edge `issue_id -> depends_on_id`: `issue_id` depends on
/// `depends_on_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    /// The dependent issue.
    pub issue_id: String,
    /// The issue depended upon.
    pub depends_on_id: String,
    /// The relationship kind.
    pub dep_type: DependencyType,
    /// When the edge was created (epoch seconds).
    pub created_at: i64,
    /// Who created the edge, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<String>,
    /// Free-form edge metadata.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Value>,
    /// Groups `replies_to` edges into a comment thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blocking_classification() {
        assert!(DependencyType::Blocks.is_blocking());
        assert!(DependencyType::ParentChild.is_blocking());
        assert!(DependencyType::ConditionalBlocks.is_blocking());
        assert!(DependencyType::WaitsFor.is_blocking());
        assert!(!DependencyType::Related.is_blocking());
        assert!(!DependencyType::Duplicates.is_blocking());
    }

    #[test]
    fn cycle_check_classification() {
        assert!(DependencyType::Blocks.participates_in_cycle_check());
        assert!(DependencyType::ParentChild.participates_in_cycle_check());
        assert!(!DependencyType::WaitsFor.participates_in_cycle_check());
    }
}

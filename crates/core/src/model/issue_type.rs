use serde::{Deserialize, Serialize};
use std::fmt;

/// Issue classification. Serialises as a plain JSON string, the tag
/// name or the embedded string for [`IssueType::Custom`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IssueType {
    /// General work item.
    Task,
    /// Defect.
    Bug,
    /// New capability.
    Feature,
    /// Container for related issues.
    Epic,
    /// Maintenance work.
    Chore,
    /// Documentation work.
    Docs,
    /// Open question requiring a decision.
    Question,
    /// Project-defined type outside the built-in set.
    Custom(String),
}

impl IssueType {
    /// The wire representation.
    pub fn as_str(&self) -> &str {
        match self {
            IssueType::Task => "task",
            IssueType::Bug => "bug",
            IssueType::Feature => "feature",
            IssueType::Epic => "epic",
            IssueType::Chore => "chore",
            IssueType::Docs => "docs",
            IssueType::Question => "question",
            IssueType::Custom(s) => s,
        }
    }

    /// Parse the wire representation.
    pub fn parse(s: &str) -> IssueType {
        match s {
            "task" => IssueType::Task,
            "bug" => IssueType::Bug,
            "feature" => IssueType::Feature,
            "epic" => IssueType::Epic,
            "chore" => IssueType::Chore,
            "docs" => IssueType::Docs,
            "question" => IssueType::Question,
            other => IssueType::Custom(other.to_owned()),
        }
    }
}

impl fmt::Display for IssueType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for IssueType {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for IssueType {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        Ok(IssueType::parse(&s))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn roundtrips_known_and_custom() {
        for s in ["task", "bug", "feature", "epic", "chore", "docs", "question", "spike"] {
            assert_eq!(IssueType::parse(s).as_str(), s);
        }
    }
}

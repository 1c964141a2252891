use serde::{Deserialize, Serialize};

/// A timestamped note attached to an issue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    /// Identifier, unique within the owning issue.
    pub id: String,
    /// Author, if known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    /// Comment body, plain text or markdown.
    pub body: String,
    /// Creation time (epoch seconds).
    pub created_at: i64,
    /// Links this comment to a `replies_to` dependency thread.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub thread_id: Option<String>,
}

//! The issue tracker's data model.

mod comment;
mod dependency;
mod event;
mod issue;
mod issue_type;
mod priority;
mod status;

pub use comment::Comment;
pub use dependency::{Dependency, DependencyType};
pub use event::{Event, EventType};
pub use issue::{Issue, IssuePatch};
pub use issue_type::IssueType;
pub use priority::Priority;
pub use status::Status;

//! # beads
//!
//! A local-first issue tracker core: content-addressed identity, a
//! write-ahead-logged storage engine, and an in-memory issue store with
//! dependency-graph queries.
//!
//! This crate is a thin facade over three internal crates:
//! - `beads-core` — the data model, id generation, content hashing
//! - `beads-storage` — WAL, snapshot, lock, and compactor
//! - `beads-engine` — the indexed issue store, dependency graph, audit
//!   log, import, and [`Repository`], the single entry point below
//!
//! # Quick start
//!
//! ```no_run
//! use beads::{NewIssue, Repository};
//!
//! fn main() -> beads::Result<()> {
//!     let mut repo = Repository::open("./my-issues", "bd")?;
//!
//!     let issue = repo.create_issue(
//!         NewIssue { title: "Fix the thing".into(), ..Default::default() },
//!         1_700_000_000,
//!     )?;
//!
//!     repo.add_label(&issue.id, "urgent", 1_700_000_001)?;
//!
//!     for ready in repo.issues().ready_issues(1_700_000_001) {
//!         println!("{}: {}", ready.id, ready.title);
//!     }
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub use beads_core::{
    Comment, Dependency, DependencyType, Event, EventType, Id, Issue, IssuePatch, IssueType,
    Priority, Status,
};
pub use beads_engine::{
    import, AuditLog, CommandContext as Repository, ImportOutcome, IssueFilter, IssueStore, NewIssue,
};
pub use beads_storage::{CompactionReport, RetentionPolicy};

pub use error::{Error, Result};

mod error;

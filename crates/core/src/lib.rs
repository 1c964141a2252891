//! Data model, identity, and hashing primitives for beads.
//!
//! This crate has no knowledge of disk layout or concurrency — it defines
//! the shapes that flow through the storage and engine layers:
//! - [`Issue`], [`Dependency`], [`Comment`], [`Event`] and their enums
//! - RFC3339 timestamp codec ([`timestamp`])
//! - base36 codec used by ids ([`base36`])
//! - adaptive-length content-addressed id generation ([`identity`])
//! - the crate-wide [`Error`] hierarchy

#![warn(missing_docs)]

pub mod base36;
pub mod error;
pub mod identity;
pub mod model;
pub mod timestamp;

pub use error::{Error, Result, ValidationKind};
pub use identity::{ContentHash, Id, IdentityGenerator};
pub use model::{
    Comment, Dependency, DependencyType, Event, EventType, Issue, IssuePatch, IssueType,
    Priority, Status,
};

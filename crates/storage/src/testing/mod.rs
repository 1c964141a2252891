//! Test-only utilities for exercising WAL corruption and replay recovery.
//! Public (not `cfg(test)`) so integration tests in this crate and in
//! `beads-engine` can reuse them.

pub mod corruption;
pub mod reference_model;
#[cfg(any(test, feature = "test-util"))]
pub mod strategies;

pub use corruption::WalCorruptionTester;
pub use reference_model::ReferenceModel;

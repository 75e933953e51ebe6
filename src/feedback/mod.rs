//! Expert feedback learning.
//!
//! Experts correct AI-produced graphs; the diff between the two versions
//! becomes an append-only stream of delta records. Deltas feed two loops:
//! additive per-reviewer statistics, and reuse of validated relation
//! patterns on future documents.

pub mod diff;
pub mod learn;
pub mod reuse;
pub mod sqlite;
pub mod store;

pub use learn::{ComparisonOutcome, FeedbackEngine};
pub use sqlite::SqliteDeltaStore;
pub use store::{DeltaStore, MemoryDeltaStore, StoreError};

use thiserror::Error;

#[derive(Error, Debug)]
pub enum FeedbackError {
    #[error("invalid rating {0}, expected 1 through 5")]
    InvalidRating(u8),

    #[error(transparent)]
    Store(#[from] StoreError),
}

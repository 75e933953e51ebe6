//! Delta persistence contract and the in-memory implementation.
//!
//! Deltas are append-only: once written, only `rating` and `reuse_count`
//! may change. Stats rows are additive aggregates keyed by
//! `(reviewer, category, period)`.

use std::sync::Mutex;

use thiserror::Error;
use uuid::Uuid;

use crate::models::{DeltaRecord, DeltaType, LearningStats};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("delta {0} not found")]
    NotFound(Uuid),

    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("corrupt record: {0}")]
    Corrupt(String),
}

/// Storage backend for delta records and learning statistics.
pub trait DeltaStore: Send + Sync {
    fn append(&self, delta: &DeltaRecord) -> Result<(), StoreError>;

    fn get(&self, id: Uuid) -> Result<Option<DeltaRecord>, StoreError>;

    fn by_session(&self, session_id: Uuid) -> Result<Vec<DeltaRecord>, StoreError>;

    /// Set the expert rating (validated by the caller).
    fn set_rating(&self, id: Uuid, rating: u8) -> Result<(), StoreError>;

    fn increment_reuse(&self, id: Uuid) -> Result<(), StoreError>;

    /// Relation-added deltas eligible for reuse, best first: unrated or
    /// rated 3+, ordered by reuse count then recency.
    fn relation_candidates(&self, limit: usize) -> Result<Vec<DeltaRecord>, StoreError>;

    /// Add the counters onto the `(reviewer, category, period)` row,
    /// creating it if absent.
    fn add_stats(&self, stats: &LearningStats) -> Result<(), StoreError>;

    fn stats(&self, reviewer: &str) -> Result<Vec<LearningStats>, StoreError>;
}

/// Mutex-guarded in-memory store for tests and ephemeral sessions.
#[derive(Default)]
pub struct MemoryDeltaStore {
    deltas: Mutex<Vec<DeltaRecord>>,
    stats: Mutex<Vec<LearningStats>>,
}

impl MemoryDeltaStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn eligible_candidate(delta: &DeltaRecord) -> bool {
    delta.delta_type == DeltaType::RelationAdded && delta.rating.map_or(true, |r| r >= 3)
}

impl DeltaStore for MemoryDeltaStore {
    fn append(&self, delta: &DeltaRecord) -> Result<(), StoreError> {
        self.deltas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(delta.clone());
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<DeltaRecord>, StoreError> {
        Ok(self
            .deltas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .find(|d| d.id == id)
            .cloned())
    }

    fn by_session(&self, session_id: Uuid) -> Result<Vec<DeltaRecord>, StoreError> {
        Ok(self
            .deltas
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|d| d.session_id == session_id)
            .cloned()
            .collect())
    }

    fn set_rating(&self, id: Uuid, rating: u8) -> Result<(), StoreError> {
        let mut deltas = self.deltas.lock().unwrap_or_else(|e| e.into_inner());
        let delta = deltas
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound(id))?;
        delta.rating = Some(rating);
        Ok(())
    }

    fn increment_reuse(&self, id: Uuid) -> Result<(), StoreError> {
        let mut deltas = self.deltas.lock().unwrap_or_else(|e| e.into_inner());
        let delta = deltas
            .iter_mut()
            .find(|d| d.id == id)
            .ok_or(StoreError::NotFound(id))?;
        delta.reuse_count += 1;
        Ok(())
    }

    fn relation_candidates(&self, limit: usize) -> Result<Vec<DeltaRecord>, StoreError> {
        let deltas = self.deltas.lock().unwrap_or_else(|e| e.into_inner());
        let mut candidates: Vec<DeltaRecord> = deltas
            .iter()
            .filter(|d| eligible_candidate(d))
            .cloned()
            .collect();
        candidates.sort_by(|a, b| {
            b.reuse_count
                .cmp(&a.reuse_count)
                .then(b.created_at.cmp(&a.created_at))
        });
        candidates.truncate(limit);
        Ok(candidates)
    }

    fn add_stats(&self, stats: &LearningStats) -> Result<(), StoreError> {
        let mut rows = self.stats.lock().unwrap_or_else(|e| e.into_inner());
        match rows.iter_mut().find(|r| {
            r.reviewer == stats.reviewer && r.category == stats.category && r.period == stats.period
        }) {
            Some(row) => {
                row.total_corrections += stats.total_corrections;
                row.relations_improved += stats.relations_improved;
                row.qa_improved += stats.qa_improved;
            }
            None => rows.push(stats.clone()),
        }
        Ok(())
    }

    fn stats(&self, reviewer: &str) -> Result<Vec<LearningStats>, StoreError> {
        Ok(self
            .stats
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| r.reviewer == reviewer)
            .cloned()
            .collect())
    }
}

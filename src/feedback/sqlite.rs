//! SQLite-backed delta store.

use std::path::Path;
use std::sync::Mutex;

use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{params, Connection, OptionalExtension, Row};
use serde_json::Value;
use uuid::Uuid;

use crate::models::{DeltaRecord, DeltaType, LearningStats};

use super::store::{DeltaStore, StoreError};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS deltas (
    id TEXT PRIMARY KEY,
    document_ref TEXT NOT NULL,
    reviewer TEXT NOT NULL,
    session_id TEXT NOT NULL,
    delta_type TEXT NOT NULL,
    ai_version TEXT NOT NULL,
    expert_version TEXT NOT NULL,
    confidence_before REAL NOT NULL,
    rating INTEGER,
    reuse_count INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_deltas_session ON deltas(session_id);
CREATE INDEX IF NOT EXISTS idx_deltas_type ON deltas(delta_type);

CREATE TABLE IF NOT EXISTS learning_stats (
    reviewer TEXT NOT NULL,
    category TEXT NOT NULL,
    period TEXT NOT NULL,
    total_corrections INTEGER NOT NULL DEFAULT 0,
    relations_improved INTEGER NOT NULL DEFAULT 0,
    qa_improved INTEGER NOT NULL DEFAULT 0,
    PRIMARY KEY (reviewer, category, period)
);
";

const DELTA_COLUMNS: &str = "id, document_ref, reviewer, session_id, delta_type, \
     ai_version, expert_version, confidence_before, rating, reuse_count, created_at";

/// Durable store over a single SQLite connection. The connection is
/// mutex-guarded; the write volume here is one burst per review session.
pub struct SqliteDeltaStore {
    conn: Mutex<Connection>,
}

impl SqliteDeltaStore {
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        Self::from_connection(Connection::open(path)?)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(|e| e.into_inner())
    }
}

fn delta_from_row(row: &Row<'_>) -> Result<DeltaRecord, StoreError> {
    let id: String = row.get(0)?;
    let session_id: String = row.get(3)?;
    let delta_type: String = row.get(4)?;
    let ai_version: String = row.get(5)?;
    let expert_version: String = row.get(6)?;
    let created_at: String = row.get(10)?;

    Ok(DeltaRecord {
        id: Uuid::parse_str(&id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        document_ref: row.get(1)?,
        reviewer: row.get(2)?,
        session_id: Uuid::parse_str(&session_id).map_err(|e| StoreError::Corrupt(e.to_string()))?,
        delta_type: DeltaType::parse(&delta_type)
            .ok_or_else(|| StoreError::Corrupt(format!("unknown delta type {delta_type}")))?,
        ai_version: serde_json::from_str::<Value>(&ai_version)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        expert_version: serde_json::from_str::<Value>(&expert_version)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?,
        confidence_before: row.get(7)?,
        rating: row.get::<_, Option<u8>>(8)?,
        reuse_count: row.get(9)?,
        created_at: DateTime::parse_from_rfc3339(&created_at)
            .map_err(|e| StoreError::Corrupt(e.to_string()))?
            .with_timezone(&Utc),
    })
}

impl DeltaStore for SqliteDeltaStore {
    fn append(&self, delta: &DeltaRecord) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT INTO deltas (id, document_ref, reviewer, session_id, delta_type,
             ai_version, expert_version, confidence_before, rating, reuse_count, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                delta.id.to_string(),
                delta.document_ref,
                delta.reviewer,
                delta.session_id.to_string(),
                delta.delta_type.as_str(),
                delta.ai_version.to_string(),
                delta.expert_version.to_string(),
                delta.confidence_before,
                delta.rating,
                delta.reuse_count,
                delta.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    fn get(&self, id: Uuid) -> Result<Option<DeltaRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!("SELECT {DELTA_COLUMNS} FROM deltas WHERE id = ?1"))?;
        let row = stmt
            .query_row(params![id.to_string()], |row| {
                Ok(delta_from_row(row))
            })
            .optional()?;
        row.transpose()
    }

    fn by_session(&self, session_id: Uuid) -> Result<Vec<DeltaRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DELTA_COLUMNS} FROM deltas WHERE session_id = ?1 ORDER BY created_at"
        ))?;
        let rows = stmt.query_map(params![session_id.to_string()], |row| Ok(delta_from_row(row)))?;

        let mut deltas = Vec::new();
        for row in rows {
            deltas.push(row??);
        }
        Ok(deltas)
    }

    fn set_rating(&self, id: Uuid, rating: u8) -> Result<(), StoreError> {
        let changed = self.lock().execute(
            "UPDATE deltas SET rating = ?2 WHERE id = ?1",
            params![id.to_string(), rating],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn increment_reuse(&self, id: Uuid) -> Result<(), StoreError> {
        let changed = self.lock().execute(
            "UPDATE deltas SET reuse_count = reuse_count + 1 WHERE id = ?1",
            params![id.to_string()],
        )?;
        if changed == 0 {
            return Err(StoreError::NotFound(id));
        }
        Ok(())
    }

    fn relation_candidates(&self, limit: usize) -> Result<Vec<DeltaRecord>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(&format!(
            "SELECT {DELTA_COLUMNS} FROM deltas
             WHERE delta_type = 'relation_added' AND (rating IS NULL OR rating >= 3)
             ORDER BY reuse_count DESC, created_at DESC
             LIMIT ?1"
        ))?;
        let rows = stmt.query_map(params![limit as i64], |row| Ok(delta_from_row(row)))?;

        let mut deltas = Vec::new();
        for row in rows {
            deltas.push(row??);
        }
        Ok(deltas)
    }

    fn add_stats(&self, stats: &LearningStats) -> Result<(), StoreError> {
        self.lock().execute(
            "INSERT INTO learning_stats
             (reviewer, category, period, total_corrections, relations_improved, qa_improved)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)
             ON CONFLICT(reviewer, category, period) DO UPDATE SET
                 total_corrections = total_corrections + excluded.total_corrections,
                 relations_improved = relations_improved + excluded.relations_improved,
                 qa_improved = qa_improved + excluded.qa_improved",
            params![
                stats.reviewer,
                stats.category,
                stats.period.to_string(),
                stats.total_corrections,
                stats.relations_improved,
                stats.qa_improved,
            ],
        )?;
        Ok(())
    }

    fn stats(&self, reviewer: &str) -> Result<Vec<LearningStats>, StoreError> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT reviewer, category, period, total_corrections, relations_improved, qa_improved
             FROM learning_stats WHERE reviewer = ?1 ORDER BY period DESC, category",
        )?;
        let rows = stmt.query_map(params![reviewer], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, u32>(3)?,
                row.get::<_, u32>(4)?,
                row.get::<_, u32>(5)?,
            ))
        })?;

        let mut out = Vec::new();
        for row in rows {
            let (reviewer, category, period, total, relations, qa) = row?;
            out.push(LearningStats {
                reviewer,
                category,
                period: NaiveDate::parse_from_str(&period, "%Y-%m-%d")
                    .map_err(|e| StoreError::Corrupt(e.to_string()))?,
                total_corrections: total,
                relations_improved: relations,
                qa_improved: qa,
            });
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use serde_json::json;

    fn delta(delta_type: DeltaType, session_id: Uuid, created_at: DateTime<Utc>) -> DeltaRecord {
        DeltaRecord {
            id: Uuid::new_v4(),
            document_ref: "doc-1".into(),
            reviewer: "alice".into(),
            session_id,
            delta_type,
            ai_version: Value::Null,
            expert_version: json!({"type": "approved_by"}),
            confidence_before: 0.7,
            rating: None,
            reuse_count: 0,
            created_at,
        }
    }

    #[test]
    fn append_and_get_round_trip_all_fields() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let d = delta(DeltaType::QaCorrected, Uuid::new_v4(), Utc::now());
        store.append(&d).unwrap();

        let fetched = store.get(d.id).unwrap().unwrap();
        assert_eq!(fetched.id, d.id);
        assert_eq!(fetched.session_id, d.session_id);
        assert_eq!(fetched.delta_type, DeltaType::QaCorrected);
        assert_eq!(fetched.expert_version, d.expert_version);
        assert_eq!(fetched.confidence_before, 0.7);
        assert_eq!(fetched.rating, None);
        assert_eq!(fetched.created_at.to_rfc3339(), d.created_at.to_rfc3339());
    }

    #[test]
    fn get_missing_is_none() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        assert!(store.get(Uuid::new_v4()).unwrap().is_none());
    }

    #[test]
    fn rating_and_reuse_are_the_only_mutations() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let d = delta(DeltaType::RelationAdded, Uuid::new_v4(), Utc::now());
        store.append(&d).unwrap();

        store.set_rating(d.id, 4).unwrap();
        store.increment_reuse(d.id).unwrap();
        store.increment_reuse(d.id).unwrap();

        let fetched = store.get(d.id).unwrap().unwrap();
        assert_eq!(fetched.rating, Some(4));
        assert_eq!(fetched.reuse_count, 2);
        assert_eq!(fetched.expert_version, d.expert_version);
    }

    #[test]
    fn set_rating_on_missing_delta_fails() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        assert!(matches!(
            store.set_rating(Uuid::new_v4(), 3),
            Err(StoreError::NotFound(_))
        ));
    }

    #[test]
    fn candidates_filter_and_order() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let session = Uuid::new_v4();
        let now = Utc::now();

        let older = delta(DeltaType::RelationAdded, session, now - Duration::hours(2));
        let newer = delta(DeltaType::RelationAdded, session, now);
        let rejected = delta(DeltaType::RelationAdded, session, now);
        let unrelated = delta(DeltaType::QaAdded, session, now);
        for d in [&older, &newer, &rejected, &unrelated] {
            store.append(d).unwrap();
        }
        store.set_rating(rejected.id, 1).unwrap();
        store.increment_reuse(older.id).unwrap();

        let candidates = store.relation_candidates(10).unwrap();
        let ids: Vec<Uuid> = candidates.iter().map(|c| c.id).collect();
        // Reuse count outranks recency; rejected and non-relation rows absent.
        assert_eq!(ids, vec![older.id, newer.id]);
    }

    #[test]
    fn candidate_limit_is_applied() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let session = Uuid::new_v4();
        for _ in 0..5 {
            store
                .append(&delta(DeltaType::RelationAdded, session, Utc::now()))
                .unwrap();
        }
        assert_eq!(store.relation_candidates(3).unwrap().len(), 3);
    }

    #[test]
    fn stats_upsert_is_additive() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let row = LearningStats {
            reviewer: "alice".into(),
            category: "smpc".into(),
            period: Utc::now().date_naive(),
            total_corrections: 3,
            relations_improved: 2,
            qa_improved: 1,
        };
        store.add_stats(&row).unwrap();
        store.add_stats(&row).unwrap();

        let rows = store.stats("alice").unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].total_corrections, 6);
        assert_eq!(rows[0].relations_improved, 4);
        assert_eq!(rows[0].qa_improved, 2);
    }

    #[test]
    fn stats_are_scoped_per_reviewer() {
        let store = SqliteDeltaStore::open_in_memory().unwrap();
        let mut row = LearningStats {
            reviewer: "alice".into(),
            category: "general".into(),
            period: Utc::now().date_naive(),
            total_corrections: 1,
            relations_improved: 0,
            qa_improved: 0,
        };
        store.add_stats(&row).unwrap();
        row.reviewer = "bob".into();
        store.add_stats(&row).unwrap();

        assert_eq!(store.stats("alice").unwrap().len(), 1);
        assert_eq!(store.stats("bob").unwrap().len(), 1);
        assert!(store.stats("carol").unwrap().is_empty());
    }

    #[test]
    fn file_backed_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("deltas.db");
        let d = delta(DeltaType::RelationAdded, Uuid::new_v4(), Utc::now());

        {
            let store = SqliteDeltaStore::open(&path).unwrap();
            store.append(&d).unwrap();
        }
        let reopened = SqliteDeltaStore::open(&path).unwrap();
        assert!(reopened.get(d.id).unwrap().is_some());
    }
}

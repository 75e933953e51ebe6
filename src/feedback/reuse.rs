//! Reuse of validated relation patterns on new documents.
//!
//! A `relation_added` delta whose rating has not been rejected is a
//! pattern: "documents with these entity types tend to carry this
//! relation". Applying a pattern only ever appends; nothing already in the
//! graph is touched.

use crate::enrich::describe;
use crate::models::{DeltaRecord, EntityRef, RelationRecord, SemanticGraph};

use super::store::{DeltaStore, StoreError};

/// Confidence for relations synthesized from learned patterns.
const LEARNED_CONFIDENCE: f64 = 0.7;

/// Apply up to `limit` ranked patterns to `graph`.
///
/// Each pattern applies when the graph has entities of both endpoint
/// types; the synthesized relation uses the graph's own primary entities,
/// not the values from the original document. Returns the enhanced graph
/// and the number of patterns that applied.
pub fn enhance_with_learned_patterns(
    graph: &SemanticGraph,
    store: &dyn DeltaStore,
    limit: usize,
) -> Result<(SemanticGraph, usize), StoreError> {
    let mut enhanced = graph.clone();
    let mut applied = 0;

    for candidate in store.relation_candidates(limit)? {
        let Some(pattern) = pattern_from(&candidate) else {
            tracing::debug!(delta_id = %candidate.id, "skipping candidate without a relation payload");
            continue;
        };

        let Some(source) = enhanced.first_entity(&pattern.source.entity_type) else {
            continue;
        };
        let Some(target) = enhanced.first_entity(&pattern.target.entity_type) else {
            continue;
        };

        let mut learned = RelationRecord::new(
            &pattern.kind,
            EntityRef::new(&pattern.source.entity_type, &source.value),
            EntityRef::new(&pattern.target.entity_type, &target.value),
            "learned",
        );
        learned.confidence = LEARNED_CONFIDENCE;
        learned.description = Some(describe::template(&learned));

        if enhanced.add_relation(learned) {
            store.increment_reuse(candidate.id)?;
            applied += 1;
        }
    }

    if applied > 0 {
        tracing::info!(applied, "learned patterns applied");
    }
    Ok((enhanced, applied))
}

fn pattern_from(delta: &DeltaRecord) -> Option<RelationRecord> {
    serde_json::from_value(delta.expert_version.clone()).ok()
}

//! Fusion: the deduplicating merge combining partial graphs.
//!
//! Invariants enforced here:
//! - entities union per type by normalized key, first occurrence wins on
//!   property conflicts, first-seen order preserved;
//! - relations union by `(type, source, target)` identity;
//! - Q&A union by normalized `(question, answer)`;
//! - scalar fields fill-if-empty only, authored content is never
//!   overwritten.
//!
//! Fusing a graph into itself is a no-op (idempotence), and fusing
//! disjoint corrections in either order yields the same set
//! (commutativity). Re-running enrichment concurrently is therefore safe
//! to retry.

use crate::models::{RelationRecord, SemanticGraph};

/// Merge `overlay` into `target`.
pub fn fuse(target: &mut SemanticGraph, overlay: &SemanticGraph) {
    for (entity_type, group) in &overlay.entities {
        for item in &group.items {
            target.add_entity(entity_type, item.clone());
        }
    }

    fuse_relations(target, &overlay.relations);

    for qa in &overlay.questions_answers {
        target.add_qa(qa.clone());
    }

    if target.document.is_none() {
        target.document = overlay.document.clone();
    }
    if target.semantic_summary.as_deref().unwrap_or("").is_empty() {
        target.semantic_summary = overlay.semantic_summary.clone();
    }
    if target.tech_hints.suggested_schema.is_none() {
        target.tech_hints.suggested_schema = overlay.tech_hints.suggested_schema.clone();
    }
    for (key, value) in &overlay.metadata {
        target.metadata.entry(key.clone()).or_insert(value.clone());
    }
    for (key, value) in &overlay.contexts {
        target.contexts.entry(key.clone()).or_insert(value.clone());
    }
}

/// Merge relations by identity. A duplicate never replaces the existing
/// record, but it may donate its description when the kept one is empty.
pub fn fuse_relations(target: &mut SemanticGraph, relations: &[RelationRecord]) {
    for relation in relations {
        let key = relation.identity();
        if let Some(existing) = target.relations.iter_mut().find(|r| r.identity() == key) {
            if !existing.has_description() && relation.has_description() {
                existing.description = relation.description.clone();
            }
        } else {
            target.relations.push(relation.clone());
        }
    }
}

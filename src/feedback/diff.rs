//! Diffing an AI graph against its expert-corrected version.
//!
//! The diff is the only producer of delta records. Relations compare by
//! identity, entities per type by normalized value set, Q&A by normalized
//! question with a character-similarity gate on the answers.

use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::models::{normalize_key, DeltaType, QaRecord, SemanticGraph};
use crate::similarity::char_similarity;

/// One discrepancy found by the diff, before it gets a storage identity.
#[derive(Debug, Clone)]
pub struct DeltaSeed {
    pub delta_type: DeltaType,
    pub ai_version: Value,
    pub expert_version: Value,
    pub confidence_before: f64,
}

/// All discrepancies between the AI graph and the expert's version.
///
/// `correction_threshold` is the character-similarity level below which a
/// matched answer counts as corrected rather than reworded.
pub fn diff(
    ai: &SemanticGraph,
    expert: &SemanticGraph,
    correction_threshold: f64,
) -> Vec<DeltaSeed> {
    let mut seeds = Vec::new();
    diff_relations(ai, expert, &mut seeds);
    diff_entities(ai, expert, &mut seeds);
    diff_qa(ai, expert, correction_threshold, &mut seeds);
    seeds
}

fn diff_relations(ai: &SemanticGraph, expert: &SemanticGraph, seeds: &mut Vec<DeltaSeed>) {
    let ai_by_identity: BTreeMap<String, &crate::models::RelationRecord> =
        ai.relations.iter().map(|r| (r.identity(), r)).collect();
    let expert_by_identity: BTreeMap<String, &crate::models::RelationRecord> =
        expert.relations.iter().map(|r| (r.identity(), r)).collect();

    for relation in &expert.relations {
        match ai_by_identity.get(&relation.identity()) {
            None => seeds.push(DeltaSeed {
                delta_type: DeltaType::RelationAdded,
                ai_version: Value::Null,
                expert_version: json!(relation),
                confidence_before: 0.0,
            }),
            Some(original) if original.description != relation.description => {
                seeds.push(DeltaSeed {
                    delta_type: DeltaType::RelationModified,
                    ai_version: json!(original),
                    expert_version: json!(relation),
                    confidence_before: original.confidence,
                });
            }
            Some(_) => {}
        }
    }

    for relation in &ai.relations {
        if !expert_by_identity.contains_key(&relation.identity()) {
            seeds.push(DeltaSeed {
                delta_type: DeltaType::RelationRemoved,
                ai_version: json!(relation),
                expert_version: Value::Null,
                confidence_before: relation.confidence,
            });
        }
    }
}

/// Per entity type, symmetric set difference of normalized values.
/// Expert-introduced values emit one `entity_added` delta for the type,
/// expert-removed values one `entity_modified` delta.
fn diff_entities(ai: &SemanticGraph, expert: &SemanticGraph, seeds: &mut Vec<DeltaSeed>) {
    let mut types: Vec<&String> = ai.entities.keys().chain(expert.entities.keys()).collect();
    types.sort();
    types.dedup();

    for entity_type in types {
        let ai_items = ai
            .entities
            .get(entity_type)
            .map(|g| g.items.as_slice())
            .unwrap_or_default();
        let expert_items = expert
            .entities
            .get(entity_type)
            .map(|g| g.items.as_slice())
            .unwrap_or_default();

        let introduced: Vec<&str> = expert_items
            .iter()
            .filter(|item| {
                !ai_items
                    .iter()
                    .any(|a| a.normalized_value == item.normalized_value)
            })
            .map(|item| item.value.as_str())
            .collect();
        let removed: Vec<&crate::models::EntityItem> = ai_items
            .iter()
            .filter(|item| {
                !expert_items
                    .iter()
                    .any(|e| e.normalized_value == item.normalized_value)
            })
            .collect();

        if !introduced.is_empty() {
            seeds.push(DeltaSeed {
                delta_type: DeltaType::EntityAdded,
                ai_version: Value::Null,
                expert_version: json!({ "type": entity_type, "values": introduced }),
                confidence_before: 0.0,
            });
        }
        if !removed.is_empty() {
            let mean_confidence =
                removed.iter().map(|i| i.confidence).sum::<f64>() / removed.len() as f64;
            let removed_values: Vec<&str> = removed.iter().map(|i| i.value.as_str()).collect();
            let expert_values: Vec<&str> = expert_items.iter().map(|i| i.value.as_str()).collect();
            seeds.push(DeltaSeed {
                delta_type: DeltaType::EntityModified,
                ai_version: json!({ "type": entity_type, "values": removed_values }),
                expert_version: json!({ "type": entity_type, "values": expert_values }),
                confidence_before: mean_confidence,
            });
        }
    }
}

fn diff_qa(
    ai: &SemanticGraph,
    expert: &SemanticGraph,
    correction_threshold: f64,
    seeds: &mut Vec<DeltaSeed>,
) {
    let ai_by_question: BTreeMap<String, &QaRecord> = ai
        .questions_answers
        .iter()
        .map(|qa| (normalize_key(&qa.question), qa))
        .collect();

    for qa in &expert.questions_answers {
        match ai_by_question.get(&normalize_key(&qa.question)) {
            None => seeds.push(DeltaSeed {
                delta_type: DeltaType::QaAdded,
                ai_version: Value::Null,
                expert_version: json!(qa),
                confidence_before: 0.0,
            }),
            Some(original) => {
                if char_similarity(&original.answer, &qa.answer) < correction_threshold {
                    seeds.push(DeltaSeed {
                        delta_type: DeltaType::QaCorrected,
                        ai_version: json!(original),
                        expert_version: json!(qa),
                        confidence_before: original.confidence,
                    });
                }
            }
        }
    }
}

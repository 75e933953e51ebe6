//! Fixed deterministic relation rules.
//!
//! Each rule links the primary entity of the source type to every entity
//! of the target type. Rules fire only when both groups are populated, so
//! an AI-less run still yields a useful relation set.

use crate::models::{EntityRef, RelationRecord, SemanticGraph};

/// `(source type, relation kind, target type)`.
const RELATION_RULES: &[(&str, &str, &str)] = &[
    ("Product", "contains", "Active_Ingredient"),
    ("Product", "has_dosage", "Dosage"),
    ("Product", "approved_by", "Authority"),
    ("Product", "governed_by", "Legal_Reference"),
    ("Product", "follows", "Procedure"),
    ("Procedure", "has_delay", "Delay"),
    ("Product", "requires", "Condition"),
];

/// Derive rule relations from the entities already in the graph.
/// Descriptions are left empty; the description pass fills them.
pub fn apply(graph: &SemanticGraph) -> Vec<RelationRecord> {
    let mut relations = Vec::new();

    for (source_type, kind, target_type) in RELATION_RULES {
        let Some(source) = graph.first_entity(source_type) else {
            continue;
        };
        for target_value in graph.entity_values(target_type) {
            relations.push(RelationRecord::new(
                kind,
                EntityRef::new(source_type, &source.value),
                EntityRef::new(target_type, target_value),
                "rule",
            ));
        }
    }

    relations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityItem;

    fn graph_with(entries: &[(&str, &[&str])]) -> SemanticGraph {
        let mut graph = SemanticGraph::default();
        for (entity_type, values) in entries {
            for value in *values {
                graph.add_entity(entity_type, EntityItem::new(value, 0.8, "extraction"));
            }
        }
        graph
    }

    #[test]
    fn product_dosage_yields_has_dosage() {
        let graph = graph_with(&[("Product", &["Amoxil"]), ("Dosage", &["500 mg"])]);
        let relations = apply(&graph);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, "has_dosage");
        assert_eq!(relations[0].source.value, "Amoxil");
        assert_eq!(relations[0].target.value, "500 mg");
        assert_eq!(relations[0].created_by, "rule");
    }

    #[test]
    fn multiple_targets_yield_one_relation_each() {
        let graph = graph_with(&[
            ("Product", &["Amoxil"]),
            ("Dosage", &["500 mg", "250 mg"]),
            ("Authority", &["EMA"]),
        ]);
        let relations = apply(&graph);
        assert_eq!(relations.len(), 3);
        assert!(relations.iter().filter(|r| r.kind == "has_dosage").count() == 2);
        assert!(relations.iter().any(|r| r.kind == "approved_by"));
    }

    #[test]
    fn missing_source_type_fires_nothing() {
        let graph = graph_with(&[("Dosage", &["500 mg"])]);
        assert!(apply(&graph).is_empty());
    }

    #[test]
    fn procedure_delay_rule() {
        let graph = graph_with(&[
            ("Procedure", &["centralised procedure"]),
            ("Delay", &["within 90 days"]),
        ]);
        let relations = apply(&graph);
        assert_eq!(relations.len(), 1);
        assert_eq!(relations[0].kind, "has_delay");
    }
}

//! Typed records of the semantic graph and the learning log.
//!
//! Field names follow the wire format consumed by the surrounding platform
//! (`normalized_value`, `questions_answers`, `semantic_summary`,
//! `tech_hints.suggested_schema`), so a graph serializes directly into the
//! exchange JSON without a mapping layer.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use uuid::Uuid;

/// Raw upstream extraction output: entity type → surface values.
pub type RawEntityMap = BTreeMap<String, Vec<String>>;

/// Canonical identity key for entity values: lowercase, trimmed,
/// internal whitespace collapsed.
pub fn normalize_key(value: &str) -> String {
    value
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Document metadata supplied by the upstream extraction stage.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocumentContext {
    pub title: String,
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
}

/// One extracted fact. Identity is `(type, normalized_value)` where the
/// type is the key of the owning [`EntityGroup`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityItem {
    pub value: String,
    pub normalized_value: String,
    pub confidence: f64,
    #[serde(default)]
    pub properties: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub context: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl EntityItem {
    pub fn new(value: &str, confidence: f64, provenance: &str) -> Self {
        Self {
            value: value.trim().to_string(),
            normalized_value: normalize_key(value),
            confidence,
            properties: Map::new(),
            context: None,
            provenance: Some(provenance.to_string()),
        }
    }
}

/// All items of one entity type, with the denormalized `count` and
/// `primary` fields the wire format carries.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EntityGroup {
    pub items: Vec<EntityItem>,
    pub count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub primary: Option<String>,
}

impl EntityGroup {
    /// Append unless an item with the same normalized value exists.
    /// First occurrence wins on conflicts; insertion order is preserved.
    /// Returns true if the item was added.
    pub fn push_unique(&mut self, item: EntityItem) -> bool {
        if self
            .items
            .iter()
            .any(|existing| existing.normalized_value == item.normalized_value)
        {
            return false;
        }
        self.items.push(item);
        self.refresh();
        true
    }

    /// Recompute `count` and `primary` from `items`.
    pub fn refresh(&mut self) {
        self.count = self.items.len();
        self.primary = self.items.first().map(|i| i.value.clone());
    }
}

/// One endpoint of a relation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRef {
    #[serde(rename = "type")]
    pub entity_type: String,
    pub value: String,
}

impl EntityRef {
    pub fn new(entity_type: &str, value: &str) -> Self {
        Self {
            entity_type: entity_type.to_string(),
            value: value.to_string(),
        }
    }
}

/// A typed directed link between two entities.
/// Identity is `(type, source, target)` with normalized endpoint values.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RelationRecord {
    #[serde(rename = "type")]
    pub kind: String,
    pub source: EntityRef,
    pub target: EntityRef,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub confidence: f64,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
}

impl RelationRecord {
    pub fn new(kind: &str, source: EntityRef, target: EntityRef, created_by: &str) -> Self {
        Self {
            kind: kind.to_string(),
            source,
            target,
            description: None,
            confidence: 0.9,
            created_by: created_by.to_string(),
            created_at: Utc::now(),
        }
    }

    /// Identity key. Timestamps, descriptions and confidence are excluded.
    pub fn identity(&self) -> String {
        format!(
            "{}|{}|{}|{}|{}",
            normalize_key(&self.kind),
            normalize_key(&self.source.entity_type),
            normalize_key(&self.source.value),
            normalize_key(&self.target.entity_type),
            normalize_key(&self.target.value),
        )
    }

    pub fn has_description(&self) -> bool {
        self.description
            .as_deref()
            .is_some_and(|d| !d.trim().is_empty())
    }
}

/// A reviewed question/answer pair attached to the document.
/// Identity is the normalized `(question, answer)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QaRecord {
    pub question: String,
    pub answer: String,
    pub confidence: f64,
    pub answer_type: String,
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub entity_refs: Vec<String>,
}

impl QaRecord {
    pub fn identity(&self) -> (String, String) {
        (normalize_key(&self.question), normalize_key(&self.answer))
    }

    pub fn is_expert(&self) -> bool {
        self.created_by == "expert"
    }
}

/// Machine-consumable hints about the document's structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TechHints {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggested_schema: Option<String>,
}

/// The full enriched per-document structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SemanticGraph {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
    #[serde(default)]
    pub entities: BTreeMap<String, EntityGroup>,
    #[serde(default)]
    pub relations: Vec<RelationRecord>,
    #[serde(default)]
    pub contexts: Map<String, Value>,
    #[serde(default)]
    pub questions_answers: Vec<QaRecord>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub semantic_summary: Option<String>,
    #[serde(default)]
    pub tech_hints: TechHints,
}

impl SemanticGraph {
    /// Add an entity item, deduplicating by `(type, normalized_value)`.
    /// Returns true if the item was added.
    pub fn add_entity(&mut self, entity_type: &str, item: EntityItem) -> bool {
        self.entities
            .entry(entity_type.to_string())
            .or_default()
            .push_unique(item)
    }

    /// Add a relation unless one with the same identity exists.
    /// Returns true if the relation was added.
    pub fn add_relation(&mut self, relation: RelationRecord) -> bool {
        let key = relation.identity();
        if self.relations.iter().any(|r| r.identity() == key) {
            return false;
        }
        self.relations.push(relation);
        true
    }

    /// Add a Q&A pair unless the normalized pair exists.
    pub fn add_qa(&mut self, qa: QaRecord) -> bool {
        let key = qa.identity();
        if self.questions_answers.iter().any(|q| q.identity() == key) {
            return false;
        }
        self.questions_answers.push(qa);
        true
    }

    /// First item value of a type, if any.
    pub fn first_entity(&self, entity_type: &str) -> Option<&EntityItem> {
        self.entities.get(entity_type).and_then(|g| g.items.first())
    }

    /// All surface values of a type.
    pub fn entity_values(&self, entity_type: &str) -> Vec<&str> {
        self.entities
            .get(entity_type)
            .map(|g| g.items.iter().map(|i| i.value.as_str()).collect())
            .unwrap_or_default()
    }
}

/// Discrepancy categories produced by the feedback diff.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeltaType {
    RelationAdded,
    RelationRemoved,
    RelationModified,
    EntityAdded,
    EntityModified,
    QaAdded,
    QaCorrected,
}

impl DeltaType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DeltaType::RelationAdded => "relation_added",
            DeltaType::RelationRemoved => "relation_removed",
            DeltaType::RelationModified => "relation_modified",
            DeltaType::EntityAdded => "entity_added",
            DeltaType::EntityModified => "entity_modified",
            DeltaType::QaAdded => "qa_added",
            DeltaType::QaCorrected => "qa_corrected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "relation_added" => Some(DeltaType::RelationAdded),
            "relation_removed" => Some(DeltaType::RelationRemoved),
            "relation_modified" => Some(DeltaType::RelationModified),
            "entity_added" => Some(DeltaType::EntityAdded),
            "entity_modified" => Some(DeltaType::EntityModified),
            "qa_added" => Some(DeltaType::QaAdded),
            "qa_corrected" => Some(DeltaType::QaCorrected),
            _ => None,
        }
    }

    pub fn is_relation(&self) -> bool {
        matches!(
            self,
            DeltaType::RelationAdded | DeltaType::RelationRemoved | DeltaType::RelationModified
        )
    }

    pub fn is_qa(&self) -> bool {
        matches!(self, DeltaType::QaAdded | DeltaType::QaCorrected)
    }
}

/// Immutable correction event. Only `rating` and `reuse_count` may change
/// after creation; everything else is append-only history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeltaRecord {
    pub id: Uuid,
    pub document_ref: String,
    pub reviewer: String,
    pub session_id: Uuid,
    pub delta_type: DeltaType,
    /// What the AI produced (JSON snapshot, `null` when absent).
    pub ai_version: Value,
    /// What the expert kept or introduced (JSON snapshot, `null` when absent).
    pub expert_version: Value,
    pub confidence_before: f64,
    #[serde(default)]
    pub rating: Option<u8>,
    #[serde(default)]
    pub reuse_count: u32,
    pub created_at: DateTime<Utc>,
}

/// Additive per-reviewer/category/day aggregate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LearningStats {
    pub reviewer: String,
    pub category: String,
    pub period: NaiveDate,
    pub total_corrections: u32,
    pub relations_improved: u32,
    pub qa_improved: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_collapses_whitespace_and_case() {
        assert_eq!(normalize_key("  Amoxil   500 MG "), "amoxil 500 mg");
    }

    #[test]
    fn entity_group_deduplicates_by_normalized_value() {
        let mut group = EntityGroup::default();
        assert!(group.push_unique(EntityItem::new("Amoxil", 0.9, "rule")));
        assert!(!group.push_unique(EntityItem::new("AMOXIL ", 0.5, "ai")));
        assert_eq!(group.count, 1);
        assert_eq!(group.primary.as_deref(), Some("Amoxil"));
        // First occurrence wins on conflicts.
        assert_eq!(group.items[0].confidence, 0.9);
    }

    #[test]
    fn relation_identity_ignores_description_and_time() {
        let mut a = RelationRecord::new(
            "has_dosage",
            EntityRef::new("Product", "Amoxil"),
            EntityRef::new("Dosage", "500 mg"),
            "rule",
        );
        let mut b = a.clone();
        a.description = Some("first".into());
        b.description = Some("second".into());
        b.created_at = Utc::now();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn relation_identity_normalizes_endpoint_values() {
        let a = RelationRecord::new(
            "contains",
            EntityRef::new("Product", "Amoxil"),
            EntityRef::new("Active_Ingredient", "Amoxicillin"),
            "rule",
        );
        let b = RelationRecord::new(
            "contains",
            EntityRef::new("Product", " amoxil"),
            EntityRef::new("Active_Ingredient", "AMOXICILLIN"),
            "ai",
        );
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn graph_rejects_duplicate_relations() {
        let mut graph = SemanticGraph::default();
        let rel = RelationRecord::new(
            "has_dosage",
            EntityRef::new("Product", "Amoxil"),
            EntityRef::new("Dosage", "500 mg"),
            "rule",
        );
        assert!(graph.add_relation(rel.clone()));
        assert!(!graph.add_relation(rel));
        assert_eq!(graph.relations.len(), 1);
    }

    #[test]
    fn qa_identity_is_normalized_pair() {
        let now = Utc::now();
        let a = QaRecord {
            question: "What is the dose?".into(),
            answer: "500 mg".into(),
            confidence: 0.9,
            answer_type: "factual".into(),
            created_by: "expert".into(),
            created_at: now,
            entity_refs: vec![],
        };
        let b = QaRecord {
            question: " what  is the DOSE? ".into(),
            answer: "500 MG".into(),
            ..a.clone()
        };
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn graph_serializes_wire_field_names() {
        let mut graph = SemanticGraph::default();
        graph.add_entity("Product", EntityItem::new("Amoxil", 0.9, "rule"));
        graph.semantic_summary = Some("A product document.".into());
        graph.tech_hints.suggested_schema = Some("product_composition_v1".into());

        let json = serde_json::to_value(&graph).unwrap();
        assert!(json["entities"]["Product"]["items"][0]["normalized_value"].is_string());
        assert_eq!(json["entities"]["Product"]["count"], 1);
        assert_eq!(json["entities"]["Product"]["primary"], "Amoxil");
        assert_eq!(json["semantic_summary"], "A product document.");
        assert_eq!(json["tech_hints"]["suggested_schema"], "product_composition_v1");
        assert!(json["questions_answers"].is_array());
    }

    #[test]
    fn delta_type_round_trips_as_str() {
        for dt in [
            DeltaType::RelationAdded,
            DeltaType::RelationRemoved,
            DeltaType::RelationModified,
            DeltaType::EntityAdded,
            DeltaType::EntityModified,
            DeltaType::QaAdded,
            DeltaType::QaCorrected,
        ] {
            assert_eq!(DeltaType::parse(dt.as_str()), Some(dt));
        }
        assert_eq!(DeltaType::parse("unknown"), None);
    }
}

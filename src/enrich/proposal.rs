//! AI proposal round: prompt construction and strict shape coercion.
//!
//! Providers return whatever shape they feel like — entities as a map of
//! lists, a map of groups, or a flat list of objects. Coercion happens
//! once, at this boundary; anything that cannot be coerced is discarded
//! field-by-field, never failing the whole proposal.

use chrono::Utc;
use serde_json::Value;

use crate::gateway::ChatMessage;
use crate::models::{
    DocumentContext, EntityItem, EntityRef, QaRecord, RelationRecord, SemanticGraph,
};

const PROPOSAL_SYSTEM_PROMPT: &str = "You are a regulatory-affairs annotation assistant. \
Given the entities already extracted from a regulatory document, propose additional \
entities, typed relations between entities, question/answer pairs a reviewer would ask, \
and a schema hint. Respond with a single JSON object: \
{\"entities\": {Type: [values]}, \"relations\": [{\"type\", \"source\": {\"type\", \"value\"}, \
\"target\": {\"type\", \"value\"}, \"description\", \"confidence\"}], \
\"questions_answers\": [{\"question\", \"answer\", \"confidence\", \"answer_type\"}], \
\"suggested_schema\": string}. \
Only reference facts supported by the provided entities. No prose outside the JSON.";

/// Everything usable salvaged from one AI response.
#[derive(Debug, Default)]
pub struct AiProposal {
    pub entities: Vec<(String, EntityItem)>,
    pub relations: Vec<RelationRecord>,
    pub questions_answers: Vec<QaRecord>,
    pub suggested_schema: Option<String>,
}

impl AiProposal {
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
            && self.relations.is_empty()
            && self.questions_answers.is_empty()
            && self.suggested_schema.is_none()
    }

    /// Materialize the proposal as a graph overlay for fusion.
    pub fn into_overlay(self) -> SemanticGraph {
        let mut overlay = SemanticGraph::default();
        for (entity_type, item) in self.entities {
            overlay.add_entity(&entity_type, item);
        }
        for relation in self.relations {
            overlay.add_relation(relation);
        }
        for qa in self.questions_answers {
            overlay.add_qa(qa);
        }
        overlay.tech_hints.suggested_schema = self.suggested_schema;
        overlay
    }
}

/// Build the proposal request for the gateway.
pub fn build_prompt(graph: &SemanticGraph, context: &DocumentContext) -> Vec<ChatMessage> {
    let entity_digest: Value = graph
        .entities
        .iter()
        .map(|(t, g)| {
            (
                t.clone(),
                Value::Array(
                    g.items
                        .iter()
                        .map(|i| Value::String(i.value.clone()))
                        .collect(),
                ),
            )
        })
        .collect::<serde_json::Map<String, Value>>()
        .into();

    let user = format!(
        "Document: {title}\nLanguage: {language}\nCategory: {category}\nCountry: {country}\n\
         Extracted entities:\n{entities}",
        title = context.title,
        language = context.language.as_deref().unwrap_or("unknown"),
        category = context.category.as_deref().unwrap_or("unknown"),
        country = context.country.as_deref().unwrap_or("unknown"),
        entities = entity_digest,
    );

    vec![
        ChatMessage::system(PROPOSAL_SYSTEM_PROMPT),
        ChatMessage::user(&user),
    ]
}

/// Coerce an arbitrary provider object into the fixed proposal shape.
pub fn coerce(value: &Value) -> AiProposal {
    AiProposal {
        entities: coerce_entities(value.get("entities")),
        relations: coerce_relations(value.get("relations")),
        questions_answers: coerce_qa(value.get("questions_answers")),
        suggested_schema: value
            .get("suggested_schema")
            .or_else(|| value.pointer("/tech_hints/suggested_schema"))
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .map(|s| s.to_string()),
    }
}

fn entity_item_from(value: &Value, confidence_default: f64) -> Option<EntityItem> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(EntityItem::new(s, confidence_default, "ai")),
        Value::Object(map) => {
            let surface = map.get("value").and_then(|v| v.as_str())?;
            if surface.trim().is_empty() {
                return None;
            }
            let mut item = EntityItem::new(
                surface,
                map.get("confidence")
                    .and_then(|c| c.as_f64())
                    .unwrap_or(confidence_default),
                "ai",
            );
            if let Some(Value::Object(props)) = map.get("properties") {
                item.properties = props.clone();
            }
            item.context = map
                .get("context")
                .and_then(|c| c.as_str())
                .map(|s| s.to_string());
            Some(item)
        }
        _ => None,
    }
}

/// Accepted entity shapes: map type → list, map type → `{items: [...]}`,
/// or flat list of `{type, value}` objects.
fn coerce_entities(value: Option<&Value>) -> Vec<(String, EntityItem)> {
    const AI_CONFIDENCE: f64 = 0.6;
    let mut out = Vec::new();

    match value {
        Some(Value::Object(map)) => {
            for (entity_type, group) in map {
                let items: &Vec<Value> = match group {
                    Value::Array(arr) => arr,
                    Value::Object(obj) => match obj.get("items") {
                        Some(Value::Array(arr)) => arr,
                        _ => continue,
                    },
                    _ => continue,
                };
                for raw in items {
                    if let Some(item) = entity_item_from(raw, AI_CONFIDENCE) {
                        out.push((entity_type.clone(), item));
                    }
                }
            }
        }
        Some(Value::Array(list)) => {
            for raw in list {
                let Some(entity_type) = raw.get("type").and_then(|t| t.as_str()) else {
                    continue;
                };
                if let Some(item) = entity_item_from(raw, AI_CONFIDENCE) {
                    out.push((entity_type.to_string(), item));
                }
            }
        }
        _ => {}
    }

    out
}

fn endpoint_from(value: Option<&Value>) -> Option<EntityRef> {
    let obj = value?.as_object()?;
    let entity_type = obj.get("type").and_then(|t| t.as_str())?;
    let surface = obj.get("value").and_then(|v| v.as_str())?;
    if entity_type.trim().is_empty() || surface.trim().is_empty() {
        return None;
    }
    Some(EntityRef::new(entity_type, surface))
}

fn coerce_relations(value: Option<&Value>) -> Vec<RelationRecord> {
    let Some(Value::Array(list)) = value else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|raw| {
            let kind = raw.get("type").and_then(|t| t.as_str())?;
            let source = endpoint_from(raw.get("source"))?;
            let target = endpoint_from(raw.get("target"))?;
            Some(RelationRecord {
                kind: kind.to_string(),
                source,
                target,
                description: raw
                    .get("description")
                    .and_then(|d| d.as_str())
                    .filter(|d| !d.trim().is_empty())
                    .map(|d| d.to_string()),
                confidence: raw.get("confidence").and_then(|c| c.as_f64()).unwrap_or(0.6),
                created_by: "ai".to_string(),
                created_at: Utc::now(),
            })
        })
        .collect()
}

fn coerce_qa(value: Option<&Value>) -> Vec<QaRecord> {
    let Some(Value::Array(list)) = value else {
        return Vec::new();
    };

    list.iter()
        .filter_map(|raw| {
            let question = raw.get("question").and_then(|q| q.as_str())?;
            let answer = raw.get("answer").and_then(|a| a.as_str())?;
            if question.trim().is_empty() || answer.trim().is_empty() {
                return None;
            }
            Some(QaRecord {
                question: question.to_string(),
                answer: answer.to_string(),
                confidence: raw.get("confidence").and_then(|c| c.as_f64()).unwrap_or(0.6),
                answer_type: raw
                    .get("answer_type")
                    .and_then(|t| t.as_str())
                    .unwrap_or("factual")
                    .to_string(),
                created_by: "ai".to_string(),
                created_at: Utc::now(),
                entity_refs: Vec::new(),
            })
        })
        .collect()
}

//! Relation description completion.
//!
//! Every relation leaving the engine carries a natural-language
//! description. Missing ones are generated via the gateway from a bounded
//! evidence pack; when the gateway is down, a deterministic per-kind
//! template fills in.

use crate::gateway::{ChatMessage, LlmGateway};
use crate::models::{RelationRecord, SemanticGraph};

/// Max evidence lines forwarded per description call.
const EVIDENCE_LIMIT: usize = 6;

/// Deterministic fallback phrasing per relation kind.
pub fn template(relation: &RelationRecord) -> String {
    let src = &relation.source.value;
    let tgt = &relation.target.value;
    match relation.kind.as_str() {
        "contains" => format!("{src} contains the active ingredient {tgt}."),
        "has_dosage" => format!("{src} is supplied at a strength of {tgt}."),
        "approved_by" => format!("{src} is authorised by {tgt}."),
        "governed_by" => format!("{src} falls under {tgt}."),
        "follows" => format!("{src} is registered through the {tgt}."),
        "has_delay" => format!("The {src} is subject to a time limit of {tgt}."),
        "requires" => format!("{src} is subject to the condition: {tgt}."),
        kind => format!("{src} {} {tgt}.", kind.replace('_', " ")),
    }
}

/// Bounded evidence pack for one relation: neighboring relations sharing
/// an endpoint, the document summary, and stored Q&A.
pub fn evidence_pack(graph: &SemanticGraph, relation: &RelationRecord) -> Vec<String> {
    let mut evidence = Vec::new();

    for other in &graph.relations {
        if other.identity() == relation.identity() {
            continue;
        }
        let shares_endpoint = other.source == relation.source
            || other.target == relation.target
            || other.source == relation.target
            || other.target == relation.source;
        if shares_endpoint {
            if let Some(description) = &other.description {
                evidence.push(description.clone());
            }
        }
    }

    if let Some(summary) = &graph.semantic_summary {
        if !summary.is_empty() {
            evidence.push(summary.clone());
        }
    }

    for qa in &graph.questions_answers {
        evidence.push(format!("Q: {} A: {}", qa.question, qa.answer));
    }

    evidence.truncate(EVIDENCE_LIMIT);
    evidence
}

fn build_prompt(relation: &RelationRecord, evidence: &[String]) -> Vec<ChatMessage> {
    let user = format!(
        "Relation: {src_type} \"{src}\" --{kind}--> {tgt_type} \"{tgt}\"\nEvidence:\n{evidence}\n\
         Write one factual sentence describing this relation. Output the sentence only.",
        src_type = relation.source.entity_type,
        src = relation.source.value,
        kind = relation.kind,
        tgt_type = relation.target.entity_type,
        tgt = relation.target.value,
        evidence = evidence.join("\n"),
    );
    vec![
        ChatMessage::system(
            "You write one-sentence descriptions of facts extracted from regulatory documents. \
             Stay strictly within the given evidence.",
        ),
        ChatMessage::user(&user),
    ]
}

/// Fill every missing description in place.
pub fn ensure_descriptions(graph: &mut SemanticGraph, gateway: &LlmGateway, max_tokens: u32) {
    let pending: Vec<(usize, Vec<String>)> = graph
        .relations
        .iter()
        .enumerate()
        .filter(|(_, r)| !r.has_description())
        .map(|(i, r)| (i, evidence_pack(graph, r)))
        .collect();

    for (index, evidence) in pending {
        let relation = &graph.relations[index];
        let generated = if gateway.is_enabled() {
            gateway.request_text(&build_prompt(relation, &evidence), max_tokens)
        } else {
            None
        };
        let description = generated.unwrap_or_else(|| template(relation));
        graph.relations[index].description = Some(description);
    }
}

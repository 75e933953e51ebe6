//! Document summary generation: AI first, deterministic fallback.

use crate::gateway::{ChatMessage, LlmGateway};
use crate::models::{DocumentContext, SemanticGraph};

fn entity_digest(graph: &SemanticGraph, max_types: usize) -> String {
    graph
        .entities
        .iter()
        .filter(|(_, group)| !group.items.is_empty())
        .take(max_types)
        .map(|(entity_type, group)| {
            format!(
                "{entity_type}: {}",
                group.primary.as_deref().unwrap_or_default()
            )
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn build_prompt(graph: &SemanticGraph, context: &DocumentContext) -> Vec<ChatMessage> {
    let relations: Vec<String> = graph
        .relations
        .iter()
        .filter_map(|r| r.description.clone())
        .take(10)
        .collect();

    let user = format!(
        "Document: {title}\nCategory: {category}\nEntities: {entities}\nRelations:\n{relations}\n\
         Summarize this regulatory document in one to three sentences. Output the summary only.",
        title = context.title,
        category = context.category.as_deref().unwrap_or("unknown"),
        entities = entity_digest(graph, 8),
        relations = relations.join("\n"),
    );
    vec![
        ChatMessage::system(
            "You summarize regulatory documents factually in at most three sentences, \
             using only the provided facts.",
        ),
        ChatMessage::user(&user),
    ]
}

/// Rule-based 1–3 sentence summary used when every provider is down.
pub fn fallback(graph: &SemanticGraph, context: &DocumentContext) -> String {
    let mut sentences = Vec::new();

    match context.category.as_deref() {
        Some(category) if !category.is_empty() => {
            sentences.push(format!("\"{}\" is a {category} document.", context.title));
        }
        _ => sentences.push(format!("\"{}\" is a regulatory document.", context.title)),
    }

    let digest = entity_digest(graph, 4);
    if !digest.is_empty() {
        sentences.push(format!("Key facts: {digest}."));
    }

    if !graph.relations.is_empty() {
        sentences.push(format!(
            "It records {} relation(s) and {} reviewed question(s).",
            graph.relations.len(),
            graph.questions_answers.len()
        ));
    }

    sentences.truncate(3);
    sentences.join(" ")
}

/// Produce the summary, preferring the gateway.
pub fn generate(graph: &SemanticGraph, context: &DocumentContext, gateway: &LlmGateway, max_tokens: u32) -> String {
    if gateway.is_enabled() {
        if let Some(summary) = gateway.request_text(&build_prompt(graph, context), max_tokens) {
            return summary;
        }
    }
    fallback(graph, context)
}

//! Grounded question answering over one or more semantic graphs.
//!
//! Evidence is scored by token-level Jaccard similarity to the question.
//! A prior expert-authored Q&A close enough to the question short-circuits
//! the gateway entirely; when no provider answers, the caller gets an
//! explicit not-found, never a fabrication.

use serde::Serialize;

use crate::config::EngineConfig;
use crate::gateway::{ChatMessage, LlmGateway};
use crate::models::{DocumentContext, QaRecord, SemanticGraph};
use crate::similarity::token_jaccard;

/// How the answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AnswerKind {
    /// Returned verbatim from a prior expert-authored Q&A.
    ExpertMemo,
    /// Generated by a provider over the evidence pack.
    Generated,
    /// Nothing usable was found; `suggestion` may carry the closest fact.
    NotFound,
}

/// Result of [`answer`]. Always usable; `kind` flags AI-less degradation.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub answer: String,
    pub confidence: f64,
    pub kind: AnswerKind,
    pub suggestion: Option<String>,
}

const NOT_FOUND_TEXT: &str = "No grounded answer was found in the reviewed documents.";

fn not_found(suggestion: Option<String>) -> Answer {
    Answer {
        answer: NOT_FOUND_TEXT.to_string(),
        confidence: 0.1,
        kind: AnswerKind::NotFound,
        suggestion,
    }
}

/// Collect evidence lines from entity values, relation descriptions,
/// stored summaries and prior Q&A.
fn collect_evidence(graphs: &[&SemanticGraph], extra_summary: Option<&str>) -> Vec<String> {
    let mut evidence = Vec::new();

    for graph in graphs {
        for (entity_type, group) in &graph.entities {
            for item in &group.items {
                evidence.push(format!("{entity_type}: {}", item.value));
            }
        }
        for relation in &graph.relations {
            if let Some(description) = &relation.description {
                evidence.push(description.clone());
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
    }

    if let Some(summary) = extra_summary {
        if !summary.is_empty() {
            evidence.push(summary.to_string());
        }
    }

    evidence
}

fn best_expert_memo<'a>(question: &str, graphs: &[&'a SemanticGraph]) -> Option<(&'a QaRecord, f64)> {
    graphs
        .iter()
        .flat_map(|g| g.questions_answers.iter())
        .filter(|qa| qa.is_expert())
        .map(|qa| (qa, token_jaccard(question, &qa.question)))
        .max_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal))
}

fn build_prompt(question: &str, context: &DocumentContext, evidence: &[String]) -> Vec<ChatMessage> {
    let user = format!(
        "Document: {title}\nEvidence:\n{evidence}\n\nQuestion: {question}\n\
         Answer using only the evidence above. If the evidence does not contain the answer, \
         reply exactly: NOT_FOUND",
        title = context.title,
        evidence = evidence.join("\n"),
    );
    vec![
        ChatMessage::system(
            "You answer reviewer questions about regulatory documents strictly from the \
             provided evidence. Never invent facts.",
        ),
        ChatMessage::user(&user),
    ]
}

/// Answer a question against one or more enriched graphs.
pub fn answer(
    question: &str,
    graphs: &[&SemanticGraph],
    context: &DocumentContext,
    summary: Option<&str>,
    gateway: &LlmGateway,
    config: &EngineConfig,
) -> Answer {
    let question = question.trim();
    if question.is_empty() {
        return not_found(None);
    }

    // Expert memoization: a validated answer to (nearly) the same
    // question is reused without touching any provider.
    if let Some((qa, score)) = best_expert_memo(question, graphs) {
        if score >= config.qa_memo_threshold {
            tracing::debug!(score, "expert Q&A memo hit");
            return Answer {
                answer: qa.answer.clone(),
                confidence: 0.95,
                kind: AnswerKind::ExpertMemo,
                suggestion: None,
            };
        }
    }

    let mut scored: Vec<(f64, String)> = collect_evidence(graphs, summary)
        .into_iter()
        .map(|line| (token_jaccard(question, &line), line))
        .filter(|(score, _)| *score > 0.0)
        .collect();
    scored.sort_by(|a, b| b.0.partial_cmp(&a.0).unwrap_or(std::cmp::Ordering::Equal));

    if scored.is_empty() {
        return not_found(None);
    }

    let best_score = scored[0].0;
    let top_evidence: Vec<String> = scored
        .into_iter()
        .take(config.evidence_top_n)
        .map(|(_, line)| line)
        .collect();

    let generated = gateway
        .request_text(
            &build_prompt(question, context, &top_evidence),
            config.max_answer_tokens,
        )
        .filter(|text| !text.contains("NOT_FOUND"));

    match generated {
        Some(text) => Answer {
            answer: text,
            confidence: (0.55 + 0.35 * best_score).min(0.9),
            kind: AnswerKind::Generated,
            suggestion: None,
        },
        None => not_found(top_evidence.into_iter().next()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EntityItem;
    use chrono::Utc;

    fn qa(question: &str, answer: &str, created_by: &str) -> QaRecord {
        QaRecord {
            question: question.into(),
            answer: answer.into(),
            confidence: 0.9,
            answer_type: "factual".into(),
            created_by: created_by.into(),
            created_at: Utc::now(),
            entity_refs: vec![],
        }
    }

    fn graph() -> SemanticGraph {
        let mut g = SemanticGraph::default();
        g.add_entity("Product", EntityItem::new("Amoxil", 0.9, "extraction"));
        g.add_entity("Dosage", EntityItem::new("500 mg", 0.9, "extraction"));
        g.add_qa(qa(
            "What is the maximum daily dose of Amoxil?",
            "1500 mg per day",
            "expert",
        ));
        g
    }

    fn context() -> DocumentContext {
        DocumentContext {
            title: "Amoxil SmPC".into(),
            ..Default::default()
        }
    }

    #[test]
    fn near_identical_expert_question_is_memoized() {
        let g = graph();
        let result = answer(
            "What is the maximum daily dose of Amoxil?",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_eq!(result.kind, AnswerKind::ExpertMemo);
        assert_eq!(result.answer, "1500 mg per day");
        assert_eq!(result.confidence, 0.95);
    }

    #[test]
    fn ai_authored_qa_is_not_memoized() {
        let mut g = SemanticGraph::default();
        g.add_qa(qa("What is the dose?", "500 mg", "ai"));
        let result = answer(
            "What is the dose?",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_ne!(result.kind, AnswerKind::ExpertMemo);
    }

    #[test]
    fn distant_question_is_not_memoized() {
        let g = graph();
        let result = answer(
            "Which authority granted the approval?",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_ne!(result.kind, AnswerKind::ExpertMemo);
    }

    #[test]
    fn no_gateway_with_evidence_returns_not_found_with_suggestion() {
        let g = graph();
        let result = answer(
            "What dosage strengths of Amoxil exist?",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_eq!(result.kind, AnswerKind::NotFound);
        assert_eq!(result.answer, NOT_FOUND_TEXT);
        assert!(result.suggestion.is_some());
    }

    #[test]
    fn no_evidence_at_all_returns_plain_not_found() {
        let g = SemanticGraph::default();
        let result = answer(
            "Completely unrelated query?",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_eq!(result.kind, AnswerKind::NotFound);
        assert!(result.suggestion.is_none());
    }

    #[test]
    fn empty_question_is_not_found() {
        let g = graph();
        let result = answer(
            "   ",
            &[&g],
            &context(),
            None,
            &LlmGateway::disabled(),
            &EngineConfig::default(),
        );
        assert_eq!(result.kind, AnswerKind::NotFound);
    }
}
